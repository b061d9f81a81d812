//! The per-tick driver that owns the engine connection.
//!
//! A [`ScriptConsole`] is the explicit context object of the bridge: it
//! holds the connection, the host API, the pending script and the run
//! state machine, and is advanced by calling
//! [`ScriptConsole::simulation_step`] once per simulation tick. A tick that
//! starts a run blocks until that run ends.

use crate::api::HostApi;
use crate::config::BridgeConfig;
use crate::error::HostResult;
use crate::output::ConsoleOutput;
use crate::supervisor::EngineSupervisor;
use crate::turn::{ExecutionTurn, RunOutcome, RunReport};
use simbridge_protocol::{FrameChannel, ProtocolResult, TcpTransport};
use tracing::{debug, info, warn};

/// Opens connections to the engine.
pub trait Connector {
    fn connect(&mut self) -> ProtocolResult<Box<dyn FrameChannel>>;
}

impl<F> Connector for F
where
    F: FnMut() -> ProtocolResult<Box<dyn FrameChannel>>,
{
    fn connect(&mut self) -> ProtocolResult<Box<dyn FrameChannel>> {
        self()
    }
}

/// Connects over loopback TCP.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    addr: String,
}

impl TcpConnector {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }
}

impl Connector for TcpConnector {
    fn connect(&mut self) -> ProtocolResult<Box<dyn FrameChannel>> {
        let transport = TcpTransport::connect(self.addr.as_str())?;
        Ok(Box::new(transport))
    }
}

pub struct ScriptConsole<W> {
    connector: Box<dyn Connector>,
    channel: Option<Box<dyn FrameChannel>>,
    api: HostApi<W>,
    output: Box<dyn ConsoleOutput>,
    turn: ExecutionTurn,
    scheduled: Option<String>,
    supervisor: Option<EngineSupervisor>,
}

impl<W> ScriptConsole<W> {
    /// Creates a console and makes one connection attempt.
    pub fn new(
        config: &BridgeConfig,
        api: HostApi<W>,
        connector: Box<dyn Connector>,
        output: Box<dyn ConsoleOutput>,
    ) -> Self {
        let mut console = Self {
            connector,
            channel: None,
            api,
            output,
            turn: ExecutionTurn::new(config.unknown_tags),
            scheduled: None,
            supervisor: None,
        };
        console.try_connect();
        console
    }

    /// Creates a console connecting to the configured engine address.
    pub fn with_tcp(config: &BridgeConfig, api: HostApi<W>, output: Box<dyn ConsoleOutput>) -> Self {
        let connector = TcpConnector::new(config.engine_addr());
        Self::new(config, api, Box::new(connector), output)
    }

    /// Hands the engine process to the console, for restarts.
    pub fn set_supervisor(&mut self, supervisor: EngineSupervisor) {
        self.supervisor = Some(supervisor);
    }

    pub fn supervisor_mut(&mut self) -> Option<&mut EngineSupervisor> {
        self.supervisor.as_mut()
    }

    /// Queues a script for the next tick, replacing any script still
    /// waiting to start.
    pub fn schedule_execution(&mut self, script: impl Into<String>) {
        if self.scheduled.is_some() {
            debug!("replacing scheduled script");
        }
        self.scheduled = Some(script.into());
    }

    pub fn scheduled_script(&self) -> Option<&str> {
        self.scheduled.as_deref()
    }

    pub fn is_connected(&self) -> bool {
        self.channel.is_some()
    }

    pub fn can_execute_script(&self) -> bool {
        self.turn.is_idle() && self.is_connected()
    }

    pub fn api(&self) -> &HostApi<W> {
        &self.api
    }

    /// One simulation tick: reconnect if needed, then run the scheduled
    /// script to completion if there is one. Returns the report of a run
    /// that ended during this tick.
    pub fn simulation_step(&mut self, world: &mut W) -> Option<RunReport> {
        if self.channel.is_none() {
            self.try_connect();
        }
        if self.scheduled.is_none() || !self.can_execute_script() {
            return None;
        }
        let script = self.scheduled.take()?;
        let report = self.run(script, world)?;
        self.report(&report);
        if report.outcome.breaks_connection() {
            self.disconnect();
        }
        Some(report)
    }

    /// Restarts the engine process and drops the connection; the next tick
    /// reconnects.
    pub fn restart_engine(&mut self) -> HostResult<()> {
        self.disconnect();
        match self.supervisor.as_mut() {
            Some(supervisor) => supervisor.restart(),
            None => {
                warn!("no engine supervisor; only the connection was reset");
                Ok(())
            }
        }
    }

    /// Drops the connection to the engine.
    pub fn disconnect(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            channel.close();
            info!("disconnected from script engine");
        }
    }

    fn try_connect(&mut self) {
        match self.connector.connect() {
            Ok(channel) => {
                info!("connected to script engine");
                self.channel = Some(channel);
            }
            Err(e) => debug!(error = %e, "script engine not reachable"),
        }
    }

    fn run(&mut self, script: String, world: &mut W) -> Option<RunReport> {
        let channel = self.channel.as_mut()?;
        if let Err(e) = self.turn.begin(script) {
            warn!(error = %e, "cannot start run");
            return None;
        }
        let result = self
            .turn
            .drive(&mut **channel, &self.api, world, &mut *self.output);
        match result {
            Ok(report) => Some(report),
            Err(e) => self.turn.finish(RunOutcome::ProtocolFault(e.to_string())).ok(),
        }
    }

    fn report(&mut self, report: &RunReport) {
        let line = match &report.outcome {
            RunOutcome::Succeeded => {
                format!("Execution took {} ms", report.elapsed.as_millis())
            }
            RunOutcome::RuntimeFault(message) => format!("Exception: {message}"),
            RunOutcome::CompileFault(message) => format!("Failed to compile:{message}"),
            RunOutcome::ProtocolFault(message) => format!("Protocol error: {message}"),
            RunOutcome::ConnectionLost(message) => {
                format!("Connection to script engine lost: {message}")
            }
        };
        self.output.log(&line);
        if report.unrecognized > 0 {
            warn!(
                run_id = %report.run_id,
                count = report.unrecognized,
                "run received frames with unrecognized tags"
            );
        }
    }
}
