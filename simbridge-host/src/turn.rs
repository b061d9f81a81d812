//! One script run, from the run request to its terminal frame.
//!
//! ```text
//! Idle --begin--> Sending --send--> AwaitingTerminal --terminal--> Succeeded
//!                    |                 |   ^                         RuntimeFault
//!                    |                 |   | call-in / output        CompileFault
//!                    |                 +---+                         ProtocolFault
//!                    +-----------------+---------------------------> ConnectionLost
//! ```
//!
//! Every terminal state resets to `Idle` as soon as the report is built.
//! The turn advances one frame per [`ExecutionTurn::step`]; [`ExecutionTurn::drive`]
//! steps until the run ends, blocking the calling thread on the channel
//! meanwhile. Call-ins are answered inside the step that read them, so
//! each one gets its reply before the next frame is read.

use crate::api::HostApi;
use crate::config::UnknownTagPolicy;
use crate::dispatch::{classify, Inbound, Terminal};
use crate::error::{HostError, HostResult};
use crate::output::ConsoleOutput;
use simbridge_protocol::{
    CallReply, Frame, FrameChannel, MessageTag, ProtocolError, RunScriptMessage,
};
use simbridge_types::RunId;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    Sending,
    AwaitingTerminal,
    Succeeded,
    RuntimeFault,
    CompileFault,
    ProtocolFault,
    ConnectionLost,
}

/// How a run ended, from the host's point of view.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Succeeded,
    RuntimeFault(String),
    CompileFault(String),
    /// The engine broke the protocol; the connection cannot be trusted.
    ProtocolFault(String),
    /// The connection failed mid-run.
    ConnectionLost(String),
}

impl RunOutcome {
    /// The terminal state this outcome moves the turn to.
    pub fn state(&self) -> TurnState {
        match self {
            RunOutcome::Succeeded => TurnState::Succeeded,
            RunOutcome::RuntimeFault(_) => TurnState::RuntimeFault,
            RunOutcome::CompileFault(_) => TurnState::CompileFault,
            RunOutcome::ProtocolFault(_) => TurnState::ProtocolFault,
            RunOutcome::ConnectionLost(_) => TurnState::ConnectionLost,
        }
    }

    /// Whether the connection must be dropped after this outcome.
    pub fn breaks_connection(&self) -> bool {
        matches!(
            self,
            RunOutcome::ProtocolFault(_) | RunOutcome::ConnectionLost(_)
        )
    }
}

impl From<Terminal> for RunOutcome {
    fn from(terminal: Terminal) -> Self {
        match terminal {
            Terminal::Success => RunOutcome::Succeeded,
            Terminal::Exception(message) => RunOutcome::RuntimeFault(message),
            Terminal::CompileFault(message) => RunOutcome::CompileFault(message),
        }
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub run_id: RunId,
    pub outcome: RunOutcome,
    /// Wall-clock time from sending the run request to the terminal frame.
    pub elapsed: Duration,
    pub call_ins: u32,
    pub outputs: u32,
    pub unrecognized: u32,
}

#[derive(Debug)]
struct ActiveRun {
    run_id: RunId,
    script: String,
    started: Instant,
    call_ins: u32,
    outputs: u32,
    unrecognized: u32,
}

/// The run state machine. One per connection; at most one run at a time.
#[derive(Debug)]
pub struct ExecutionTurn {
    state: TurnState,
    policy: UnknownTagPolicy,
    active: Option<ActiveRun>,
}

impl ExecutionTurn {
    pub fn new(policy: UnknownTagPolicy) -> Self {
        Self {
            state: TurnState::Idle,
            policy,
            active: None,
        }
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == TurnState::Idle
    }

    /// The id of the run in progress.
    pub fn run_id(&self) -> Option<RunId> {
        self.active.as_ref().map(|run| run.run_id)
    }

    /// Starts a run. Fails unless the turn is idle.
    pub fn begin(&mut self, script: impl Into<String>) -> HostResult<RunId> {
        if self.state != TurnState::Idle {
            return Err(HostError::AlreadyRunning);
        }
        let run_id = RunId::new();
        self.active = Some(ActiveRun {
            run_id,
            script: script.into(),
            started: Instant::now(),
            call_ins: 0,
            outputs: 0,
            unrecognized: 0,
        });
        self.state = TurnState::Sending;
        debug!(%run_id, "run scheduled");
        Ok(run_id)
    }

    /// Advances by one frame. Returns the outcome once the run has ended;
    /// the caller then finishes it with [`Self::finish`].
    pub fn step<W>(
        &mut self,
        channel: &mut dyn FrameChannel,
        api: &HostApi<W>,
        world: &mut W,
        output: &mut dyn ConsoleOutput,
    ) -> HostResult<Option<RunOutcome>> {
        let Some(run) = self.active.as_mut() else {
            return Err(HostError::InvalidTurnState(self.state));
        };

        match self.state {
            TurnState::Sending => {
                let request = RunScriptMessage::new(std::mem::take(&mut run.script));
                let frame = Frame::new(&MessageTag::ScriptRun, &request)?;
                run.started = Instant::now();
                if let Err(e) = channel.send_frame(&frame) {
                    return Ok(Some(RunOutcome::ConnectionLost(e.to_string())));
                }
                self.state = TurnState::AwaitingTerminal;
                Ok(None)
            }
            TurnState::AwaitingTerminal => {
                let frame = match channel.receive() {
                    Ok(frame) => frame,
                    Err(e) if e.is_connection_error() => {
                        return Ok(Some(RunOutcome::ConnectionLost(e.to_string())));
                    }
                    Err(e) => return Ok(Some(RunOutcome::ProtocolFault(e.to_string()))),
                };

                match classify(frame) {
                    Inbound::Terminal(terminal) => Ok(Some(terminal.into())),
                    Inbound::Output(text) => {
                        run.outputs += 1;
                        output.log(&text);
                        Ok(None)
                    }
                    Inbound::CallIn { function, args } => {
                        run.call_ins += 1;
                        let reply = api.handle(world, &function, args);
                        if let CallReply::Fault(fault) = &reply {
                            debug!(run_id = %run.run_id, %function, %fault, "call-in faulted");
                        }
                        let frame = Frame::new(&MessageTag::CallReturn, &reply)?;
                        if let Err(e) = channel.send_frame(&frame) {
                            return Ok(Some(RunOutcome::ConnectionLost(e.to_string())));
                        }
                        Ok(None)
                    }
                    Inbound::Unrecognized(tag) => {
                        run.unrecognized += 1;
                        match self.policy {
                            UnknownTagPolicy::Ignore => {
                                warn!(run_id = %run.run_id, %tag, "dropping frame with unrecognized tag");
                                Ok(None)
                            }
                            UnknownTagPolicy::Fail => Ok(Some(RunOutcome::ProtocolFault(
                                ProtocolError::UnrecognizedTag(tag).to_string(),
                            ))),
                        }
                    }
                }
            }
            other => Err(HostError::InvalidTurnState(other)),
        }
    }

    /// Moves to the outcome's terminal state, builds the report and returns
    /// to `Idle`.
    pub fn finish(&mut self, outcome: RunOutcome) -> HostResult<RunReport> {
        let run = self
            .active
            .take()
            .ok_or(HostError::InvalidTurnState(self.state))?;
        self.state = outcome.state();
        let report = RunReport {
            run_id: run.run_id,
            elapsed: run.started.elapsed(),
            call_ins: run.call_ins,
            outputs: run.outputs,
            unrecognized: run.unrecognized,
            outcome,
        };
        info!(
            run_id = %report.run_id,
            state = ?self.state,
            elapsed_ms = report.elapsed.as_millis() as u64,
            call_ins = report.call_ins,
            "run finished"
        );
        self.state = TurnState::Idle;
        Ok(report)
    }

    /// Runs the begun run to completion.
    pub fn drive<W>(
        &mut self,
        channel: &mut dyn FrameChannel,
        api: &HostApi<W>,
        world: &mut W,
        output: &mut dyn ConsoleOutput,
    ) -> HostResult<RunReport> {
        loop {
            if let Some(outcome) = self.step(channel, api, world, output)? {
                return self.finish(outcome);
            }
        }
    }
}
