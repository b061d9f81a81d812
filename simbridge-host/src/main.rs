//! simbridge console
//!
//! Runs one script file against an in-memory world through the engine,
//! ticking like a simulation would until the run completes.
//!
//! Usage:
//!   simbridge-console script.txt
//!   simbridge-console --config bridge.toml --no-engine script.txt

use anyhow::{bail, Context, Result};
use clap::Parser;
use simbridge_host::{
    world_api, BridgeConfig, EngineSupervisor, MemoryWorld, RunOutcome, ScriptConsole,
    TracingOutput,
};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use tracing::{info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "simbridge-console")]
#[command(about = "Run a script through the simbridge engine")]
struct Args {
    /// Script to run
    script: PathBuf,

    /// Bridge config file (default: ~/.simbridge/bridge.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Do not start the engine; connect to one already running
    #[arg(long)]
    no_engine: bool,

    /// Simulation tick interval in milliseconds
    #[arg(long, default_value = "50")]
    tick_ms: u64,

    /// Give up after this many ticks without a finished run
    #[arg(long, default_value = "600")]
    max_ticks: u32,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with_target(false)
        .compact()
        .init();

    let config = match &args.config {
        Some(path) => BridgeConfig::load_from(path),
        None => BridgeConfig::load(),
    };
    let script = std::fs::read_to_string(&args.script)
        .with_context(|| format!("failed to read script {:?}", args.script))?;

    let mut supervisor = None;
    if config.engine.autostart && !args.no_engine {
        let mut engine = EngineSupervisor::new(config.engine.clone());
        engine.ensure_running().context("failed to start the engine")?;
        supervisor = Some(engine);
    }

    let mut world = MemoryWorld::demo();
    let mut console = ScriptConsole::with_tcp(&config, world_api(), Box::new(TracingOutput));
    if let Some(engine) = supervisor {
        console.set_supervisor(engine);
    }
    console.schedule_execution(script);
    info!(addr = %config.engine_addr(), "waiting for the engine");

    let tick = Duration::from_millis(args.tick_ms);
    for _ in 0..args.max_ticks {
        if let Some(report) = console.simulation_step(&mut world) {
            info!(
                run_id = %report.run_id,
                call_ins = report.call_ins,
                outputs = report.outputs,
                "run complete"
            );
            return match report.outcome {
                RunOutcome::Succeeded => Ok(()),
                other => bail!("run did not succeed: {other:?}"),
            };
        }
        thread::sleep(tick);
    }

    warn!(ticks = args.max_ticks, "no run completed");
    bail!("engine at {} did not complete the run", config.engine_addr())
}
