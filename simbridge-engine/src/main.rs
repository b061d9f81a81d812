//! simbridge scripting engine
//!
//! Listens on the loopback port and runs the scripts the host sends.
//!
//! Usage:
//!   simbridge-engine --port 6672

use anyhow::{Context, Result};
use clap::Parser;
use simbridge_engine::{EngineServer, LineScript};
use simbridge_protocol::{DEFAULT_HOST, DEFAULT_PORT};
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "simbridge-engine")]
#[command(about = "simbridge scripting engine")]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

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

    let server = EngineServer::bind((args.host.as_str(), args.port), LineScript)
        .with_context(|| format!("failed to listen on {}:{}", args.host, args.port))?;
    info!(addr = %server.local_addr()?, "simbridge engine listening");

    server.serve()?;
    Ok(())
}
