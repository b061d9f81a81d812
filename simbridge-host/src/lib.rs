//! Host side of simbridge.
//!
//! The host is the simulation. Once per tick it drives a [`ScriptConsole`],
//! which keeps a connection to the engine subprocess, sends scheduled
//! scripts, and services the script's calls back into the simulation
//! through a [`HostApi`] registry while the run is in progress.
//!
//! ```no_run
//! use simbridge_host::{world_api, BridgeConfig, MemoryWorld, ScriptConsole, TracingOutput};
//!
//! let config = BridgeConfig::load();
//! let mut world = MemoryWorld::demo();
//! let mut console = ScriptConsole::with_tcp(&config, world_api(), Box::new(TracingOutput));
//! console.schedule_execution("print hello");
//! loop {
//!     if let Some(report) = console.simulation_step(&mut world) {
//!         println!("{:?}", report.outcome);
//!         break;
//!     }
//! #   break;
//! }
//! ```

pub mod api;
pub mod config;
pub mod console;
pub mod dispatch;
mod error;
pub mod output;
pub mod supervisor;
pub mod turn;
pub mod world;

pub use api::HostApi;
pub use config::{BridgeConfig, EngineConfig, UnknownTagPolicy};
pub use console::{Connector, ScriptConsole, TcpConnector};
pub use dispatch::{classify, Inbound, Terminal};
pub use error::{HostError, HostResult};
pub use output::{BufferedOutput, ConsoleOutput, TracingOutput};
pub use supervisor::EngineSupervisor;
pub use turn::{ExecutionTurn, RunOutcome, RunReport, TurnState};
pub use world::{world_api, MemoryWorld};
