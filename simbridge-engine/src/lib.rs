//! Scripting-engine side of simbridge.
//!
//! The engine listens on a loopback port; the host connects and sends run
//! requests. While a script runs, every access it makes to the simulation
//! goes back to the host as a call-in through the [`RemoteCallClient`].
//!
//! # Example
//!
//! ```no_run
//! use simbridge_engine::{EngineServer, LineScript};
//!
//! let server = EngineServer::bind(("127.0.0.1", 6672), LineScript)?;
//! server.serve()?;
//! # Ok::<(), simbridge_engine::EngineError>(())
//! ```
//!
//! Scripts see the simulation through [`GameApi`]. Entity lookups are
//! cached per kind in an [`ObjectStorage`], and scripts hold [`Shell`]s:
//! cheap views over whatever snapshot the cache had when the shell was made.

pub mod client;
mod error;
pub mod game;
pub mod script;
pub mod server;
pub mod shell;
pub mod storage;

pub use client::{Continuation, RemoteCallClient, RunEnd, SharedClient};
pub use error::{CallError, CallResult, EngineError, EngineResult};
pub use game::GameApi;
pub use script::{CompileError, LineScript, RuntimeError, ScriptEngine};
pub use server::EngineServer;
pub use shell::Shell;
pub use storage::ObjectStorage;
