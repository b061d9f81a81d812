//! Error types for the host side of the bridge.

use crate::turn::TurnState;
use simbridge_protocol::ProtocolError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("TOML deserialization error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("a script is already running")]
    AlreadyRunning,

    #[error("execution turn cannot advance from {0:?}")]
    InvalidTurnState(TurnState),

    #[error("failed to launch engine {path:?}: {source}")]
    ProcessLaunch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no engine archive at {0:?}")]
    MissingArchive(PathBuf),
}

pub type HostResult<T> = Result<T, HostError>;
