//! Error types for the engine side of the bridge.

use simbridge_protocol::{CallFault, ProtocolError};
use simbridge_types::EntityKind;
use thiserror::Error;

/// Failure of a call into the host, as seen by a script.
#[derive(Debug, Error)]
pub enum CallError {
    /// The host handler rejected the call.
    #[error("{0}")]
    Fault(#[from] CallFault),

    #[error("bridge error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("unexpected reply to '{function}': {source}")]
    InvalidReply {
        function: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("no {0} snapshot to save")]
    MissingSnapshot(EntityKind),

    /// A shell was read after its refresh failed.
    #[error("{kind} {id} could not be loaded")]
    Unresolved { kind: EntityKind, id: String },
}

impl CallError {
    /// Whether the connection to the host is gone.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, CallError::Protocol(e) if e.is_connection_error())
    }
}

pub type CallResult<T> = Result<T, CallError>;

/// Errors that end an engine connection or the server.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;
