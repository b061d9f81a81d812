//! Error types for the protocol layer.

use std::io;
use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur while exchanging frames.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Socket connect/read/write failure.
    #[error("connection error: {0}")]
    Connection(#[from] io::Error),

    /// The peer closed the stream (cleanly or mid-frame).
    #[error("connection closed by peer")]
    ConnectionClosed,

    /// Payload could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Frame exceeds [`crate::MAX_FRAME_SIZE`].
    #[error("frame too large: {0} bytes")]
    FrameTooLarge(usize),

    /// A well-formed frame arrived where another tag was required.
    #[error("unexpected frame: expected {expected}, got {got}")]
    UnexpectedFrame { expected: String, got: String },

    /// A frame carried a tag outside the known set.
    #[error("unrecognized frame tag: {0}")]
    UnrecognizedTag(String),
}

impl ProtocolError {
    /// Whether the error means the connection is gone and must be re-established.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, ProtocolError::Connection(_) | ProtocolError::ConnectionClosed)
    }
}
