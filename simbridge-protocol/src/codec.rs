//! Length-prefixed framing over a byte stream.
//!
//! Each frame is a 4-byte big-endian length followed by that many bytes of
//! JSON encoding one [`Frame`].

use crate::error::{ProtocolError, ProtocolResult};
use crate::frame::Frame;
use std::io::{self, Read, Write};

/// Maximum frame size (16 MB).
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Reads one length-prefixed frame, blocking until it is complete.
pub fn read_frame<R: Read>(io: &mut R) -> ProtocolResult<Frame> {
    // Read 4-byte length prefix
    let mut len_bytes = [0u8; 4];
    io.read_exact(&mut len_bytes).map_err(map_read_error)?;
    let len = u32::from_be_bytes(len_bytes) as usize;

    if len > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge(len));
    }

    let mut buf = vec![0u8; len];
    io.read_exact(&mut buf).map_err(map_read_error)?;

    Ok(serde_json::from_slice(&buf)?)
}

/// Writes one length-prefixed frame with a single write and flushes.
pub fn write_frame<W: Write>(io: &mut W, frame: &Frame) -> ProtocolResult<()> {
    let data = serde_json::to_vec(frame)?;
    if data.len() > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge(data.len()));
    }

    // One write per frame, prefix included.
    let mut buf = Vec::with_capacity(4 + data.len());
    buf.extend_from_slice(&(data.len() as u32).to_be_bytes());
    buf.extend_from_slice(&data);
    io.write_all(&buf)?;
    io.flush()?;

    Ok(())
}

fn map_read_error(e: io::Error) -> ProtocolError {
    match e.kind() {
        io::ErrorKind::UnexpectedEof => ProtocolError::ConnectionClosed,
        _ => ProtocolError::Connection(e),
    }
}
