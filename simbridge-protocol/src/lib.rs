//! Wire protocol for simbridge.
//!
//! The host (the simulation) and the engine (the scripting subprocess) talk
//! over one loopback stream socket. Every message is a [`Frame`]: a string
//! tag plus an opaque JSON payload whose shape is implied by the tag.
//!
//! # Conversation shape
//!
//! The protocol is strictly turn-based. The host opens a run with
//! `s_script_run` and then only reads. The engine answers with any number of
//! `c_output_message` and `c_callfunc_<name>` frames, each call-in being
//! answered by exactly one `s_callfunc_ret` before the engine sends anything
//! else, and finally one terminal frame:
//!
//! ```text
//! host                         engine
//!  | --- s_script_run ---------> |
//!  | <-- c_output_message ------ |
//!  | <-- c_callfunc_get_object - |
//!  | --- s_callfunc_ret -------> |
//!  | <-- c_script_end ---------- |   (or c_exception / c_failed_to_compile)
//! ```
//!
//! ## Components
//!
//! - **Codec**: length-prefixed framing ([`read_frame`], [`write_frame`])
//! - **Tags**: the closed set of frame tags ([`MessageTag`])
//! - **Messages**: call-in argument and reply payloads ([`messages`])
//! - **Channel**: the blocking frame transport ([`FrameChannel`], [`FrameTransport`])

pub mod channel;
pub mod codec;
mod error;
mod frame;
pub mod messages;
mod tag;

pub use channel::{FrameChannel, FrameTransport, TcpTransport};
pub use codec::{read_frame, write_frame, MAX_FRAME_SIZE};
pub use error::{ProtocolError, ProtocolResult};
pub use frame::Frame;
pub use messages::{contracts, CallFault, CallReply, FaultKind, RunScriptMessage};
pub use tag::MessageTag;

/// Loopback port the engine listens on unless configured otherwise.
pub const DEFAULT_PORT: u16 = 6672;

/// Loopback address the engine listens on unless configured otherwise.
pub const DEFAULT_HOST: &str = "127.0.0.1";
