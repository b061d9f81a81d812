//! Frame transport abstraction.
//!
//! Both ends of the bridge drive their connection through [`FrameChannel`],
//! so the call client and the host's execution turn work unchanged over a
//! real socket or an in-memory [`mock::MockChannel`].

use crate::codec::{read_frame, write_frame};
use crate::error::ProtocolResult;
use crate::frame::Frame;
use crate::tag::MessageTag;
use serde::Serialize;
use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use tracing::trace;

/// A blocking, ordered, duplex stream of frames.
///
/// One frame is in flight per direction at a time; callers serialize their
/// own use. There is no partial-frame state visible to callers.
pub trait FrameChannel {
    /// Writes one frame atomically.
    fn send_frame(&mut self, frame: &Frame) -> ProtocolResult<()>;

    /// Blocks until one full frame is available.
    fn receive(&mut self) -> ProtocolResult<Frame>;

    /// Encodes a payload under a tag and sends it.
    fn send<T: Serialize + ?Sized>(&mut self, tag: &MessageTag, payload: &T) -> ProtocolResult<()>
    where
        Self: Sized,
    {
        self.send_frame(&Frame::new(tag, payload)?)
    }

    /// Releases the channel. Socket-backed channels also close on drop.
    fn close(&mut self) {}
}

impl<C: FrameChannel + ?Sized> FrameChannel for Box<C> {
    fn send_frame(&mut self, frame: &Frame) -> ProtocolResult<()> {
        (**self).send_frame(frame)
    }

    fn receive(&mut self) -> ProtocolResult<Frame> {
        (**self).receive()
    }

    fn close(&mut self) {
        (**self).close()
    }
}

/// Frame transport over any byte stream.
#[derive(Debug)]
pub struct FrameTransport<S> {
    stream: S,
    frames_sent: u64,
    frames_received: u64,
}

/// The transport used between host and engine.
pub type TcpTransport = FrameTransport<TcpStream>;

impl<S: Read + Write> FrameTransport<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            frames_sent: 0,
            frames_received: 0,
        }
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    pub fn frames_received(&self) -> u64 {
        self.frames_received
    }
}

impl FrameTransport<TcpStream> {
    /// Connects to a listening engine.
    pub fn connect<A: ToSocketAddrs>(addr: A) -> ProtocolResult<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        Ok(Self::new(stream))
    }

    /// Wraps an accepted stream.
    pub fn accepted(stream: TcpStream) -> ProtocolResult<Self> {
        stream.set_nodelay(true)?;
        Ok(Self::new(stream))
    }

    /// Shuts down both directions; the peer's next read fails.
    pub fn shutdown(&self) {
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}

impl<S: Read + Write> FrameChannel for FrameTransport<S> {
    fn send_frame(&mut self, frame: &Frame) -> ProtocolResult<()> {
        write_frame(&mut self.stream, frame)?;
        self.frames_sent += 1;
        trace!(tag = %frame.tag, "frame sent");
        Ok(())
    }

    fn receive(&mut self) -> ProtocolResult<Frame> {
        let frame = read_frame(&mut self.stream)?;
        self.frames_received += 1;
        trace!(tag = %frame.tag, "frame received");
        Ok(frame)
    }

    fn close(&mut self) {
        let _ = self.stream.flush();
    }
}

/// An in-memory channel for testing.
pub mod mock {
    use super::*;
    use crate::error::ProtocolError;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// One end of an in-memory frame pipe.
    ///
    /// `receive` never blocks: an empty queue reads as a closed connection,
    /// so tests must queue every frame the code under test will read.
    #[derive(Debug, Clone)]
    pub struct MockChannel {
        incoming: Arc<Mutex<VecDeque<Frame>>>,
        outgoing: Arc<Mutex<VecDeque<Frame>>>,
        connected: Arc<Mutex<bool>>,
    }

    impl MockChannel {
        /// Creates a standalone end; the test plays the peer through
        /// [`Self::queue_incoming`] and [`Self::take_outgoing`].
        pub fn new() -> Self {
            Self {
                incoming: Arc::new(Mutex::new(VecDeque::new())),
                outgoing: Arc::new(Mutex::new(VecDeque::new())),
                connected: Arc::new(Mutex::new(true)),
            }
        }

        /// Creates two ends wired to each other.
        pub fn pair() -> (Self, Self) {
            let queue1 = Arc::new(Mutex::new(VecDeque::new()));
            let queue2 = Arc::new(Mutex::new(VecDeque::new()));
            let connected = Arc::new(Mutex::new(true));

            let end1 = Self {
                incoming: queue1.clone(),
                outgoing: queue2.clone(),
                connected: connected.clone(),
            };
            let end2 = Self {
                incoming: queue2,
                outgoing: queue1,
                connected,
            };
            (end1, end2)
        }

        /// Queues a frame to be received.
        pub fn queue_incoming(&self, frame: Frame) {
            self.incoming.lock().unwrap().push_back(frame);
        }

        /// Gets the next frame this end sent.
        pub fn take_outgoing(&self) -> Option<Frame> {
            self.outgoing.lock().unwrap().pop_front()
        }

        /// Drains every frame this end sent.
        pub fn drain_outgoing(&self) -> Vec<Frame> {
            self.outgoing.lock().unwrap().drain(..).collect()
        }

        /// Number of frames queued for this end to receive.
        pub fn pending_incoming(&self) -> usize {
            self.incoming.lock().unwrap().len()
        }

        pub fn is_connected(&self) -> bool {
            *self.connected.lock().unwrap()
        }
    }

    impl Default for MockChannel {
        fn default() -> Self {
            Self::new()
        }
    }

    impl FrameChannel for MockChannel {
        fn send_frame(&mut self, frame: &Frame) -> ProtocolResult<()> {
            if !self.is_connected() {
                return Err(ProtocolError::ConnectionClosed);
            }
            self.outgoing.lock().unwrap().push_back(frame.clone());
            Ok(())
        }

        fn receive(&mut self) -> ProtocolResult<Frame> {
            if !self.is_connected() {
                return Err(ProtocolError::ConnectionClosed);
            }
            self.incoming
                .lock()
                .unwrap()
                .pop_front()
                .ok_or(ProtocolError::ConnectionClosed)
        }

        fn close(&mut self) {
            *self.connected.lock().unwrap() = false;
        }
    }
}
