//! Calls from the running script into the host.
//!
//! The connection is turn-based: the engine owns the send side while a run
//! is active, and every call-in it sends is answered by exactly one
//! `s_callfunc_ret` before it may send anything else. The client enforces
//! this by resolving any outstanding asynchronous call before each send.
//!
//! A host fault answering an asynchronous call is kept until the next
//! operation that polls, which returns it as that operation's error. A run
//! that ends with a fault still held reports it as its exception.

use crate::error::{CallError, CallResult};
use crate::script::RuntimeError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use simbridge_protocol::{
    CallFault, CallReply, Frame, FrameChannel, MessageTag, ProtocolError, ProtocolResult,
    RunScriptMessage,
};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, trace, warn};

/// Receives the result of an asynchronous call when it is serviced.
pub type Continuation = Box<dyn FnOnce(CallResult<Value>)>;

/// The client as shared by the game API, caches and shells of one
/// connection. Everything runs on the connection's thread.
pub type SharedClient = Rc<RefCell<RemoteCallClient>>;

struct PendingCall {
    function: String,
    continuation: Continuation,
}

/// How a run ended, as reported to the host.
#[derive(Debug, Clone, PartialEq)]
pub enum RunEnd {
    Completed,
    Exception(String),
    CompileFailed(String),
}

/// Engine-side endpoint of the bridge.
pub struct RemoteCallClient {
    channel: Box<dyn FrameChannel>,
    pending: Option<PendingCall>,
    fault: Option<CallFault>,
    calls_sent: u64,
}

impl RemoteCallClient {
    pub fn new(channel: Box<dyn FrameChannel>) -> Self {
        Self {
            channel,
            pending: None,
            fault: None,
            calls_sent: 0,
        }
    }

    /// Wraps the client for sharing across one connection's objects.
    pub fn shared(channel: Box<dyn FrameChannel>) -> SharedClient {
        Rc::new(RefCell::new(Self::new(channel)))
    }

    /// Calls a host function and blocks until its reply arrives.
    pub fn call<A, R>(&mut self, function: &str, args: &A) -> CallResult<R>
    where
        A: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.send_call(function, args)?;
        let value = self.read_reply()?.into_result()?;
        decode_reply(function, value)
    }

    /// Calls a host function without waiting. The continuation runs when
    /// the reply is read, which happens on the next [`Self::poll`] or
    /// before the next frame this client sends.
    pub fn call_async<A>(
        &mut self,
        function: &str,
        args: &A,
        continuation: Continuation,
    ) -> CallResult<()>
    where
        A: Serialize + ?Sized,
    {
        self.send_call(function, args)?;
        self.pending = Some(PendingCall {
            function: function.to_string(),
            continuation,
        });
        Ok(())
    }

    /// Reads the reply to the outstanding asynchronous call, if any, and
    /// runs its continuation. A host fault is handed to the continuation
    /// and held for [`Self::take_fault`]; only transport failures are
    /// returned.
    pub fn poll(&mut self) -> ProtocolResult<()> {
        let Some(pending) = self.pending.take() else {
            return Ok(());
        };
        let reply = self.read_reply()?;
        trace!(function = %pending.function, "async call serviced");
        let result = reply.into_result();
        if let Err(fault) = &result {
            warn!(function = %pending.function, %fault, "async call faulted");
            self.fault = Some(fault.clone());
        }
        (pending.continuation)(result.map_err(CallError::from));
        Ok(())
    }

    /// Polls, then returns the fault of the last serviced asynchronous call
    /// if nothing has claimed it yet.
    pub fn settle(&mut self) -> CallResult<()> {
        self.poll()?;
        match self.take_fault() {
            Some(fault) => Err(CallError::Fault(fault)),
            None => Ok(()),
        }
    }

    /// Claims the held asynchronous fault, if any.
    pub fn take_fault(&mut self) -> Option<CallFault> {
        self.fault.take()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Number of call-ins sent over this connection.
    pub fn calls_sent(&self) -> u64 {
        self.calls_sent
    }

    /// Forwards text printed by the script.
    pub fn send_output(&mut self, text: &str) -> CallResult<()> {
        self.settle()?;
        self.channel
            .send_frame(&Frame::new(&MessageTag::OutputMessage, text)?)?;
        Ok(())
    }

    /// Reports the end of a run. Outstanding calls are serviced first so the
    /// terminal frame is the last frame of the run. A completed run whose
    /// last asynchronous call faulted is reported as an exception.
    pub fn end_run(&mut self, end: &RunEnd) -> ProtocolResult<()> {
        self.poll()?;
        let held = self.take_fault();
        let end = match (end, held) {
            (RunEnd::Completed, Some(fault)) => {
                RunEnd::Exception(RuntimeError::from(CallError::Fault(fault)).to_string())
            }
            (end, _) => end.clone(),
        };
        let frame = match &end {
            RunEnd::Completed => Frame::empty(&MessageTag::ScriptEnd),
            RunEnd::Exception(message) => Frame::new(&MessageTag::Exception, message)?,
            RunEnd::CompileFailed(message) => Frame::new(&MessageTag::FailedToCompile, message)?,
        };
        self.channel.send_frame(&frame)
    }

    /// Blocks until the host requests a run. Returns `None` once the host
    /// has closed the connection.
    pub fn next_run(&mut self) -> ProtocolResult<Option<RunScriptMessage>> {
        self.fault = None;
        loop {
            let frame = match self.channel.receive() {
                Ok(frame) => frame,
                Err(ProtocolError::ConnectionClosed) => return Ok(None),
                Err(e) => return Err(e),
            };
            match frame.message_tag() {
                Some(MessageTag::ScriptRun) => return frame.decode().map(Some),
                _ => warn!(tag = %frame.tag, "ignoring frame received while idle"),
            }
        }
    }

    fn send_call<A: Serialize + ?Sized>(&mut self, function: &str, args: &A) -> CallResult<()> {
        self.settle()?;
        let frame = Frame::new(&MessageTag::call(function), args)?;
        self.channel.send_frame(&frame)?;
        self.calls_sent += 1;
        debug!(function, "call-in sent");
        Ok(())
    }

    fn read_reply(&mut self) -> ProtocolResult<CallReply> {
        let frame = self.channel.receive()?;
        frame.expect_tag(&MessageTag::CallReturn)?;
        frame.decode()
    }
}

/// Deserializes a successful reply into the type the caller expects.
pub fn decode_reply<R: DeserializeOwned>(function: &str, value: Value) -> CallResult<R> {
    serde_json::from_value(value).map_err(|source| CallError::InvalidReply {
        function: function.to_string(),
        source,
    })
}
