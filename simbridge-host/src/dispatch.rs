//! Classification of frames read during a run.

use serde_json::Value;
use simbridge_protocol::{Frame, MessageTag};

/// How a run ended, as reported by the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Terminal {
    Success,
    Exception(String),
    CompileFault(String),
}

/// A frame received while awaiting a run's terminal frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Terminal(Terminal),
    /// A call into the host API.
    CallIn { function: String, args: Value },
    /// Text printed by the script.
    Output(String),
    /// Any tag outside the engine → host set, including host-bound tags
    /// echoed back.
    Unrecognized(String),
}

/// Classifies a frame by its tag.
pub fn classify(frame: Frame) -> Inbound {
    let Some(tag) = frame.message_tag() else {
        return Inbound::Unrecognized(frame.tag);
    };
    match tag {
        MessageTag::ScriptEnd => Inbound::Terminal(Terminal::Success),
        MessageTag::Exception => Inbound::Terminal(Terminal::Exception(frame.text())),
        MessageTag::FailedToCompile => Inbound::Terminal(Terminal::CompileFault(frame.text())),
        MessageTag::OutputMessage => Inbound::Output(frame.text()),
        MessageTag::CallFunc(function) => Inbound::CallIn {
            function,
            args: frame.payload,
        },
        MessageTag::ScriptRun | MessageTag::CallReturn => Inbound::Unrecognized(frame.tag),
    }
}
