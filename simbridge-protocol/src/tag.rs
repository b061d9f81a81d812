//! The closed set of frame tags.

use std::fmt;

const SCRIPT_RUN: &str = "s_script_run";
const CALL_RETURN: &str = "s_callfunc_ret";
const OUTPUT_MESSAGE: &str = "c_output_message";
const EXCEPTION: &str = "c_exception";
const FAILED_TO_COMPILE: &str = "c_failed_to_compile";
const SCRIPT_END: &str = "c_script_end";
const CALL_PREFIX: &str = "c_callfunc_";

/// A frame tag, parsed once at the edge.
///
/// `s_` tags travel host → engine, `c_` tags engine → host. Call-ins carry
/// the host function name in the tag itself (`c_callfunc_<name>`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MessageTag {
    /// Run request; payload is a [`crate::RunScriptMessage`].
    ScriptRun,
    /// Reply to a call-in; payload is a [`crate::CallReply`].
    CallReturn,
    /// Text printed by the script; payload is a string.
    OutputMessage,
    /// Runtime fault, terminal; payload is the fault message.
    Exception,
    /// Compile fault, terminal; payload is the compiler message.
    FailedToCompile,
    /// Successful completion, terminal; no payload.
    ScriptEnd,
    /// Call into the host API; payload is the call's arguments.
    CallFunc(String),
}

impl MessageTag {
    /// Parses a wire tag. Returns `None` for tags outside the known set,
    /// including a bare call prefix with no function name.
    pub fn parse(tag: &str) -> Option<MessageTag> {
        let parsed = match tag {
            SCRIPT_RUN => MessageTag::ScriptRun,
            CALL_RETURN => MessageTag::CallReturn,
            OUTPUT_MESSAGE => MessageTag::OutputMessage,
            EXCEPTION => MessageTag::Exception,
            FAILED_TO_COMPILE => MessageTag::FailedToCompile,
            SCRIPT_END => MessageTag::ScriptEnd,
            other => {
                let name = other.strip_prefix(CALL_PREFIX)?;
                if name.is_empty() {
                    return None;
                }
                MessageTag::CallFunc(name.to_string())
            }
        };
        Some(parsed)
    }

    /// Builds the call-in tag for a host function.
    pub fn call(name: impl Into<String>) -> MessageTag {
        MessageTag::CallFunc(name.into())
    }

    /// Whether the tag ends a run.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            MessageTag::Exception | MessageTag::FailedToCompile | MessageTag::ScriptEnd
        )
    }

    /// The tag as written on the wire.
    pub fn to_wire(&self) -> String {
        match self {
            MessageTag::ScriptRun => SCRIPT_RUN.to_string(),
            MessageTag::CallReturn => CALL_RETURN.to_string(),
            MessageTag::OutputMessage => OUTPUT_MESSAGE.to_string(),
            MessageTag::Exception => EXCEPTION.to_string(),
            MessageTag::FailedToCompile => FAILED_TO_COMPILE.to_string(),
            MessageTag::ScriptEnd => SCRIPT_END.to_string(),
            MessageTag::CallFunc(name) => format!("{CALL_PREFIX}{name}"),
        }
    }
}

impl fmt::Display for MessageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wire())
    }
}
