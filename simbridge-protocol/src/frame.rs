use crate::error::{ProtocolError, ProtocolResult};
use crate::tag::MessageTag;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One complete typed message.
///
/// The tag is kept as the raw wire string so that frames with unknown tags
/// still decode; callers classify with [`Frame::message_tag`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    #[serde(rename = "type")]
    pub tag: String,
    #[serde(default)]
    pub payload: Value,
}

impl Frame {
    /// Creates a frame, serializing the payload.
    pub fn new<T: Serialize + ?Sized>(tag: &MessageTag, payload: &T) -> ProtocolResult<Self> {
        Ok(Self {
            tag: tag.to_wire(),
            payload: serde_json::to_value(payload)?,
        })
    }

    /// Creates a frame with a null payload.
    pub fn empty(tag: &MessageTag) -> Self {
        Self {
            tag: tag.to_wire(),
            payload: Value::Null,
        }
    }

    /// Creates a frame from a raw tag string, known or not.
    pub fn raw(tag: impl Into<String>, payload: Value) -> Self {
        Self {
            tag: tag.into(),
            payload,
        }
    }

    /// Parses the tag; `None` when it is outside the known set.
    pub fn message_tag(&self) -> Option<MessageTag> {
        MessageTag::parse(&self.tag)
    }

    /// Deserializes the payload into the type the tag implies.
    pub fn decode<T: DeserializeOwned>(&self) -> ProtocolResult<T> {
        Ok(T::deserialize(&self.payload)?)
    }

    /// Reads the payload as text, as carried by output and fault frames.
    /// A null payload reads as empty text.
    pub fn text(&self) -> String {
        match &self.payload {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }

    /// Fails unless the frame carries the expected tag.
    pub fn expect_tag(&self, expected: &MessageTag) -> ProtocolResult<()> {
        if self.tag == expected.to_wire() {
            Ok(())
        } else {
            Err(ProtocolError::UnexpectedFrame {
                expected: expected.to_wire(),
                got: self.tag.clone(),
            })
        }
    }
}
