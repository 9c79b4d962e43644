//! Values flowing between pipeline stages.

use bytes::Bytes;

use crate::message::Message;

/// A value in flight between two stages.
///
/// Ownership moves with the value: a stage that forwards a payload can no
/// longer touch it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Raw bytes (a socket chunk, or one frame after deframing).
    Bytes(Bytes),
    /// Decoded UTF-8 text.
    Text(String),
    /// Fully decoded application message.
    Message(Message),
}

impl Payload {
    /// Short variant name, for errors and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Bytes(_) => "bytes",
            Payload::Text(_) => "text",
            Payload::Message(_) => "message",
        }
    }
}

impl From<Bytes> for Payload {
    fn from(bytes: Bytes) -> Self {
        Payload::Bytes(bytes)
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl From<Message> for Payload {
    fn from(message: Message) -> Self {
        Payload::Message(message)
    }
}
