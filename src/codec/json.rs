//! JSON codec between text and [`Message`].
//!
//! Parsing is permissive: fields other than `Msg` and `Time` are ignored.
//! Both of those are required.

use crate::error::Result;
use crate::message::Message;

/// JSON codec for messages.
pub struct MessageCodec;

impl MessageCodec {
    /// Serialize a message to JSON text.
    ///
    /// # Errors
    ///
    /// Returns error if the message cannot be serialized.
    #[inline]
    pub fn encode(message: &Message) -> Result<String> {
        Ok(serde_json::to_string(message)?)
    }

    /// Parse JSON text into a message.
    ///
    /// # Errors
    ///
    /// Returns `MalformedMessage` if fields are missing or of the wrong type.
    #[inline]
    pub fn decode(text: &str) -> Result<Message> {
        Ok(serde_json::from_str(text)?)
    }
}
