//! Application-level message: a line of text and the time it was written.
//!
//! Serialized as a JSON object with the field names `Msg` and `Time`:
//!
//! ```text
//! {"Msg":"hello","Time":"2024-05-01T12:30:00.123456789+02:00"}
//! ```
//!
//! Unknown fields are ignored when parsing.

use chrono::{DateTime, FixedOffset, Local};
use serde::{Deserialize, Serialize};

/// One chat message. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "Msg")]
    text: String,
    #[serde(rename = "Time")]
    timestamp: DateTime<FixedOffset>,
}

impl Message {
    /// Create a message with an explicit timestamp.
    pub fn new(text: impl Into<String>, timestamp: DateTime<FixedOffset>) -> Self {
        Self {
            text: text.into(),
            timestamp,
        }
    }

    /// Create a message stamped with the current local time.
    pub fn now(text: impl Into<String>) -> Self {
        Self::new(text, Local::now().fixed_offset())
    }

    /// Message text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// When the producer created the message, with its UTC offset.
    pub fn timestamp(&self) -> DateTime<FixedOffset> {
        self.timestamp
    }

    /// Consume the message, returning the text.
    pub fn into_text(self) -> String {
        self.text
    }
}
