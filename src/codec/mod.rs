//! Codec module - the two symmetric transforms of the message pipeline.
//!
//! - [`TextCodec`] - frame bytes <-> UTF-8 text
//! - [`MessageCodec`] - text <-> [`Message`](crate::Message) via JSON
//!
//! # Design
//!
//! Codecs are marker structs with static methods rather than trait objects.
//! They hold no state, so one pipeline stage can wrap them without any
//! per-connection setup.
//!
//! # Example
//!
//! ```
//! use msgpipe::codec::{MessageCodec, TextCodec};
//! use msgpipe::Message;
//!
//! let msg = Message::now("hello");
//! let text = MessageCodec::encode(&msg).unwrap();
//! let bytes = TextCodec::encode(text);
//!
//! let decoded = MessageCodec::decode(&TextCodec::decode(&bytes).unwrap()).unwrap();
//! assert_eq!(decoded, msg);
//! ```

mod json;
mod text;

pub use json::MessageCodec;
pub use text::TextCodec;
