//! Handler module - terminal handlers at the application end of a pipeline.
//!
//! Provides:
//! - [`Handler`] - the trait a pipeline calls once a value has passed every stage
//! - [`ServerHandler`] - displays each received message tagged with its origin
//! - [`ClientHandler`] - echoes outgoing messages and displays received ones
//!
//! # Example
//!
//! ```
//! use msgpipe::handler::Handler;
//! use msgpipe::pipeline::Payload;
//! use msgpipe::Result;
//!
//! struct Count(usize);
//!
//! impl Handler for Count {
//!     fn inbound(&mut self, _payload: Payload) -> Result<()> {
//!         self.0 += 1;
//!         Ok(())
//!     }
//! }
//! ```

mod client;
mod server;

pub use client::ClientHandler;
pub use server::{Delivery, ServerHandler};

use crate::error::{PipelineError, Result};
use crate::message::Message;
use crate::pipeline::Payload;

/// Application-level consumer/producer at the end of a pipeline.
///
/// All methods run synchronously on the connection's task; none may block.
pub trait Handler: Send {
    /// Receive a value that passed every inbound stage.
    fn inbound(&mut self, payload: Payload) -> Result<()>;

    /// Observe a value about to enter the outbound stages.
    ///
    /// Returning an error aborts the write.
    fn outbound(&mut self, _payload: &Payload) -> Result<()> {
        Ok(())
    }

    /// A dispatch failed and the connection is going down.
    fn fault(&mut self, _error: &PipelineError) {}

    /// The pipeline released its resources. Called at most once.
    fn closed(&mut self) {}
}

/// Unwrap a `Message` payload or report what arrived instead.
pub(crate) fn expect_message(handler: &'static str, payload: Payload) -> Result<Message> {
    match payload {
        Payload::Message(message) => Ok(message),
        other => Err(PipelineError::UnexpectedPayload {
            stage: handler,
            expected: "message",
            found: other.kind(),
        }),
    }
}
