//! Pipeline module - ordered stages plus a terminal handler for one connection.
//!
//! Inbound, a raw socket chunk runs through stage 1..N and then into the
//! handler. Outbound, a value runs through the handler's `outbound` hook,
//! stage N..1, and is queued on the connection's writer task.
//!
//! ```text
//!            ┌─────────┐   ┌──────┐   ┌─────────┐   ┌─────────┐
//! socket ──► │ Framing │ ─►│ Text │ ─►│ Message │ ─►│ Handler │
//! writer ◄── │         │ ◄─│      │ ◄─│         │ ◄─│         │
//!            └─────────┘   └──────┘   └─────────┘   └─────────┘
//! ```
//!
//! A pipeline is not internally synchronized; the connection task that owns
//! it is its only caller.
//!
//! # Example
//!
//! ```
//! use msgpipe::handler::Handler;
//! use msgpipe::pipeline::{Payload, Pipeline, Stage};
//! use msgpipe::protocol::{build_frame, DEFAULT_MAX_FRAME_SIZE};
//! use msgpipe::Result;
//!
//! struct Print;
//!
//! impl Handler for Print {
//!     fn inbound(&mut self, payload: Payload) -> Result<()> {
//!         if let Payload::Message(m) = payload {
//!             println!("{}", m.text());
//!         }
//!         Ok(())
//!     }
//! }
//!
//! let mut pipeline = Pipeline::builder()
//!     .stages(Stage::message_chain(DEFAULT_MAX_FRAME_SIZE))
//!     .handler(Print)
//!     .build()
//!     .unwrap();
//! pipeline.open().unwrap();
//!
//! let json = br#"{"Msg":"hi","Time":"2024-01-01T00:00:00Z"}"#;
//! pipeline
//!     .dispatch_inbound(build_frame(json, DEFAULT_MAX_FRAME_SIZE).unwrap())
//!     .unwrap();
//! ```

mod payload;
mod stage;
mod state;

pub use payload::Payload;
pub use stage::Stage;
pub use state::ConnectionState;

use bytes::Bytes;
use tokio::task::JoinHandle;

use crate::error::{PipelineError, Result};
use crate::handler::Handler;
use crate::writer::WriterHandle;

/// Builder for a [`Pipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    stages: Vec<Stage>,
    handler: Option<Box<dyn Handler>>,
    writer: Option<WriterHandle>,
    writer_task: Option<JoinHandle<Result<()>>>,
    label: Option<String>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one stage. Stage 1 is nearest the transport.
    pub fn stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    /// Append several stages in order.
    pub fn stages(mut self, stages: impl IntoIterator<Item = Stage>) -> Self {
        self.stages.extend(stages);
        self
    }

    /// Set the terminal handler.
    pub fn handler(mut self, handler: impl Handler + 'static) -> Self {
        self.handler = Some(Box::new(handler));
        self
    }

    /// Attach the transport write side.
    ///
    /// `task` is the writer task behind `writer`; the pipeline awaits it on
    /// shutdown so queued writes drain before the pipeline reports `Closed`.
    pub fn writer(mut self, writer: WriterHandle, task: JoinHandle<Result<()>>) -> Self {
        self.writer = Some(writer);
        self.writer_task = Some(task);
        self
    }

    /// Name used in log fields, usually the peer address.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Build the pipeline in the `Connecting` state.
    ///
    /// # Errors
    ///
    /// Returns `EmptyPipeline` if there are no stages and no handler.
    pub fn build(self) -> Result<Pipeline> {
        if self.stages.is_empty() && self.handler.is_none() {
            return Err(PipelineError::EmptyPipeline);
        }

        Ok(Pipeline {
            stages: self.stages,
            handler: self.handler,
            writer: self.writer,
            writer_task: self.writer_task,
            state: ConnectionState::Connecting,
            label: self.label.unwrap_or_else(|| "-".to_string()),
        })
    }
}

/// Ordered chain of stages and a terminal handler bound to one connection.
pub struct Pipeline {
    stages: Vec<Stage>,
    handler: Option<Box<dyn Handler>>,
    writer: Option<WriterHandle>,
    writer_task: Option<JoinHandle<Result<()>>>,
    state: ConnectionState,
    label: String,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Open
    }

    /// Number of stages still held (zero once closed).
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Mark the transport as established. No-op if already open.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionClosed` once closing has begun.
    pub fn open(&mut self) -> Result<()> {
        match self.state {
            ConnectionState::Connecting => {
                self.state = ConnectionState::Open;
                tracing::debug!(peer = %self.label, stages = self.stages.len(), "Pipeline open");
                Ok(())
            }
            ConnectionState::Open => Ok(()),
            ConnectionState::Closing | ConnectionState::Closed => {
                Err(PipelineError::ConnectionClosed)
            }
        }
    }

    /// Drive a raw chunk through every stage and into the handler.
    ///
    /// Values are forwarded depth-first, so when one chunk holds several
    /// frames each is fully delivered before the next is decoded.
    ///
    /// # Errors
    ///
    /// `ConnectionNotOpen` outside `Open`, with no other effect. Any stage or
    /// handler error stops the traversal, moves the pipeline to `Closing`,
    /// and is reported to [`Handler::fault`].
    pub fn dispatch_inbound(&mut self, chunk: Bytes) -> Result<()> {
        self.ensure_open()?;
        tracing::trace!(peer = %self.label, bytes = chunk.len(), "Inbound chunk");

        forward_inbound(&mut self.stages, &mut self.handler, Payload::Bytes(chunk))
            .map_err(|e| self.fail(e))
    }

    /// Drive a value through the handler hook and stage N..1, then queue the
    /// resulting bytes on the writer.
    ///
    /// Waits only for space in the writer queue, never for the socket.
    ///
    /// # Errors
    ///
    /// Same policy as [`dispatch_inbound`](Self::dispatch_inbound).
    pub async fn dispatch_outbound(&mut self, payload: impl Into<Payload>) -> Result<()> {
        self.ensure_open()?;

        let bytes = match self.encode_outbound(payload.into()) {
            Ok(bytes) => bytes,
            Err(e) => return Err(self.fail(e)),
        };

        let writer = match &self.writer {
            Some(writer) => writer.clone(),
            None => return Err(self.fail(PipelineError::ConnectionClosed)),
        };

        tracing::trace!(peer = %self.label, bytes = bytes.len(), "Outbound chunk");
        if let Err(e) = writer.send(bytes).await {
            return Err(self.fail(e));
        }
        Ok(())
    }

    fn encode_outbound(&mut self, payload: Payload) -> Result<Bytes> {
        if let Some(handler) = self.handler.as_mut() {
            handler.outbound(&payload)?;
        }

        let mut value = payload;
        for stage in self.stages.iter_mut().rev() {
            value = stage.outbound(value)?;
        }

        match value {
            Payload::Bytes(bytes) => Ok(bytes),
            other => Err(PipelineError::UnexpectedPayload {
                stage: "transport",
                expected: "bytes",
                found: other.kind(),
            }),
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.state != ConnectionState::Open {
            return Err(PipelineError::ConnectionNotOpen(self.state));
        }
        Ok(())
    }

    /// Record a dispatch failure: stop accepting work and notify the handler.
    fn fail(&mut self, error: PipelineError) -> PipelineError {
        if self.state == ConnectionState::Open {
            self.state = ConnectionState::Closing;
        }
        tracing::debug!(peer = %self.label, error = %error, "Dispatch failed");
        if let Some(handler) = self.handler.as_mut() {
            handler.fault(&error);
        }
        error
    }

    /// Graceful close: refuse new dispatches, let the writer drain, release.
    ///
    /// # Errors
    ///
    /// Returns the writer task's error, if it failed while draining.
    pub async fn shutdown(&mut self) -> Result<()> {
        if self.state == ConnectionState::Closed {
            return Ok(());
        }
        self.state = ConnectionState::Closing;

        // Dropping the last sender lets the writer task finish its queue.
        self.writer = None;
        let drained = match self.writer_task.take() {
            Some(task) => match task.await {
                Ok(result) => result,
                Err(e) => Err(PipelineError::Transport(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    e,
                ))),
            },
            None => Ok(()),
        };

        self.close();
        drained
    }

    /// Release every stage and the handler. Idempotent.
    ///
    /// A writer task still running is detached; it drains its queue and
    /// exits on its own.
    pub fn close(&mut self) {
        if self.state == ConnectionState::Closed {
            return;
        }
        self.state = ConnectionState::Closing;

        if let Some(mut handler) = self.handler.take() {
            handler.closed();
        }
        let buffered: usize = self.stages.iter().map(Stage::buffered).sum();
        if buffered > 0 {
            tracing::debug!(peer = %self.label, bytes = buffered, "Discarding partial frame");
        }
        self.stages.clear();
        self.writer = None;
        self.writer_task = None;

        self.state = ConnectionState::Closed;
        tracing::debug!(peer = %self.label, "Pipeline closed");
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.close();
    }
}

fn forward_inbound(
    stages: &mut [Stage],
    handler: &mut Option<Box<dyn Handler>>,
    payload: Payload,
) -> Result<()> {
    let Some((stage, rest)) = stages.split_first_mut() else {
        return match handler {
            Some(handler) => handler.inbound(payload),
            None => {
                tracing::debug!(kind = payload.kind(), "No terminal handler, value discarded");
                Ok(())
            }
        };
    };

    stage.inbound(payload, &mut |next| forward_inbound(rest, handler, next))
}
