//! Error types for msgpipe.

use thiserror::Error;

use crate::pipeline::ConnectionState;

/// Main error type for all pipeline and connection operations.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Frame bytes are not valid UTF-8.
    #[error("Decode error: {0}")]
    Decode(#[from] std::str::Utf8Error),

    /// Text does not parse as a well-formed message (or a message failed to serialize).
    #[error("Malformed message: {0}")]
    MalformedMessage(#[from] serde_json::Error),

    /// Dispatch attempted while the pipeline is not `Open`.
    #[error("Connection not open (state: {0})")]
    ConnectionNotOpen(ConnectionState),

    /// I/O error from the underlying socket.
    #[error("Transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// Framing violation (declared frame length too large, etc.).
    #[error("Framing error: {0}")]
    Framing(String),

    /// A stage received a payload variant it does not handle.
    #[error("Stage `{stage}` expected {expected} payload, got {found}")]
    UnexpectedPayload {
        stage: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    /// A pipeline was built with neither stages nor a terminal handler.
    #[error("Pipeline has no stages and no terminal handler")]
    EmptyPipeline,

    /// The outbound side of the connection is gone.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Backpressure timeout - write queue full.
    #[error("Backpressure timeout")]
    BackpressureTimeout,

    /// Configuration rejected at startup.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias using PipelineError.
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_from_utf8() {
        let bytes = vec![0xff, 0xfe];
        let err: PipelineError = std::str::from_utf8(&bytes).unwrap_err().into();
        assert!(matches!(err, PipelineError::Decode(_)));
        assert!(err.to_string().starts_with("Decode error"));
    }

    #[test]
    fn test_not_open_names_state() {
        let err = PipelineError::ConnectionNotOpen(ConnectionState::Closed);
        assert_eq!(err.to_string(), "Connection not open (state: closed)");
    }

    #[test]
    fn test_unexpected_payload_message() {
        let err = PipelineError::UnexpectedPayload {
            stage: "text",
            expected: "bytes",
            found: "message",
        };
        assert_eq!(
            err.to_string(),
            "Stage `text` expected bytes payload, got message"
        );
    }
}
