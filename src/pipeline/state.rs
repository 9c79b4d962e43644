//! Connection lifecycle.

use std::fmt;

/// Lifecycle of one connection's pipeline.
///
/// ```text
/// Connecting ──open()──► Open ──close/EOF/fault──► Closing ──drained──► Closed
/// ```
///
/// Dispatch is only allowed in `Open`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Built, transport not yet established.
    Connecting,
    /// Dispatch allowed.
    Open,
    /// No new dispatch; queued writes are draining.
    Closing,
    /// All resources released.
    Closed,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Closing => "closing",
            ConnectionState::Closed => "closed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(ConnectionState::Connecting.to_string(), "connecting");
        assert_eq!(ConnectionState::Closed.to_string(), "closed");
    }
}
