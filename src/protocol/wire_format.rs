//! Wire format encoding and decoding.
//!
//! Every frame is a 4-byte length prefix followed by the payload:
//! ```text
//! ┌──────────┬─────────────────────────┐
//! │ Length   │ Payload (UTF-8 JSON)    │
//! │ 4 bytes  │ `Length` bytes          │
//! │ uint32 BE│                         │
//! └──────────┴─────────────────────────┘
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{PipelineError, Result};

/// Length prefix size in bytes.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Default maximum frame payload size (8 MB).
pub const DEFAULT_MAX_FRAME_SIZE: u32 = 8 * 1024 * 1024;

/// Decoded length prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthHeader {
    /// Payload length in bytes.
    pub payload_length: u32,
}

impl LengthHeader {
    /// Create a header for a payload of the given length.
    pub fn new(payload_length: u32) -> Self {
        Self { payload_length }
    }

    /// Encode header to bytes (Big Endian).
    ///
    /// # Example
    ///
    /// ```
    /// use msgpipe::protocol::LengthHeader;
    ///
    /// let bytes = LengthHeader::new(258).encode();
    /// assert_eq!(bytes, [0, 0, 1, 2]);
    /// ```
    pub fn encode(&self) -> [u8; LENGTH_PREFIX_SIZE] {
        self.payload_length.to_be_bytes()
    }

    /// Decode header from bytes (Big Endian).
    ///
    /// Returns `None` if buffer is too short.
    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < LENGTH_PREFIX_SIZE {
            return None;
        }
        Some(Self {
            payload_length: u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]),
        })
    }

    /// Reject lengths above `max_frame_size`.
    pub fn validate(&self, max_frame_size: u32) -> Result<()> {
        if self.payload_length > max_frame_size {
            return Err(PipelineError::Framing(format!(
                "Frame size {} exceeds maximum {}",
                self.payload_length, max_frame_size
            )));
        }
        Ok(())
    }
}

/// Build a complete frame (prefix + payload) in one buffer.
///
/// # Errors
///
/// Returns error if the payload is longer than `max_frame_size`.
pub fn build_frame(payload: &[u8], max_frame_size: u32) -> Result<Bytes> {
    let length = u32::try_from(payload.len()).map_err(|_| {
        PipelineError::Framing(format!("Frame size {} does not fit in u32", payload.len()))
    })?;
    let header = LengthHeader::new(length);
    header.validate(max_frame_size)?;

    let mut buf = BytesMut::with_capacity(LENGTH_PREFIX_SIZE + payload.len());
    buf.put_slice(&header.encode());
    buf.put_slice(payload);
    Ok(buf.freeze())
}
