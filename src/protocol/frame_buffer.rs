//! Frame buffer for accumulating partial reads.
//!
//! Uses `bytes::BytesMut` for zero-copy buffer management.
//! Implements a state machine for handling fragmented frames:
//! - `WaitingForHeader`: Need at least 4 bytes of length prefix
//! - `WaitingForPayload`: Prefix parsed, need N more payload bytes
//!
//! A single socket read may carry part of a frame, exactly one frame, or
//! several frames back to back. [`FrameBuffer::extend`] appends a read and
//! [`FrameBuffer::next_frame`] hands out complete payloads one at a time, so
//! a caller can act on every frame that precedes a bad header.
//!
//! # Example
//!
//! ```
//! use msgpipe::protocol::{build_frame, FrameBuffer, DEFAULT_MAX_FRAME_SIZE};
//!
//! let mut buffer = FrameBuffer::new();
//! let wire = build_frame(b"hello", DEFAULT_MAX_FRAME_SIZE).unwrap();
//!
//! assert!(buffer.push(&wire[..3]).unwrap().is_empty());
//! let frames = buffer.push(&wire[3..]).unwrap();
//! assert_eq!(&frames[0][..], b"hello");
//! ```

use bytes::{Bytes, BytesMut};

use super::wire_format::{LengthHeader, DEFAULT_MAX_FRAME_SIZE, LENGTH_PREFIX_SIZE};
use crate::error::Result;

/// Initial buffer capacity.
const INITIAL_CAPACITY: usize = 8 * 1024;

/// State machine for frame parsing.
#[derive(Debug, Clone, Copy)]
enum State {
    /// Waiting for the complete length prefix.
    WaitingForHeader,
    /// Prefix parsed, waiting for payload bytes.
    WaitingForPayload { remaining: u32 },
}

/// Buffer for accumulating incoming bytes and extracting complete frames.
#[derive(Debug)]
pub struct FrameBuffer {
    /// Accumulated bytes from socket reads.
    buffer: BytesMut,
    /// Current parsing state.
    state: State,
    /// Maximum allowed payload size.
    max_frame_size: u32,
}

impl FrameBuffer {
    /// Create a new frame buffer with the default maximum frame size.
    pub fn new() -> Self {
        Self::with_max_frame_size(DEFAULT_MAX_FRAME_SIZE)
    }

    /// Create a new frame buffer with a custom maximum frame size.
    pub fn with_max_frame_size(max_frame_size: u32) -> Self {
        Self {
            buffer: BytesMut::with_capacity(INITIAL_CAPACITY),
            state: State::WaitingForHeader,
            max_frame_size,
        }
    }

    /// Configured maximum payload size.
    pub fn max_frame_size(&self) -> u32 {
        self.max_frame_size
    }

    /// Append bytes from a socket read.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Push data into the buffer and extract all complete frame payloads.
    ///
    /// Partial data is kept for the next push. Payloads are returned in the
    /// order they appear on the wire.
    ///
    /// # Errors
    ///
    /// Returns error if a declared length exceeds the maximum frame size.
    /// Frames completed earlier in the same call are dropped with it; use
    /// [`extend`](Self::extend) and [`next_frame`](Self::next_frame) to
    /// consume them first.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Bytes>> {
        self.extend(data);

        let mut frames = Vec::new();
        while let Some(frame) = self.next_frame()? {
            frames.push(frame);
        }

        Ok(frames)
    }

    /// Extract the next complete frame payload, if the buffer holds one.
    ///
    /// # Errors
    ///
    /// Returns error if the next declared length exceeds the maximum frame
    /// size. The offending prefix stays in the buffer.
    pub fn next_frame(&mut self) -> Result<Option<Bytes>> {
        loop {
            match self.state {
                State::WaitingForHeader => {
                    let header = match LengthHeader::decode(&self.buffer) {
                        Some(header) => header,
                        None => return Ok(None),
                    };
                    header.validate(self.max_frame_size)?;

                    let _ = self.buffer.split_to(LENGTH_PREFIX_SIZE);

                    if header.payload_length == 0 {
                        return Ok(Some(Bytes::new()));
                    }

                    self.state = State::WaitingForPayload {
                        remaining: header.payload_length,
                    };
                }

                State::WaitingForPayload { remaining } => {
                    let remaining = remaining as usize;
                    if self.buffer.len() < remaining {
                        return Ok(None);
                    }

                    let payload = self.buffer.split_to(remaining).freeze();
                    self.state = State::WaitingForHeader;
                    return Ok(Some(payload));
                }
            }
        }
    }

    /// Get the number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    #[cfg(test)]
    fn state_name(&self) -> &'static str {
        match self.state {
            State::WaitingForHeader => "WaitingForHeader",
            State::WaitingForPayload { .. } => "WaitingForPayload",
        }
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::build_frame;

    fn frame(payload: &[u8]) -> Vec<u8> {
        build_frame(payload, DEFAULT_MAX_FRAME_SIZE).unwrap().to_vec()
    }

    #[test]
    fn test_single_complete_frame() {
        let mut buffer = FrameBuffer::new();
        let frames = buffer.push(&frame(b"hello")).unwrap();

        assert_eq!(frames.len(), 1);
        assert_eq!(&frames[0][..], b"hello");
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_multiple_frames_in_one_push() {
        let mut buffer = FrameBuffer::new();

        let mut combined = frame(b"first");
        combined.extend_from_slice(&frame(b"second"));
        combined.extend_from_slice(&frame(b"third"));

        let frames = buffer.push(&combined).unwrap();

        assert_eq!(frames.len(), 3);
        assert_eq!(&frames[0][..], b"first");
        assert_eq!(&frames[1][..], b"second");
        assert_eq!(&frames[2][..], b"third");
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_fragmented_header() {
        let mut buffer = FrameBuffer::new();
        let bytes = frame(b"test");

        let frames = buffer.push(&bytes[..2]).unwrap();
        assert!(frames.is_empty());
        assert_eq!(buffer.state_name(), "WaitingForHeader");

        let frames = buffer.push(&bytes[2..]).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(&frames[0][..], b"test");
    }

    #[test]
    fn test_fragmented_payload() {
        let mut buffer = FrameBuffer::new();
        let payload = b"this is a longer payload that will be fragmented";
        let bytes = frame(payload);

        let split = LENGTH_PREFIX_SIZE + 10;
        assert!(buffer.push(&bytes[..split]).unwrap().is_empty());
        assert_eq!(buffer.state_name(), "WaitingForPayload");

        let frames = buffer.push(&bytes[split..]).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(&frames[0][..], payload);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_empty_payload() {
        let mut buffer = FrameBuffer::new();
        let frames = buffer.push(&frame(b"")).unwrap();

        assert_eq!(frames.len(), 1);
        assert!(frames[0].is_empty());
    }

    #[test]
    fn test_max_frame_validation() {
        let mut buffer = FrameBuffer::with_max_frame_size(100);
        let header = LengthHeader::new(1000).encode();

        let result = buffer.push(&header);

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("exceeds maximum"));
    }

    #[test]
    fn test_mixed_complete_and_partial() {
        let mut buffer = FrameBuffer::new();

        let first = frame(b"first");
        let second = frame(b"second");

        let mut data = first.clone();
        data.extend_from_slice(&second[..5]);

        let frames = buffer.push(&data).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(&frames[0][..], b"first");
        assert_eq!(buffer.state_name(), "WaitingForPayload");

        let frames = buffer.push(&second[5..]).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(&frames[0][..], b"second");
    }

    #[test]
    fn test_byte_at_a_time() {
        let mut buffer = FrameBuffer::new();
        let bytes = frame(b"hi");

        let mut all = Vec::new();
        for byte in &bytes {
            all.extend(buffer.push(&[*byte]).unwrap());
        }

        assert_eq!(all.len(), 1);
        assert_eq!(&all[0][..], b"hi");
    }

    #[test]
    fn test_partial_frame_stays_buffered() {
        let mut buffer = FrameBuffer::new();
        let bytes = frame(b"test");
        assert!(buffer.push(&bytes[..LENGTH_PREFIX_SIZE + 1]).unwrap().is_empty());

        assert_eq!(buffer.state_name(), "WaitingForPayload");
        assert_eq!(buffer.len(), 1);
        assert!(!buffer.is_empty());
    }

    #[test]
    fn test_next_frame_yields_frames_before_bad_header() {
        let mut buffer = FrameBuffer::with_max_frame_size(16);

        let mut data = frame(b"good");
        data.extend_from_slice(&LengthHeader::new(1024).encode());
        buffer.extend(&data);

        assert_eq!(&buffer.next_frame().unwrap().unwrap()[..], b"good");
        assert!(buffer.next_frame().is_err());
        assert_eq!(buffer.len(), LENGTH_PREFIX_SIZE);
    }
}
