//! Protocol module - wire format and framing.
//!
//! TCP is a byte stream: reads may split or coalesce frames. This module
//! restores message boundaries:
//! - 4-byte length prefix encoding/decoding
//! - Frame buffer for accumulating partial reads

mod frame_buffer;
mod wire_format;

pub use frame_buffer::FrameBuffer;
pub use wire_format::{build_frame, LengthHeader, DEFAULT_MAX_FRAME_SIZE, LENGTH_PREFIX_SIZE};
