//! Text codec - frame bytes to UTF-8 strings and back.
//!
//! The whole frame is decoded at once; there is no partial-character
//! recovery across frames.

use bytes::Bytes;

use crate::error::Result;

/// UTF-8 codec between raw frame bytes and text.
pub struct TextCodec;

impl TextCodec {
    /// Decode a frame as UTF-8.
    ///
    /// # Errors
    ///
    /// Returns `Decode` if the bytes are not valid UTF-8.
    #[inline]
    pub fn decode(data: &[u8]) -> Result<String> {
        Ok(std::str::from_utf8(data)?.to_owned())
    }

    /// Encode text as UTF-8 bytes. Never fails.
    ///
    /// Takes ownership so the string's allocation becomes the `Bytes` buffer.
    #[inline]
    pub fn encode(text: String) -> Bytes {
        Bytes::from(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;

    #[test]
    fn test_decode_ascii() {
        assert_eq!(TextCodec::decode(b"hello world").unwrap(), "hello world");
    }

    #[test]
    fn test_decode_multibyte() {
        let text = "zażółć gęślą jaźń ✓";
        let bytes = TextCodec::encode(text.to_string());
        assert_eq!(bytes.len(), text.len());
        assert_eq!(TextCodec::decode(&bytes).unwrap(), text);
    }

    #[test]
    fn test_decode_empty() {
        assert_eq!(TextCodec::decode(b"").unwrap(), "");
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        let result = TextCodec::decode(&[b'o', b'k', 0xC3, 0x28]);
        assert!(matches!(result, Err(PipelineError::Decode(_))));
    }

    #[test]
    fn test_truncated_sequence_rejected() {
        // first two bytes of a three-byte sequence
        let result = TextCodec::decode(&[0xE2, 0x9C]);
        assert!(matches!(result, Err(PipelineError::Decode(_))));
    }
}
