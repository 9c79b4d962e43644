//! Pipeline stages.
//!
//! A stage is a bidirectional transform with two operations on one value:
//! `inbound` (toward the terminal handler) and `outbound` (toward the
//! transport). Stages are a closed set of variants so dispatch is a plain
//! `match`.
//!
//! ```text
//! inbound:   Bytes ─Framing─► Bytes(frame) ─Text─► Text ─Message─► Message
//! outbound:  Bytes ◄─Framing─ Bytes ◄─Text─ Text ◄─Message─ Message
//! ```

use crate::codec::{MessageCodec, TextCodec};
use crate::error::{PipelineError, Result};
use crate::protocol::{build_frame, FrameBuffer};

use super::Payload;

/// One transform step in a pipeline.
#[derive(Debug)]
pub enum Stage {
    /// Length-prefix framing. Holds the reassembly buffer for partial reads.
    Framing(FrameBuffer),
    /// Frame bytes <-> UTF-8 text.
    Text,
    /// Text <-> [`Message`](crate::Message) as JSON.
    Message,
}

impl Stage {
    /// Framing stage with the given maximum frame size.
    pub fn framing(max_frame_size: u32) -> Self {
        Stage::Framing(FrameBuffer::with_max_frame_size(max_frame_size))
    }

    /// The standard chain: framing, text, message.
    pub fn message_chain(max_frame_size: u32) -> Vec<Stage> {
        vec![Stage::framing(max_frame_size), Stage::Text, Stage::Message]
    }

    /// Stage name used in errors and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Framing(_) => "framing",
            Stage::Text => "text",
            Stage::Message => "message",
        }
    }

    /// Transform an inbound payload, passing each result to `emit` as soon
    /// as it is produced.
    ///
    /// The framing stage may emit nothing (partial frame) or several values.
    /// If `emit` fails, or a later frame in the same chunk is bad, the stage
    /// stops with that error; everything emitted before it has already been
    /// handled downstream.
    pub fn inbound(
        &mut self,
        payload: Payload,
        emit: &mut dyn FnMut(Payload) -> Result<()>,
    ) -> Result<()> {
        let name = self.name();
        match self {
            Stage::Framing(buffer) => {
                let chunk = match payload {
                    Payload::Bytes(chunk) => chunk,
                    other => return Err(mismatch(name, "bytes", &other)),
                };
                buffer.extend(&chunk);
                while let Some(frame) = buffer.next_frame()? {
                    emit(Payload::Bytes(frame))?;
                }
                Ok(())
            }
            Stage::Text => match payload {
                Payload::Bytes(frame) => emit(Payload::Text(TextCodec::decode(&frame)?)),
                other => Err(mismatch(name, "bytes", &other)),
            },
            Stage::Message => match payload {
                Payload::Text(text) => emit(Payload::Message(MessageCodec::decode(&text)?)),
                other => Err(mismatch(name, "text", &other)),
            },
        }
    }

    /// Bytes held back waiting for the rest of a frame.
    pub fn buffered(&self) -> usize {
        match self {
            Stage::Framing(buffer) => buffer.len(),
            Stage::Text | Stage::Message => 0,
        }
    }

    /// Transform an outbound payload into the form the previous stage expects.
    pub fn outbound(&mut self, payload: Payload) -> Result<Payload> {
        let name = self.name();
        match self {
            Stage::Framing(buffer) => match payload {
                Payload::Bytes(body) => Ok(Payload::Bytes(build_frame(
                    &body,
                    buffer.max_frame_size(),
                )?)),
                other => Err(mismatch(name, "bytes", &other)),
            },
            Stage::Text => match payload {
                Payload::Text(text) => Ok(Payload::Bytes(TextCodec::encode(text))),
                other => Err(mismatch(name, "text", &other)),
            },
            Stage::Message => match payload {
                Payload::Message(message) => Ok(Payload::Text(MessageCodec::encode(&message)?)),
                other => Err(mismatch(name, "message", &other)),
            },
        }
    }
}

fn mismatch(stage: &'static str, expected: &'static str, found: &Payload) -> PipelineError {
    PipelineError::UnexpectedPayload {
        stage,
        expected,
        found: found.kind(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;
    use crate::protocol::DEFAULT_MAX_FRAME_SIZE;
    use bytes::Bytes;
    use chrono::DateTime;

    /// Run one inbound step and collect what it emits.
    fn collect(stage: &mut Stage, payload: Payload) -> Result<Vec<Payload>> {
        let mut out = Vec::new();
        stage.inbound(payload, &mut |value| {
            out.push(value);
            Ok(())
        })?;
        Ok(out)
    }

    fn sample() -> Message {
        Message::new(
            "hello",
            DateTime::parse_from_rfc3339("2024-05-01T12:30:00+02:00").unwrap(),
        )
    }

    #[test]
    fn test_outbound_chain_produces_frame() {
        let mut chain = Stage::message_chain(DEFAULT_MAX_FRAME_SIZE);

        let mut value = Payload::Message(sample());
        for stage in chain.iter_mut().rev() {
            value = stage.outbound(value).unwrap();
        }

        let Payload::Bytes(wire) = value else {
            panic!("expected bytes");
        };
        let json = MessageCodec::encode(&sample()).unwrap();
        assert_eq!(&wire[..4], &(json.len() as u32).to_be_bytes());
        assert_eq!(&wire[4..], json.as_bytes());
    }

    #[test]
    fn test_framing_inbound_partial_then_complete() {
        let mut stage = Stage::framing(DEFAULT_MAX_FRAME_SIZE);
        let wire = build_frame(b"abc", DEFAULT_MAX_FRAME_SIZE).unwrap();

        let out = collect(&mut stage, Payload::Bytes(wire.slice(..5))).unwrap();
        assert!(out.is_empty());
        assert_eq!(stage.buffered(), 1);

        let out = collect(&mut stage, Payload::Bytes(wire.slice(5..))).unwrap();
        assert_eq!(out, vec![Payload::Bytes(Bytes::from_static(b"abc"))]);
        assert_eq!(stage.buffered(), 0);
    }

    #[test]
    fn test_text_stage_rejects_invalid_utf8() {
        let mut stage = Stage::Text;
        let result = collect(&mut stage, Payload::Bytes(Bytes::from_static(&[0xff, 0x00])));
        assert!(matches!(result, Err(PipelineError::Decode(_))));
    }

    #[test]
    fn test_message_stage_rejects_malformed() {
        let mut stage = Stage::Message;
        let result = collect(
            &mut stage,
            Payload::Text(r#"{"Time":"2024-05-01T12:30:00Z"}"#.into()),
        );
        assert!(matches!(result, Err(PipelineError::MalformedMessage(_))));
    }

    #[test]
    fn test_payload_mismatch() {
        let mut stage = Stage::Message;
        let result = collect(&mut stage, Payload::Bytes(Bytes::new()));
        match result {
            Err(PipelineError::UnexpectedPayload {
                stage,
                expected,
                found,
            }) => {
                assert_eq!(stage, "message");
                assert_eq!(expected, "text");
                assert_eq!(found, "bytes");
            }
            other => panic!("unexpected result: {:?}", other),
        }

        let mut stage = Stage::Text;
        assert!(stage.outbound(Payload::Message(sample())).is_err());
    }

    #[test]
    fn test_framing_emits_frames_before_oversized_header() {
        let mut stage = Stage::framing(16);
        let mut chunk = build_frame(b"ok", 16).unwrap().to_vec();
        chunk.extend_from_slice(&[0, 0, 4, 0]);

        let mut out = Vec::new();
        let result = stage.inbound(Payload::Bytes(Bytes::from(chunk)), &mut |value| {
            out.push(value);
            Ok(())
        });

        assert!(matches!(result, Err(PipelineError::Framing(_))));
        assert_eq!(out, vec![Payload::Bytes(Bytes::from_static(b"ok"))]);
    }

    #[test]
    fn test_emit_error_stops_framing() {
        let mut stage = Stage::framing(DEFAULT_MAX_FRAME_SIZE);
        let mut chunk = build_frame(b"one", DEFAULT_MAX_FRAME_SIZE).unwrap().to_vec();
        chunk.extend_from_slice(&build_frame(b"two", DEFAULT_MAX_FRAME_SIZE).unwrap());

        let mut calls = 0;
        let result = stage.inbound(Payload::Bytes(Bytes::from(chunk)), &mut |_| {
            calls += 1;
            Err(PipelineError::ConnectionClosed)
        });

        assert!(matches!(result, Err(PipelineError::ConnectionClosed)));
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_framing_outbound_respects_max() {
        let mut stage = Stage::framing(4);
        let result = stage.outbound(Payload::Bytes(Bytes::from_static(b"too long")));
        assert!(matches!(result, Err(PipelineError::Framing(_))));
    }
}
