//! Envelope codec for tokio I/O.
//!
//! Framing: `[4 bytes: payload length, big-endian u32][N bytes: MessagePack payload]`.
//! Length framing is delegated to [`LengthDelimitedCodec`]; this layer
//! (de)serializes the [`Envelope`] and rejects envelopes with no channel.

use bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder, LengthDelimitedCodec};

use super::protocol::{Envelope, MAX_PAYLOAD_SIZE};

/// Codec error type.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("payload too large: {0} bytes (max {MAX_PAYLOAD_SIZE})")]
    PayloadTooLarge(usize),
    #[error("envelope {0} names no channel")]
    MissingChannel(u32),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("MessagePack encode error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
    #[error("MessagePack decode error: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
}

/// Length-prefixed [`Envelope`] codec.
///
/// Used on both ends of the socket: the host's connection tasks and
/// the one-shot `call` client.
#[derive(Debug)]
pub struct EnvelopeCodec {
    frames: LengthDelimitedCodec,
}

impl EnvelopeCodec {
    pub fn new() -> Self {
        let frames = LengthDelimitedCodec::builder()
            .length_field_length(4)
            .max_frame_length(MAX_PAYLOAD_SIZE)
            .new_codec();
        Self { frames }
    }
}

impl Default for EnvelopeCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for EnvelopeCodec {
    type Item = Envelope;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(frame) = self.frames.decode(src)? else {
            return Ok(None);
        };
        let env: Envelope = rmp_serde::from_slice(&frame)?;
        if env.channel.is_empty() {
            return Err(CodecError::MissingChannel(env.id));
        }
        Ok(Some(env))
    }
}

impl Encoder<Envelope> for EnvelopeCodec {
    type Error = CodecError;

    fn encode(&mut self, item: Envelope, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if item.channel.is_empty() {
            return Err(CodecError::MissingChannel(item.id));
        }
        let payload = rmp_serde::to_vec_named(&item)?;
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(CodecError::PayloadTooLarge(payload.len()));
        }
        self.frames.encode(Bytes::from(payload), dst)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use bytes::BufMut;

    use super::*;

    fn envelope(id: u32, payload: &[u8]) -> Envelope {
        Envelope {
            id,
            channel: "flutter/platform".into(),
            payload: payload.to_vec(),
        }
    }

    fn envelope_on(channel: &str, id: u32) -> Envelope {
        Envelope {
            id,
            channel: channel.into(),
            payload: Vec::new(),
        }
    }

    fn encode(env: Envelope) -> BytesMut {
        let mut codec = EnvelopeCodec::new();
        let mut buf = BytesMut::new();
        codec.encode(env, &mut buf).unwrap();
        buf
    }

    #[test]
    fn decodes_complete_frame() {
        let env = envelope(3, br#"{"method":"Clipboard.getData","args":"text/plain"}"#);
        let mut buf = encode(env.clone());
        let mut codec = EnvelopeCodec::new();
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(env));
        assert!(buf.is_empty());
    }

    #[test]
    fn waits_for_partial_header() {
        let mut codec = EnvelopeCodec::new();
        let mut buf = BytesMut::from(&[0u8, 0][..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn waits_for_partial_payload_then_completes() {
        let env = envelope(4, b"partial");
        let full = encode(env.clone());
        let split_at = full.len() - 3;

        let mut codec = EnvelopeCodec::new();
        let mut buf = BytesMut::from(&full[..split_at]);
        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(&full[split_at..]);
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(env));
    }

    #[test]
    fn two_frames_in_one_buffer() {
        let first = envelope(1, b"a");
        let second = envelope(2, b"b");
        let mut buf = encode(first.clone());
        buf.extend_from_slice(&encode(second.clone()));

        let mut codec = EnvelopeCodec::new();
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(first));
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(second));
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn rejects_oversized_header() {
        let mut codec = EnvelopeCodec::new();
        let mut buf = BytesMut::new();
        buf.put_u32((MAX_PAYLOAD_SIZE + 1) as u32);
        let err = codec.decode(&mut buf).unwrap_err();
        assert!(matches!(err, CodecError::Io(_)));
    }

    #[test]
    fn rejects_envelope_without_channel_on_decode() {
        let nameless = Envelope {
            id: 8,
            channel: String::new(),
            payload: Vec::new(),
        };
        let payload = rmp_serde::to_vec_named(&nameless).unwrap();
        let mut buf = BytesMut::new();
        buf.put_u32(payload.len() as u32);
        buf.extend_from_slice(&payload);

        let mut codec = EnvelopeCodec::new();
        assert!(matches!(
            codec.decode(&mut buf).unwrap_err(),
            CodecError::MissingChannel(8)
        ));
    }

    #[test]
    fn refuses_to_encode_envelope_without_channel() {
        let mut codec = EnvelopeCodec::new();
        let mut buf = BytesMut::new();
        let err = codec.encode(envelope_on("", 2), &mut buf).unwrap_err();
        assert!(matches!(err, CodecError::MissingChannel(2)));
        assert!(buf.is_empty());
    }

    #[test]
    fn rejects_garbage_payload() {
        let mut codec = EnvelopeCodec::new();
        let mut buf = BytesMut::new();
        buf.put_u32(2);
        buf.extend_from_slice(&[0xc1, 0xc1]);
        assert!(matches!(
            codec.decode(&mut buf).unwrap_err(),
            CodecError::Decode(_)
        ));
    }
}
