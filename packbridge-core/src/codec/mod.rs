//! Newline-delimited JSON framing for stream transports.
//!
//! Each envelope is serialized as a single JSON line terminated by `\n`.
//! WebSocket transports do not use this codec; they carry one envelope
//! per text frame.

use bytes::{Buf, BufMut, BytesMut};

use crate::error::BridgeError;
use crate::protocol::Envelope;

/// Upper bound on a single encoded envelope.
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

#[derive(Debug, Default)]
pub struct EnvelopeCodec {
    // Bytes already scanned for a newline.
    scanned: usize,
}

impl tokio_util::codec::Decoder for EnvelopeCodec {
    type Item = Envelope;
    type Error = BridgeError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            let newline = src[self.scanned..].iter().position(|b| *b == b'\n');
            let Some(offset) = newline else {
                if src.len() > MAX_FRAME_SIZE {
                    return Err(BridgeError::FrameTooLarge {
                        size: src.len(),
                        max: MAX_FRAME_SIZE,
                    });
                }
                self.scanned = src.len();
                return Ok(None);
            };

            let end = self.scanned + offset;
            self.scanned = 0;
            if end > MAX_FRAME_SIZE {
                return Err(BridgeError::FrameTooLarge {
                    size: end,
                    max: MAX_FRAME_SIZE,
                });
            }

            let line = src.split_to(end);
            src.advance(1);

            let line = trim_ascii(&line);
            if line.is_empty() {
                continue;
            }
            return Envelope::from_slice(line).map(Some);
        }
    }
}

impl tokio_util::codec::Encoder<Envelope> for EnvelopeCodec {
    type Error = BridgeError;

    fn encode(&mut self, item: Envelope, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let json = serde_json::to_vec(&item)?;
        if json.len() > MAX_FRAME_SIZE {
            return Err(BridgeError::FrameTooLarge {
                size: json.len(),
                max: MAX_FRAME_SIZE,
            });
        }
        dst.reserve(json.len() + 1);
        dst.put_slice(&json);
        dst.put_u8(b'\n');
        Ok(())
    }
}

fn trim_ascii(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |i| i + 1);
    &bytes[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageKind;
    use tokio_util::codec::{Decoder, Encoder};

    fn scan_result(id: &str) -> Envelope {
        Envelope {
            kind: MessageKind::ScanResult,
            correlation_id: id.into(),
            payload: serde_json::json!({"success": true}),
        }
    }

    #[test]
    fn partial_frame_waits_for_newline() {
        let mut codec = EnvelopeCodec::default();
        let mut buf = BytesMut::new();
        codec.encode(scan_result("a"), &mut buf).unwrap();

        let mut partial = buf.split_to(buf.len() - 5);
        assert!(codec.decode(&mut partial).unwrap().is_none());
        partial.extend_from_slice(&buf);
        let env = codec.decode(&mut partial).unwrap().unwrap();
        assert_eq!(env.correlation_id, "a");
        assert!(partial.is_empty());
    }

    #[test]
    fn multiple_frames_and_blank_lines() {
        let mut codec = EnvelopeCodec::default();
        let mut buf = BytesMut::new();
        codec.encode(scan_result("1"), &mut buf).unwrap();
        buf.extend_from_slice(b"\r\n\n");
        codec.encode(scan_result("2"), &mut buf).unwrap();

        assert_eq!(codec.decode(&mut buf).unwrap().unwrap().correlation_id, "1");
        assert_eq!(codec.decode(&mut buf).unwrap().unwrap().correlation_id, "2");
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn crlf_terminated_frame() {
        let mut codec = EnvelopeCodec::default();
        let mut buf = BytesMut::from(&b"{\"type\":\"SCAN_RESULT\",\"request_id\":\"x\",\"data\":{}}\r\n"[..]);
        let env = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(env.correlation_id, "x");
    }

    #[test]
    fn malformed_line_is_decode_error() {
        let mut codec = EnvelopeCodec::default();
        let mut buf = BytesMut::from(&b"{oops}\n"[..]);
        assert!(matches!(
            codec.decode(&mut buf),
            Err(BridgeError::Decode(_))
        ));
    }

    #[test]
    fn oversized_frame_rejected() {
        let mut codec = EnvelopeCodec::default();
        let mut buf = BytesMut::from(vec![b'a'; MAX_FRAME_SIZE + 1].as_slice());
        assert!(matches!(
            codec.decode(&mut buf),
            Err(BridgeError::FrameTooLarge { .. })
        ));
    }

    #[tokio::test]
    async fn framed_over_byte_stream() {
        use futures::{SinkExt, StreamExt};
        use tokio_util::codec::Framed;

        let out = Envelope::notification(
            MessageKind::LogError,
            &serde_json::json!({"category": "SYSTEM", "message": "x"}),
        )
        .unwrap();
        let expected = format!("{}\n", out.to_json().unwrap());

        let io = tokio_test::io::Builder::new()
            .read(b"{\"type\":\"SCAN_RESULT\",\"request_id\":\"r1\",\"data\":{\"success\":true}}\n")
            .write(expected.as_bytes())
            .build();
        let mut framed = Framed::new(io, EnvelopeCodec::default());

        let env = framed.next().await.unwrap().unwrap();
        assert_eq!(env.kind, MessageKind::ScanResult);
        assert_eq!(env.correlation_id, "r1");

        framed.send(out).await.unwrap();
    }
}
