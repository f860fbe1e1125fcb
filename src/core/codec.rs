//! Frame codec for the login-server link.
//!
//! Inbound framing is table driven: the command code selects either a fixed
//! length or a dynamic length read from bytes 2-3. [`LoginCodec::peek`]
//! inspects a buffer without consuming anything, which is what the
//! supervisor's guarded parse loop needs; the [`Decoder`] impl consumes
//! messages for plain stream use.

use bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::core::packet::{
    InboundMessage, PacketLen, PacketLengthTable, CODE_LEN, DYNAMIC_HEADER_LEN,
};
use crate::error::{FramingError, LinkError};
use crate::protocol::message::OutboundMessage;

/// Location of one complete message at the front of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub code: u16,
    /// Total message length, header included.
    pub len: usize,
    /// Bytes before the payload: 2 for fixed messages, 4 for dynamic ones.
    pub header_len: usize,
}

impl FrameHeader {
    /// Copy the message this header describes out of `buf`.
    pub fn message(&self, buf: &[u8]) -> InboundMessage {
        InboundMessage::from_frame(Bytes::copy_from_slice(&buf[..self.len]), self.header_len)
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoginCodec {
    table: PacketLengthTable,
}

impl LoginCodec {
    pub fn new(table: PacketLengthTable) -> Self {
        Self { table }
    }

    /// Find the message at the front of `buf`.
    ///
    /// Returns `Ok(None)` when more bytes are needed, either for the code,
    /// the dynamic length field or the message body. Never consumes input.
    pub fn peek(&self, buf: &[u8]) -> Result<Option<FrameHeader>, FramingError> {
        if buf.len() < CODE_LEN {
            return Ok(None);
        }

        let code = u16::from_le_bytes([buf[0], buf[1]]);
        let header = match self.table.lookup(code) {
            PacketLen::Invalid => return Err(FramingError::UnknownCommand(code)),
            PacketLen::Fixed(len) => FrameHeader {
                code,
                len: usize::from(len),
                header_len: CODE_LEN,
            },
            PacketLen::Dynamic => {
                if buf.len() < DYNAMIC_HEADER_LEN {
                    return Ok(None);
                }
                let declared = u16::from_le_bytes([buf[2], buf[3]]);
                if usize::from(declared) < DYNAMIC_HEADER_LEN {
                    return Err(FramingError::UndersizedLength { code, declared });
                }
                FrameHeader {
                    code,
                    len: usize::from(declared),
                    header_len: DYNAMIC_HEADER_LEN,
                }
            }
        };

        if buf.len() < header.len {
            return Ok(None);
        }
        Ok(Some(header))
    }
}

impl Decoder for LoginCodec {
    type Item = InboundMessage;
    type Error = LinkError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(header) = self.peek(src)? else {
            return Ok(None);
        };

        let frame = src.split_to(header.len).freeze();
        Ok(Some(InboundMessage::from_frame(frame, header.header_len)))
    }
}

impl Encoder<OutboundMessage> for LoginCodec {
    type Error = LinkError;

    fn encode(&mut self, item: OutboundMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        item.encode(dst);
        Ok(())
    }
}

/// Decode every complete message in `src`, leaving any partial tail in place.
///
/// Stops at the first framing error; messages decoded before it are dropped
/// with the error since the stream is no longer trustworthy.
pub fn decode_all(
    codec: &mut LoginCodec,
    src: &mut BytesMut,
) -> Result<Vec<InboundMessage>, LinkError> {
    let mut messages = Vec::new();
    while let Some(msg) = codec.decode(src)? {
        messages.push(msg);
    }
    Ok(messages)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::core::packet::{Credentials, HANDSHAKE_LEN};

    fn dynamic_codec() -> LoginCodec {
        let mut table = PacketLengthTable::default();
        table.set(0x2813, PacketLen::Dynamic).unwrap();
        LoginCodec::new(table)
    }

    #[test]
    fn test_single_byte_suspends() {
        let codec = LoginCodec::default();
        assert_eq!(codec.peek(&[0x11]).unwrap(), None);
        assert_eq!(codec.peek(&[]).unwrap(), None);
    }

    #[test]
    fn test_partial_fixed_message_is_not_consumed() {
        let mut codec = LoginCodec::default();
        let mut buf = BytesMut::from(&[0x11, 0x28][..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert_eq!(buf.len(), 2);
    }

    #[test]
    fn test_connection_result_decodes() {
        let mut codec = LoginCodec::default();
        let mut buf = BytesMut::from(&[0x11, 0x28, 0x00][..]);
        let msg = codec.decode(&mut buf).unwrap().expect("complete message");
        assert_eq!(msg.code, 0x2811);
        assert_eq!(msg.length, 3);
        assert_eq!(&msg.payload[..], &[0x00]);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_unknown_code_is_fatal() {
        let codec = LoginCodec::default();
        assert_eq!(
            codec.peek(&[0x99, 0x28]),
            Err(FramingError::UnknownCommand(0x2899))
        );
        // In range but length 0
        assert_eq!(
            codec.peek(&[0x10, 0x28, 0x00]),
            Err(FramingError::UnknownCommand(0x2810))
        );
    }

    #[test]
    fn test_dynamic_needs_four_bytes() {
        let codec = dynamic_codec();
        assert_eq!(codec.peek(&[0x13, 0x28, 0x06]).unwrap(), None);
    }

    #[test]
    fn test_dynamic_length_is_read_from_header() {
        let mut codec = dynamic_codec();
        let mut buf = BytesMut::from(&[0x13, 0x28, 0x06, 0x00, 0xaa, 0xbb, 0x12, 0x28][..]);
        let msg = codec.decode(&mut buf).unwrap().expect("complete message");
        assert_eq!(msg.code, 0x2813);
        assert_eq!(msg.length, 6);
        assert_eq!(&msg.payload[..], &[0xaa, 0xbb]);

        // pong left behind, decoded on the next call
        let pong = codec.decode(&mut buf).unwrap().expect("pong");
        assert_eq!(pong.code, 0x2812);
        assert!(pong.payload.is_empty());
    }

    #[test]
    fn test_dynamic_header_only_message() {
        let mut codec = dynamic_codec();
        let mut buf = BytesMut::from(&[0x13, 0x28, 0x04, 0x00][..]);
        let msg = codec.decode(&mut buf).unwrap().expect("complete message");
        assert_eq!(msg.length, 4);
        assert!(msg.payload.is_empty());
    }

    #[test]
    fn test_undersized_dynamic_length_is_fatal() {
        let codec = dynamic_codec();
        for declared in 0u8..4 {
            assert_eq!(
                codec.peek(&[0x13, 0x28, declared, 0x00, 0, 0, 0, 0]),
                Err(FramingError::UndersizedLength {
                    code: 0x2813,
                    declared: u16::from(declared)
                })
            );
        }
    }

    #[test]
    fn test_decode_all_leaves_partial_tail() {
        let mut codec = LoginCodec::default();
        let mut buf = BytesMut::from(&[0x12, 0x28, 0x11, 0x28, 0x00, 0x12][..]);
        let messages = decode_all(&mut codec, &mut buf).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].code, 0x2812);
        assert_eq!(messages[1].code, 0x2811);
        assert_eq!(&buf[..], &[0x12]);
    }

    #[test]
    fn test_encoder_writes_handshake() {
        let mut codec = LoginCodec::default();
        let mut buf = BytesMut::new();
        let creds = Credentials::new("s1", "p1").unwrap();
        codec
            .encode(OutboundMessage::Handshake(creds), &mut buf)
            .unwrap();
        assert_eq!(buf.len(), HANDSHAKE_LEN);
        assert_eq!(&buf[..2], &[0x20, 0x27]);
        assert_eq!(&buf[2..4], b"s1");
        assert_eq!(&buf[26..28], b"p1");
    }
}
