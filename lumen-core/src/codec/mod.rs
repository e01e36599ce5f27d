//! `tokio_util` codec for framed packet I/O.

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::LumenError;
use crate::header::{HEADER_SIZE, PacketHeader};
use crate::packet::{MAX_PAYLOAD_SIZE, Packet};

/// Splits a byte stream into [`Packet`]s and back.
#[derive(Debug, Default, Clone, Copy)]
pub struct LumenCodec;

impl Decoder for LumenCodec {
    type Item = Packet;
    type Error = LumenError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < HEADER_SIZE {
            return Ok(None);
        }

        let header = PacketHeader::decode(&src[..HEADER_SIZE])?;
        let payload_len = header.payload_length as usize;
        if payload_len > MAX_PAYLOAD_SIZE {
            return Err(LumenError::FrameTooLarge {
                size: HEADER_SIZE + payload_len,
                max: HEADER_SIZE + MAX_PAYLOAD_SIZE,
            });
        }

        let total = HEADER_SIZE + payload_len;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        src.advance(HEADER_SIZE);
        let payload = src.split_to(payload_len).freeze();
        Packet::from_parts(header, payload).map(Some)
    }
}

impl Encoder<Packet> for LumenCodec {
    type Error = LumenError;

    fn encode(&mut self, item: Packet, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(item.wire_len());
        dst.put_slice(&item.header().encode());
        dst.put_slice(item.payload());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;

    fn encoded(msg: &Message) -> BytesMut {
        let mut buf = BytesMut::new();
        LumenCodec
            .encode(Packet::from_message(msg).unwrap(), &mut buf)
            .unwrap();
        buf
    }

    #[test]
    fn partial_frames_wait_for_more_bytes() {
        let full = encoded(&Message::visibility(true));
        let mut buf = BytesMut::from(&full[..HEADER_SIZE + 2]);
        assert!(LumenCodec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(&full[HEADER_SIZE + 2..]);
        let pkt = LumenCodec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(pkt.message().unwrap(), Message::visibility(true));
        assert!(buf.is_empty());
    }

    #[test]
    fn back_to_back_packets() {
        let mut buf = encoded(&Message::Next);
        buf.extend_from_slice(&encoded(&Message::Previous));

        let a = LumenCodec.decode(&mut buf).unwrap().unwrap();
        let b = LumenCodec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(a.message().unwrap(), Message::Next);
        assert_eq!(b.message().unwrap(), Message::Previous);
        assert!(LumenCodec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn oversized_length_rejected_before_buffering() {
        let mut header = PacketHeader::new(crate::message::MessageKind::Update, 0, 0);
        header.payload_length = (MAX_PAYLOAD_SIZE + 1) as u32;
        let mut buf = BytesMut::from(&header.encode()[..]);
        assert!(matches!(
            LumenCodec.decode(&mut buf),
            Err(LumenError::FrameTooLarge { .. })
        ));
    }

    #[test]
    fn corrupt_payload_is_an_error() {
        let mut buf = encoded(&Message::TogglePlay);
        let last = buf.len() - 1;
        buf[last] ^= 0x55;
        assert!(matches!(
            LumenCodec.decode(&mut buf),
            Err(LumenError::ChecksumMismatch)
        ));
    }
}
