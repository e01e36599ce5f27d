//! A framed protocol packet: header plus JSON payload.

use bytes::Bytes;

use crate::error::LumenError;
use crate::header::{HEADER_SIZE, PacketHeader};
use crate::message::{Message, MessageKind};

/// Largest payload a packet may carry.
pub const MAX_PAYLOAD_SIZE: usize = 4 * 1024 * 1024;

/// Largest complete frame (header + payload) the codec will buffer.
pub const MAX_FRAME_SIZE: usize = HEADER_SIZE + MAX_PAYLOAD_SIZE;

#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    header: PacketHeader,
    payload: Bytes,
}

impl Packet {
    /// Encode a message into a packet.
    pub fn from_message(message: &Message) -> Result<Self, LumenError> {
        let payload = message.to_json()?;
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(LumenError::PayloadTooLarge {
                size: payload.len(),
                max: MAX_PAYLOAD_SIZE,
            });
        }
        let header = PacketHeader::new(
            message.kind(),
            checksum(&payload),
            payload.len() as u32,
        );
        Ok(Self {
            header,
            payload: Bytes::from(payload),
        })
    }

    /// Assemble a packet from a decoded header and its payload bytes,
    /// verifying length and checksum.
    pub fn from_parts(header: PacketHeader, payload: Bytes) -> Result<Self, LumenError> {
        if payload.len() != header.payload_length as usize {
            return Err(LumenError::InvalidHeader("payload length mismatch"));
        }
        if checksum(&payload) != header.checksum {
            return Err(LumenError::ChecksumMismatch);
        }
        Ok(Self { header, payload })
    }

    pub fn header(&self) -> &PacketHeader {
        &self.header
    }

    pub fn kind(&self) -> MessageKind {
        self.header.kind
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Decode the payload, checking it agrees with the header kind.
    pub fn message(&self) -> Result<Message, LumenError> {
        let message = Message::from_json(&self.payload)?;
        if message.kind() != self.header.kind {
            return Err(LumenError::KindMismatch {
                header: self.header.kind.as_str(),
                payload: message.kind().as_str(),
            });
        }
        Ok(message)
    }

    /// Total encoded size.
    pub fn wire_len(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }
}

/// First four bytes of the blake3 digest, little-endian.
pub fn checksum(payload: &[u8]) -> u32 {
    let digest = blake3::hash(payload);
    let bytes = digest.as_bytes();
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}
