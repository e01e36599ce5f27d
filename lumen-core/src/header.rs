//! Fixed-size packet header.
//!
//! ```text
//! magic:          [u8; 4]  "LUM1"
//! version:        u16
//! flags:          u16      ProtocolFlags
//! kind:           u32      MessageKind
//! checksum:       u32      first 4 bytes of blake3(payload), LE
//! payload_length: u32
//! ```
//!
//! All integers are little-endian.

use crate::error::LumenError;
use crate::flags::ProtocolFlags;
use crate::message::MessageKind;

pub const MAGIC: [u8; 4] = *b"LUM1";
pub const PROTOCOL_VERSION: u16 = 1;
pub const HEADER_SIZE: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    pub version: u16,
    pub flags: ProtocolFlags,
    pub kind: MessageKind,
    pub checksum: u32,
    pub payload_length: u32,
}

impl PacketHeader {
    pub fn new(kind: MessageKind, checksum: u32, payload_length: u32) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            flags: kind.default_flags(),
            kind,
            checksum,
            payload_length,
        }
    }

    /// Serialize to bytes (little-endian).
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(&MAGIC);
        buf[4..6].copy_from_slice(&self.version.to_le_bytes());
        buf[6..8].copy_from_slice(&self.flags.bits().to_le_bytes());
        buf[8..12].copy_from_slice(&(self.kind as u32).to_le_bytes());
        buf[12..16].copy_from_slice(&self.checksum.to_le_bytes());
        buf[16..20].copy_from_slice(&self.payload_length.to_le_bytes());
        buf
    }

    /// Deserialize and validate magic, version, flags and kind.
    pub fn decode(data: &[u8]) -> Result<Self, LumenError> {
        if data.len() < HEADER_SIZE {
            return Err(LumenError::InvalidHeader("header too short"));
        }
        if data[0..4] != MAGIC {
            return Err(LumenError::InvalidMagic);
        }
        let version = u16::from_le_bytes([data[4], data[5]]);
        if version != PROTOCOL_VERSION {
            return Err(LumenError::UnsupportedVersion(version));
        }
        let flags = ProtocolFlags::from_wire(u16::from_le_bytes([data[6], data[7]]))?;
        let kind = MessageKind::try_from(read_u32(&data[8..12]))?;

        Ok(Self {
            version,
            flags,
            kind,
            checksum: read_u32(&data[12..16]),
            payload_length: read_u32(&data[16..20]),
        })
    }
}

fn read_u32(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[..4]);
    u32::from_le_bytes(buf)
}
