//! Header flags carried by every packet.

use bitflags::bitflags;

bitflags! {
    /// Per-packet flags in the wire header.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ProtocolFlags: u16 {
        /// Payload is a complete state snapshot (replaces everything before it).
        const SNAPSHOT = 0b0000_0001;
        /// Sent by the remote surface toward the control surface.
        const BACK_CHANNEL = 0b0000_0010;
        /// Part of the readiness handshake.
        const HANDSHAKE = 0b0000_0100;
    }
}

impl ProtocolFlags {
    /// Parse flags from the wire, rejecting unknown bits.
    pub fn from_wire(bits: u16) -> Result<Self, crate::error::LumenError> {
        Self::from_bits(bits).ok_or(crate::error::LumenError::UnknownVariant {
            type_name: "ProtocolFlags",
            value: bits as u64,
        })
    }
}
