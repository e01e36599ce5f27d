//! Domain-specific error types for the Lumen protocol and engine.
//!
//! Wire and I/O faults are [`LumenError`]; operator-visible rejections
//! raised by the engine are [`EngineError`]. No panics on invalid input.

use thiserror::Error;

/// The canonical error type for the Lumen wire protocol and its I/O.
#[derive(Debug, Error)]
pub enum LumenError {
    // ── Protocol Errors ──────────────────────────────────────────
    /// Received bytes that do not start with the `LUM1` magic sequence.
    #[error("invalid magic bytes: expected LUM1")]
    InvalidMagic,

    /// A field in the packet header could not be parsed.
    #[error("invalid header: {0}")]
    InvalidHeader(&'static str),

    /// The packet payload failed checksum verification.
    #[error("checksum mismatch")]
    ChecksumMismatch,

    /// A numeric value did not map to any known enum variant.
    #[error("unknown {type_name} discriminant: {value:#x}")]
    UnknownVariant { type_name: &'static str, value: u64 },

    /// The protocol version offered by the peer is not supported.
    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(u16),

    /// The header kind disagrees with the `type` tag of the payload.
    #[error("message kind mismatch: header says {header}, payload says {payload}")]
    KindMismatch {
        header: &'static str,
        payload: &'static str,
    },

    /// A broadcast frame failed validation.
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    // ── Packet Errors ────────────────────────────────────────────
    /// The payload exceeds the configured maximum size.
    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// Frame size exceeded the codec limit.
    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    // ── Connection Errors ────────────────────────────────────────
    /// The TCP/IO layer reported an error.
    #[error("connection error: {0}")]
    Connection(#[from] std::io::Error),

    /// The remote surface handle is gone.
    #[error("channel closed")]
    ChannelClosed,

    // ── Serialization Errors ─────────────────────────────────────
    /// Encoding or decoding of a payload failed.
    #[error("encoding error: {0}")]
    Encoding(String),

    // ── Application Errors ───────────────────────────────────────
    /// An operator command string could not be parsed.
    #[error("invalid command: {0}")]
    InvalidCommand(String),

    /// Catch-all for errors that do not fit another variant.
    #[error("{0}")]
    Other(String),
}

// ── EngineError ───────────────────────────────────────────────────

/// Rejections raised by engine operations.
///
/// Every variant is recoverable by operator action; none of them leave
/// partially applied state behind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Presenting or updating with zero working items.
    #[error("the playlist is empty; add items before presenting")]
    EmptyPlaylist,

    /// `update()` called while nothing is presented.
    #[error("nothing is presented; present the playlist first")]
    NotPresented,

    /// `authorize()` called while off-air.
    #[error("not live; go live before authorizing content")]
    NotLive,

    /// An index pointed outside the working list.
    #[error("index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// An item id was not found in the catalog.
    #[error("unknown item: {0}")]
    UnknownItem(String),

    /// A display setting edit was out of range; nothing was changed.
    #[error("invalid setting: {0}")]
    InvalidSetting(String),

    /// The remote surface could not be opened (e.g. launch blocked).
    #[error("remote surface unavailable: {0}")]
    SurfaceUnavailable(String),
}

// ── Convenient From implementations ──────────────────────────────

impl From<String> for LumenError {
    fn from(s: String) -> Self {
        LumenError::Other(s)
    }
}

impl From<&str> for LumenError {
    fn from(s: &str) -> Self {
        LumenError::Other(s.to_string())
    }
}

impl From<serde_json::Error> for LumenError {
    fn from(e: serde_json::Error) -> Self {
        LumenError::Encoding(e.to_string())
    }
}
