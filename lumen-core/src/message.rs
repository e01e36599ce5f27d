//! Protocol messages exchanged between the control and remote surfaces.
//!
//! The payload of every packet is one [`Message`] encoded as JSON with
//! an adjacent `type`/`data` tag:
//!
//! ```text
//! Control ──[update       {type:'update', data:{…frame…}}]──────► Remote
//! Control ──[visibility   {type:'visibility', data:{showProjector}}]► Remote
//! Control ──[requestFullscreen {type:'requestFullscreen'}]─────────► Remote
//!
//! Remote  ──[projectorReady]──────────────────────────────────────► Control
//! Remote  ──[next | previous | togglePlay | toggleProjector]──────► Control
//! Remote  ──[fullscreenAck {type:'fullscreenAck', data:{granted}}]► Control
//! Remote  ──[mediaDuration {type:'mediaDuration', data:{id, seconds}}]► Control
//! ```
//!
//! `mediaDuration` is how a surface that actually plays media reports a
//! running time it discovered, so auto-advance can follow it.
//!
//! The packet header repeats the message kind as a [`MessageKind`]
//! discriminant so a receiver can reject mismatched payloads.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::LumenError;
use crate::flags::ProtocolFlags;
use crate::frame::BroadcastFrame;

// ── MessageKind ──────────────────────────────────────────────────

/// Wire discriminant for each message.
///
/// - `0x01..0x0F`: control → remote
/// - `0x10..0x1F`: remote → control (back-channel)
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Update = 0x01,
    Visibility = 0x02,
    RequestFullscreen = 0x03,

    ProjectorReady = 0x10,
    ToggleProjector = 0x11,
    TogglePlay = 0x12,
    Next = 0x13,
    Previous = 0x14,
    FullscreenAck = 0x15,
    MediaDuration = 0x16,
}

impl TryFrom<u32> for MessageKind {
    type Error = LumenError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(MessageKind::Update),
            0x02 => Ok(MessageKind::Visibility),
            0x03 => Ok(MessageKind::RequestFullscreen),

            0x10 => Ok(MessageKind::ProjectorReady),
            0x11 => Ok(MessageKind::ToggleProjector),
            0x12 => Ok(MessageKind::TogglePlay),
            0x13 => Ok(MessageKind::Next),
            0x14 => Ok(MessageKind::Previous),
            0x15 => Ok(MessageKind::FullscreenAck),
            0x16 => Ok(MessageKind::MediaDuration),

            _ => Err(LumenError::UnknownVariant {
                type_name: "MessageKind",
                value: value as u64,
            }),
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl MessageKind {
    /// The JSON `type` tag for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Update => "update",
            MessageKind::Visibility => "visibility",
            MessageKind::RequestFullscreen => "requestFullscreen",
            MessageKind::ProjectorReady => "projectorReady",
            MessageKind::ToggleProjector => "toggleProjector",
            MessageKind::TogglePlay => "togglePlay",
            MessageKind::Next => "next",
            MessageKind::Previous => "previous",
            MessageKind::FullscreenAck => "fullscreenAck",
            MessageKind::MediaDuration => "mediaDuration",
        }
    }

    /// Returns `true` for messages sent by the remote surface.
    pub fn is_back_channel(&self) -> bool {
        (*self as u32) >= 0x10
    }

    /// Header flags implied by this kind.
    pub fn default_flags(&self) -> ProtocolFlags {
        match self {
            MessageKind::Update => ProtocolFlags::SNAPSHOT,
            MessageKind::ProjectorReady => {
                ProtocolFlags::BACK_CHANNEL | ProtocolFlags::HANDSHAKE
            }
            k if k.is_back_channel() => ProtocolFlags::BACK_CHANNEL,
            _ => ProtocolFlags::empty(),
        }
    }
}

// ── Message ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Visibility {
    pub show_projector: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullscreenAck {
    pub granted: bool,
}

/// Intrinsic running time of a catalog item, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaDuration {
    pub id: String,
    pub seconds: f64,
}

/// Every message of the protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum Message {
    // ── Control → Remote ─────────────────────────────────────────
    Update(Box<BroadcastFrame>),
    Visibility(Visibility),
    RequestFullscreen,

    // ── Remote → Control ─────────────────────────────────────────
    ProjectorReady,
    ToggleProjector,
    TogglePlay,
    Next,
    Previous,
    FullscreenAck(FullscreenAck),
    MediaDuration(MediaDuration),
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::Update(_) => MessageKind::Update,
            Message::Visibility(_) => MessageKind::Visibility,
            Message::RequestFullscreen => MessageKind::RequestFullscreen,
            Message::ProjectorReady => MessageKind::ProjectorReady,
            Message::ToggleProjector => MessageKind::ToggleProjector,
            Message::TogglePlay => MessageKind::TogglePlay,
            Message::Next => MessageKind::Next,
            Message::Previous => MessageKind::Previous,
            Message::FullscreenAck(_) => MessageKind::FullscreenAck,
            Message::MediaDuration(_) => MessageKind::MediaDuration,
        }
    }

    pub fn update(frame: BroadcastFrame) -> Self {
        Message::Update(Box::new(frame))
    }

    pub fn visibility(show_projector: bool) -> Self {
        Message::Visibility(Visibility { show_projector })
    }

    /// Encode to the JSON payload carried in a packet.
    pub fn to_json(&self) -> Result<Vec<u8>, LumenError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode a JSON payload. Update frames are validated.
    pub fn from_json(bytes: &[u8]) -> Result<Self, LumenError> {
        let msg: Self = serde_json::from_slice(bytes)?;
        if let Message::Update(frame) = &msg {
            frame.validate()?;
        }
        Ok(msg)
    }
}
