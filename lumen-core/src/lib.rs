//! # lumen-core
//!
//! Core library for the Lumen live presentation system: one operator
//! drives what a second, separate display shows.
//!
//! This crate contains:
//! - **Protocol types**: `PacketHeader`, `Packet`, `Message`, `MessageKind`, `ProtocolFlags`
//! - **Broadcast frame**: `BroadcastFrame`, the full state snapshot pushed to the remote surface
//! - **Codec**: `LumenCodec` for framed TCP I/O via `tokio_util`
//! - **Network / transport**: `Connection`, `ChannelTransport`, `SurfaceLink`
//! - **State**: playlist staging, the presentation session, link lifecycle
//! - **Scheduler**: single-shot auto-advance deadlines
//! - **Engine**: applies operator commands and back-channel messages
//! - **Renderer**: the remote surface's render state machine
//! - **Error**: `LumenError` and `EngineError`, `thiserror`-based

pub mod catalog;
pub mod codec;
pub mod command;
pub mod engine;
pub mod error;
pub mod flags;
pub mod frame;
pub mod header;
pub mod item;
pub mod message;
pub mod network;
pub mod packet;
pub mod precedence;
pub mod renderer;
pub mod scheduler;
pub mod settings;
pub mod state;
pub mod storage;
pub mod transport;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use catalog::Catalog;
pub use codec::LumenCodec;
pub use command::{OperatorCommand, SettingEdit};
pub use engine::{Engine, EngineStatus, OpenOutcome, PendingOpen};
pub use error::{EngineError, LumenError};
pub use flags::ProtocolFlags;
pub use frame::BroadcastFrame;
pub use header::{HEADER_SIZE, PacketHeader};
pub use item::{ItemKind, ItemStyle, PlayableItem};
pub use message::{FullscreenAck, MediaDuration, Message, MessageKind, Visibility};
pub use network::{Connection, ConnectionInfo};
pub use packet::{MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE, Packet};
pub use precedence::{Resolution, Screen, SessionFlags};
pub use renderer::{RemoteRenderer, RenderEvent, RenderState, RetrySchedule, Scene};
pub use scheduler::{AdvanceTimer, DisabledReason, SchedulePlan};
pub use settings::{DisplaySettings, PersistedSettings, PlaybackSettings};
pub use state::{LinkPhase, PlaylistStaging, PresentationSession};
pub use storage::{JsonFileStore, MemoryStore, PersistedPlaylist, SettingsStore};
pub use transport::{ChannelTransport, SurfaceLink, SurfaceOpener, Transport};
