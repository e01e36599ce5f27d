//! Message transport between the control and remote surfaces.
//!
//! [`Transport`] is the seam the engine talks through. Sends never wait:
//! delivery is at-most-once, and a message that cannot be queued is
//! dropped. Receiving is async and yields `None` once the peer is gone.
//!
//! Two implementations ship with the crate:
//! - [`Connection`](crate::network::Connection): framed TCP
//! - [`ChannelTransport`]: an in-process pair over tokio channels

pub mod link;
pub(crate) mod outbox;

use async_trait::async_trait;

use crate::error::LumenError;
use crate::message::{Message, MessageKind};

pub use link::{SurfaceLink, SurfaceOpener};
pub(crate) use outbox::{Inbox, Outbox, outbox};

/// Queue depth for each direction of a transport.
pub const CHANNEL_CAPACITY: usize = 64;

#[async_trait]
pub trait Transport: Send {
    /// Queue a message for delivery without waiting.
    ///
    /// Returns [`LumenError::ChannelClosed`] when the peer is gone. A full
    /// queue drops the message and still returns `Ok`, except for update
    /// frames, where the newest one is held back for delivery.
    fn send(&self, message: Message) -> Result<(), LumenError>;

    /// Next message from the peer, or `None` once the peer has gone away.
    async fn recv(&mut self) -> Option<Message>;

    /// Whether the outbound side is still connected.
    fn is_open(&self) -> bool;
}

// ── ChannelTransport ─────────────────────────────────────────────

/// One end of an in-process transport pair.
#[derive(Debug)]
pub struct ChannelTransport {
    tx: Outbox<Message>,
    rx: Inbox<Message>,
}

impl ChannelTransport {
    /// Create two connected ends.
    pub fn pair() -> (Self, Self) {
        let (a_tx, b_rx) = outbox(CHANNEL_CAPACITY);
        let (b_tx, a_rx) = outbox(CHANNEL_CAPACITY);
        (
            Self { tx: a_tx, rx: a_rx },
            Self { tx: b_tx, rx: b_rx },
        )
    }

    /// Non-blocking receive, for tests and polling loops.
    pub fn try_recv(&mut self) -> Option<Message> {
        self.rx.try_recv()
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    fn send(&self, message: Message) -> Result<(), LumenError> {
        let kind = message.kind();
        self.tx.offer(message, kind == MessageKind::Update, kind.as_str())
    }

    async fn recv(&mut self) -> Option<Message> {
        self.rx.recv().await
    }

    fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }
}
