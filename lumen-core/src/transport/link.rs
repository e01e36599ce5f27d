//! The control surface's handle on the remote surface.
//!
//! `SurfaceLink` owns at most one [`Transport`] plus the [`LinkPhase`]
//! of the readiness handshake. Pushes are fire-and-forget and only go
//! out once the surface has signalled ready; a dead handle is noticed
//! lazily, the next time something is pushed or received.

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::error::{EngineError, LumenError};
use crate::message::Message;
use crate::state::LinkPhase;
use crate::transport::Transport;

/// Creates the remote surface and returns a transport to it.
///
/// Implementations decide what "create" means: launching a projector
/// process and accepting its connection, or handing out one end of an
/// in-process channel.
#[async_trait]
pub trait SurfaceOpener: Send {
    async fn open(&mut self) -> Result<Box<dyn Transport>, LumenError>;
}

pub struct SurfaceLink {
    transport: Option<Box<dyn Transport>>,
    phase: LinkPhase,
    pushed: u64,
    dropped: u64,
}

impl std::fmt::Debug for SurfaceLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurfaceLink")
            .field("phase", &self.phase)
            .field("attached", &self.transport.is_some())
            .field("pushed", &self.pushed)
            .field("dropped", &self.dropped)
            .finish()
    }
}

impl SurfaceLink {
    pub fn new() -> Self {
        Self {
            transport: None,
            phase: LinkPhase::default(),
            pushed: 0,
            dropped: 0,
        }
    }

    pub fn phase(&self) -> &LinkPhase {
        &self.phase
    }

    pub fn is_ready(&self) -> bool {
        self.phase.is_ready()
    }

    /// Messages handed to the transport so far.
    pub fn pushed(&self) -> u64 {
        self.pushed
    }

    /// Messages discarded because the surface was not ready or gone.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Whether a live handle is held. Does not check the peer.
    pub fn is_attached(&self) -> bool {
        self.transport.as_ref().is_some_and(|t| t.is_open())
    }

    /// Create the remote surface. Failure is reported once and not
    /// retried; the operator opens again by hand.
    pub async fn open(&mut self, opener: &mut dyn SurfaceOpener) -> Result<(), EngineError> {
        if !self.begin_open() {
            return Ok(());
        }
        let result = opener.open().await;
        self.finish_open(result)
    }

    /// First half of [`SurfaceLink::open`] for callers that await the
    /// opener themselves. Returns `false` when a live handle is already
    /// held and there is nothing to open.
    pub fn begin_open(&mut self) -> bool {
        if self.is_attached() {
            info!(phase = %self.phase, "remote surface already open");
            return false;
        }
        self.close();
        // Closed → Opening cannot fail after close().
        let _ = self.phase.begin_open();
        true
    }

    /// Second half of [`SurfaceLink::open`].
    pub fn finish_open(
        &mut self,
        result: Result<Box<dyn Transport>, LumenError>,
    ) -> Result<(), EngineError> {
        match result {
            Ok(transport) => {
                self.install(transport);
                info!("remote surface opened; awaiting ready signal");
                Ok(())
            }
            Err(e) => {
                self.phase.force_close();
                warn!("remote surface unavailable: {e}");
                Err(EngineError::SurfaceUnavailable(e.to_string()))
            }
        }
    }

    /// Adopt an already-connected transport (e.g. an inbound connection).
    pub fn attach(&mut self, transport: Box<dyn Transport>) {
        self.close();
        let _ = self.phase.begin_open();
        self.install(transport);
    }

    fn install(&mut self, transport: Box<dyn Transport>) {
        self.transport = Some(transport);
        let _ = self.phase.attached();
    }

    /// Record the ready signal. Returns `false` if no handle is held.
    pub fn mark_ready(&mut self) -> bool {
        match self.phase.mark_ready() {
            Ok(()) => true,
            Err(e) => {
                warn!("{e}");
                false
            }
        }
    }

    /// Send without waiting. Returns whether the message was handed to
    /// the transport.
    pub fn push(&mut self, message: Message) -> bool {
        if !self.phase.is_ready() {
            self.dropped += 1;
            return false;
        }
        let Some(transport) = self.transport.as_ref() else {
            self.dropped += 1;
            return false;
        };
        match transport.send(message) {
            Ok(()) => {
                self.pushed += 1;
                true
            }
            Err(e) => {
                debug!("remote surface gone ({e}); dropping handle");
                self.dropped += 1;
                self.close();
                false
            }
        }
    }

    /// Next message from the surface. Pending forever while no handle
    /// is held; yields `None` once when the peer goes away.
    pub async fn recv(&mut self) -> Option<Message> {
        let Some(transport) = self.transport.as_mut() else {
            return std::future::pending().await;
        };
        match transport.recv().await {
            Some(message) => Some(message),
            None => {
                info!("remote surface disconnected");
                self.close();
                None
            }
        }
    }

    /// Drop the handle and return to `Closed`.
    pub fn close(&mut self) {
        self.transport = None;
        self.phase.force_close();
    }
}

impl Default for SurfaceLink {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ChannelTransport;

    struct FailingOpener;

    #[async_trait]
    impl SurfaceOpener for FailingOpener {
        async fn open(&mut self) -> Result<Box<dyn Transport>, LumenError> {
            Err(LumenError::Other("popup blocked".into()))
        }
    }

    struct PairOpener(Option<ChannelTransport>);

    #[async_trait]
    impl SurfaceOpener for PairOpener {
        async fn open(&mut self) -> Result<Box<dyn Transport>, LumenError> {
            match self.0.take() {
                Some(t) => Ok(Box::new(t)),
                None => Err(LumenError::ChannelClosed),
            }
        }
    }

    #[tokio::test]
    async fn open_failure_is_surface_unavailable() {
        let mut link = SurfaceLink::new();
        let err = link.open(&mut FailingOpener).await.unwrap_err();
        assert!(matches!(err, EngineError::SurfaceUnavailable(ref m) if m.contains("popup")));
        assert!(link.phase().is_closed());
    }

    #[tokio::test]
    async fn nothing_is_pushed_before_ready() {
        let (ours, mut theirs) = ChannelTransport::pair();
        let mut link = SurfaceLink::new();
        link.open(&mut PairOpener(Some(ours))).await.unwrap();
        assert_eq!(*link.phase(), LinkPhase::AwaitingReady);

        assert!(!link.push(Message::visibility(true)));
        assert!(theirs.try_recv().is_none());

        assert!(link.mark_ready());
        assert!(link.push(Message::visibility(true)));
        assert_eq!(theirs.try_recv(), Some(Message::visibility(true)));
        assert_eq!((link.pushed(), link.dropped()), (1, 1));
    }

    #[tokio::test]
    async fn dead_handle_is_detected_on_push() {
        let (ours, theirs) = ChannelTransport::pair();
        let mut link = SurfaceLink::new();
        link.attach(Box::new(ours));
        link.mark_ready();
        drop(theirs);

        assert!(!link.push(Message::RequestFullscreen));
        assert!(link.phase().is_closed());
        assert!(!link.is_attached());
    }

    #[tokio::test]
    async fn reopening_an_open_surface_keeps_it() {
        let (ours, _theirs) = ChannelTransport::pair();
        let mut link = SurfaceLink::new();
        link.attach(Box::new(ours));
        link.mark_ready();

        link.open(&mut FailingOpener).await.unwrap();
        assert!(link.is_ready());
    }

    #[tokio::test]
    async fn recv_yields_none_once_peer_leaves() {
        let (ours, theirs) = ChannelTransport::pair();
        let mut link = SurfaceLink::new();
        link.attach(Box::new(ours));
        theirs.send(Message::ProjectorReady).unwrap();
        drop(theirs);

        assert_eq!(link.recv().await, Some(Message::ProjectorReady));
        assert_eq!(link.recv().await, None);
        assert!(link.phase().is_closed());
    }
}
