//! Projector service core logic.
//!
//! Connects to the control console, performs the ready handshake and
//! then feeds every inbound message through a [`RemoteRenderer`]. Local
//! input is forwarded as back-channel commands.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use lumen_core::renderer::{FullscreenTarget, assert_fullscreen};
use lumen_core::{
    Connection, ConnectionInfo, FullscreenAck, LumenError, Message, RemoteRenderer, RenderEvent,
    RetrySchedule, Transport,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::ProjectorConfig;

/// Local input on the projector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerInput {
    Next,
    Previous,
    TogglePlay,
    ToggleProjector,
    Resize(u16, u16),
    Quit,
}

impl ViewerInput {
    /// The back-channel message this input stands for, if any.
    pub fn back_channel(self) -> Option<Message> {
        match self {
            Self::Next => Some(Message::Next),
            Self::Previous => Some(Message::Previous),
            Self::TogglePlay => Some(Message::TogglePlay),
            Self::ToggleProjector => Some(Message::ToggleProjector),
            Self::Resize(..) | Self::Quit => None,
        }
    }
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The console went away; reconnect.
    ControlClosed,
    /// The viewer asked to quit.
    Quit,
    /// The stop handle was cleared.
    Stopped,
}

// ── ProjectorService ─────────────────────────────────────────────

pub struct ProjectorService {
    config: ProjectorConfig,
    schedule: RetrySchedule,
    running: Arc<AtomicBool>,
}

impl ProjectorService {
    pub fn new(config: ProjectorConfig) -> Self {
        Self {
            schedule: config.retry_schedule(),
            config,
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn config(&self) -> &ProjectorConfig {
        &self.config
    }

    /// Obtain a handle that can be used to stop the service from
    /// another task.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Connect to the console, retrying until it answers or the
    /// service is stopped.
    pub async fn connect(&self) -> Result<Connection, LumenError> {
        let info = ConnectionInfo::parse(&self.config.network.control_address)?;
        let delay = Duration::from_millis(self.config.network.reconnect_delay_ms);
        loop {
            if !self.is_running() {
                return Err(LumenError::Other("projector stopped".into()));
            }
            match Connection::connect(&info).await {
                Ok(conn) => {
                    info!("connected to control at {info}");
                    return Ok(conn);
                }
                Err(e) => {
                    debug!("control at {info} not reachable: {e}");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Run one session over an open transport.
    ///
    /// Sends `projectorReady` first; frames are only pushed after it.
    /// `redraw` is called whenever what the audience sees may have
    /// changed. Fullscreen retries run beside the message loop, so frames
    /// keep landing while the display is being coaxed into fullscreen.
    pub async fn serve<T, F, R>(
        &self,
        transport: &mut T,
        renderer: &mut RemoteRenderer,
        fullscreen: &mut F,
        input: &mut mpsc::UnboundedReceiver<ViewerInput>,
        mut redraw: R,
    ) -> Result<SessionEnd, LumenError>
    where
        T: Transport + ?Sized,
        F: FullscreenTarget + ?Sized,
        R: FnMut(&RemoteRenderer),
    {
        transport.send(Message::ProjectorReady)?;
        debug!("ready sent");
        redraw(renderer);

        let (request_tx, mut request_rx) = mpsc::unbounded_channel::<()>();
        let (granted_tx, mut granted_rx) = mpsc::unbounded_channel::<bool>();
        let schedule = &self.schedule;
        let fullscreen_worker = async move {
            while request_rx.recv().await.is_some() {
                // Requests that piled up meanwhile are answered by this round.
                while request_rx.try_recv().is_ok() {}
                let granted = assert_fullscreen(&mut *fullscreen, schedule).await;
                if granted_tx.send(granted).is_err() {
                    break;
                }
            }
            std::future::pending::<()>().await
        };
        tokio::pin!(fullscreen_worker);

        loop {
            tokio::select! {
                message = transport.recv() => {
                    let Some(message) = message else {
                        info!("control closed the connection");
                        return Ok(SessionEnd::ControlClosed);
                    };
                    match renderer.handle(message) {
                        RenderEvent::Redraw | RenderEvent::VisibilityChanged(_) => redraw(renderer),
                        RenderEvent::FullscreenRequested => {
                            let _ = request_tx.send(());
                        }
                        RenderEvent::Ignored => {}
                    }
                }

                Some(granted) = granted_rx.recv() => {
                    if !granted {
                        warn!(attempts = self.schedule.attempts(), "fullscreen not granted");
                    }
                    transport.send(Message::FullscreenAck(FullscreenAck { granted }))?;
                    redraw(renderer);
                }

                _ = &mut fullscreen_worker => {}

                event = input.recv() => match event {
                    None | Some(ViewerInput::Quit) => return Ok(SessionEnd::Quit),
                    Some(ViewerInput::Resize(cols, rows)) => {
                        let (w, h) = self.config.surface_size(cols, rows);
                        renderer.resize(w, h);
                        redraw(renderer);
                    }
                    Some(other) => {
                        if let Some(message) = other.back_channel() {
                            debug!(kind = %message.kind(), "back-channel");
                            transport.send(message)?;
                        }
                    }
                },

                _ = Self::wait_for_stop(&self.running) => return Ok(SessionEnd::Stopped),
            }
        }
    }

    /// Async helper: resolves when `running` becomes false.
    async fn wait_for_stop(running: &Arc<AtomicBool>) {
        loop {
            if !running.load(Ordering::SeqCst) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
