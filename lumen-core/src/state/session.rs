//! On-air session flags and the freeze-frame cache.

use tracing::{debug, info};

use crate::error::EngineError;
use crate::item::PlayableItem;
use crate::precedence::{self, Resolution, SessionFlags};

/// Live/authorized/paused state of the current presentation.
///
/// `paused_item` is the frozen frame: while transmission is paused and
/// it is set, it is broadcast regardless of index changes underneath.
#[derive(Debug, Default, Clone)]
pub struct PresentationSession {
    is_live: bool,
    content_authorized: bool,
    transmission_paused: bool,
    dark_screen: bool,
    black_screen: bool,
    paused_item: Option<PlayableItem>,
}

impl PresentationSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flags(&self) -> SessionFlags {
        SessionFlags {
            is_live: self.is_live,
            content_authorized: self.content_authorized,
            transmission_paused: self.transmission_paused,
            dark_screen: self.dark_screen,
            black_screen: self.black_screen,
        }
    }

    pub fn is_live(&self) -> bool {
        self.is_live
    }

    pub fn is_authorized(&self) -> bool {
        self.content_authorized
    }

    pub fn is_paused(&self) -> bool {
        self.transmission_paused
    }

    pub fn paused_item(&self) -> Option<&PlayableItem> {
        self.paused_item.as_ref()
    }

    // ── Transitions ──────────────────────────────────────────────

    /// Go on air. Authorization is always reset on the off→on edge.
    /// Returns `false` if already live.
    pub fn go_live(&mut self) -> bool {
        if self.is_live {
            return false;
        }
        self.is_live = true;
        self.content_authorized = false;
        self.paused_item = None;
        info!("session is live; content awaiting authorization");
        true
    }

    /// Go off air. The caller tears down the published snapshot.
    pub fn end_live(&mut self) {
        self.is_live = false;
        self.transmission_paused = false;
        self.paused_item = None;
        info!("session ended");
    }

    pub fn authorize(&mut self) -> Result<(), EngineError> {
        if !self.is_live {
            return Err(EngineError::NotLive);
        }
        self.content_authorized = true;
        self.paused_item = None;
        info!("content authorized");
        Ok(())
    }

    /// Flip transmission pause. `current` is the item being broadcast
    /// right now; it is frozen on pause and released on resume.
    /// Returns the new paused state.
    pub fn toggle_pause(&mut self, current: Option<PlayableItem>) -> bool {
        self.transmission_paused = !self.transmission_paused;
        if self.transmission_paused {
            debug!(frozen = ?current.as_ref().map(|i| i.id.as_str()), "transmission paused");
            self.paused_item = current;
        } else {
            debug!("transmission resumed");
            self.paused_item = None;
        }
        self.transmission_paused
    }

    pub fn set_dark_screen(&mut self, on: bool) {
        self.dark_screen = on;
    }

    pub fn set_black_screen(&mut self, on: bool) {
        self.black_screen = on;
    }

    // ── Resolution ───────────────────────────────────────────────

    /// What to broadcast given the active list item.
    pub fn resolve(&self, active: Option<&PlayableItem>) -> Resolution {
        precedence::resolve(&self.flags(), || {
            match (&self.paused_item, self.transmission_paused) {
                (Some(frozen), true) => Some(frozen.clone()),
                _ => active.cloned(),
            }
        })
    }
}
