//! Lifecycle of the link to the remote surface.
//!
//! Provides a `LinkPhase` enum with validated transitions that return
//! `Result` instead of panicking.

use std::time::{Duration, Instant};

use crate::error::LumenError;

// ── LinkPhase ────────────────────────────────────────────────────

/// The current phase of the control → remote surface link.
///
/// ```text
///  Closed ──► Opening ──► AwaitingReady ──► Ready
///    ▲           │              │             │
///    └───────────┴──────────────┴─────────────┘
///          (open failed / handle found dead)
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LinkPhase {
    /// No remote surface. Initial / terminal state.
    #[default]
    Closed,

    /// The surface is being created (process launch, connect).
    Opening,

    /// A handle exists; waiting for `projectorReady`.
    AwaitingReady,

    /// The surface signalled ready and receives frames.
    Ready {
        /// When the ready signal arrived.
        since: Instant,
    },
}

impl std::fmt::Display for LinkPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "Closed"),
            Self::Opening => write!(f, "Opening"),
            Self::AwaitingReady => write!(f, "AwaitingReady"),
            Self::Ready { .. } => write!(f, "Ready"),
        }
    }
}

impl LinkPhase {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }

    /// How long the surface has been ready, `None` otherwise.
    pub fn ready_duration(&self) -> Option<Duration> {
        match self {
            Self::Ready { since } => Some(since.elapsed()),
            _ => None,
        }
    }

    // ── Transitions ──────────────────────────────────────────────

    /// Valid from: `Closed`.
    pub fn begin_open(&mut self) -> Result<(), LumenError> {
        match self {
            Self::Closed => {
                *self = Self::Opening;
                Ok(())
            }
            _ => Err(LumenError::Other(format!(
                "cannot open surface: link is {self}"
            ))),
        }
    }

    /// Valid from: `Opening`.
    pub fn attached(&mut self) -> Result<(), LumenError> {
        match self {
            Self::Opening => {
                *self = Self::AwaitingReady;
                Ok(())
            }
            _ => Err(LumenError::Other(format!(
                "cannot attach surface: link is {self}"
            ))),
        }
    }

    /// Valid from: `AwaitingReady`, `Ready` (a repeated ready signal
    /// restarts the clock).
    pub fn mark_ready(&mut self) -> Result<(), LumenError> {
        match self {
            Self::AwaitingReady | Self::Ready { .. } => {
                *self = Self::Ready {
                    since: Instant::now(),
                };
                Ok(())
            }
            _ => Err(LumenError::Other(format!(
                "unexpected ready signal: link is {self}"
            ))),
        }
    }

    /// Force-reset to `Closed` regardless of current state.
    pub fn force_close(&mut self) {
        *self = Self::Closed;
    }
}

// ── Tests ────────────────────────────────────────────────────────
