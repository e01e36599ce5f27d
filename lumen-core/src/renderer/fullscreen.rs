//! Fullscreen re-assertion with bounded retries.
//!
//! Platforms may refuse or silently undo a fullscreen request (focus
//! rules, a window manager still settling). The remote surface retries
//! on an increasing backoff and then gives up without reporting it.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::LumenError;

/// Something that can be put into fullscreen.
#[async_trait]
pub trait FullscreenTarget: Send {
    /// Request fullscreen. `Ok(false)` means the request was refused.
    async fn enter_fullscreen(&mut self) -> Result<bool, LumenError>;

    fn is_fullscreen(&self) -> bool;
}

/// Delays before each attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrySchedule {
    delays: Vec<Duration>,
}

impl RetrySchedule {
    pub fn from_millis(delays: &[u64]) -> Self {
        Self {
            delays: delays.iter().copied().map(Duration::from_millis).collect(),
        }
    }

    pub fn delays(&self) -> &[Duration] {
        &self.delays
    }

    pub fn attempts(&self) -> usize {
        self.delays.len()
    }
}

impl Default for RetrySchedule {
    fn default() -> Self {
        Self::from_millis(&[0, 150, 400, 1000, 2500])
    }
}

/// Keep asking for fullscreen until it sticks or the schedule runs out.
/// Returns whether fullscreen was reached.
pub async fn assert_fullscreen<T>(target: &mut T, schedule: &RetrySchedule) -> bool
where
    T: FullscreenTarget + ?Sized,
{
    for (attempt, delay) in schedule.delays().iter().enumerate() {
        if !delay.is_zero() {
            tokio::time::sleep(*delay).await;
        }
        if target.is_fullscreen() {
            return true;
        }
        match target.enter_fullscreen().await {
            Ok(true) if target.is_fullscreen() => {
                debug!(attempt, "fullscreen granted");
                return true;
            }
            Ok(_) => debug!(attempt, "fullscreen refused"),
            Err(e) => debug!(attempt, "fullscreen request failed: {e}"),
        }
    }
    debug!(attempts = schedule.attempts(), "fullscreen abandoned");
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Grants on the n-th request.
    struct Stubborn {
        grant_on: usize,
        calls: usize,
        full: bool,
    }

    #[async_trait]
    impl FullscreenTarget for Stubborn {
        async fn enter_fullscreen(&mut self) -> Result<bool, LumenError> {
            self.calls += 1;
            if self.calls >= self.grant_on {
                self.full = true;
            }
            Ok(self.full)
        }

        fn is_fullscreen(&self) -> bool {
            self.full
        }
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_granted() {
        let mut target = Stubborn { grant_on: 3, calls: 0, full: false };
        let start = tokio::time::Instant::now();
        assert!(assert_fullscreen(&mut target, &RetrySchedule::default()).await);
        assert_eq!(target.calls, 3);
        assert_eq!(start.elapsed(), Duration::from_millis(550));
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_schedule() {
        let mut target = Stubborn { grant_on: usize::MAX, calls: 0, full: false };
        let schedule = RetrySchedule::from_millis(&[0, 10, 20]);
        assert!(!assert_fullscreen(&mut target, &schedule).await);
        assert_eq!(target.calls, 3);
    }

    #[tokio::test]
    async fn already_fullscreen_needs_no_request() {
        let mut target = Stubborn { grant_on: 1, calls: 0, full: true };
        assert!(assert_fullscreen(&mut target, &RetrySchedule::default()).await);
        assert_eq!(target.calls, 0);
    }
}
