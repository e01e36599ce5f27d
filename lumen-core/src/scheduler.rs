//! Auto-advance scheduling.
//!
//! A single-shot deadline, never an interval. Every time one of the
//! inputs changes the outstanding deadline is dropped and a new one is
//! computed from scratch; when a deadline fires it is consumed, and only
//! the state change caused by the advance can arm the next one.
//!
//! The timer holds no task of its own. The owner awaits
//! [`sleep_until`] on [`AdvanceTimer::deadline`] inside its `select!`
//! loop, so cancellation is just replacing a value.

use std::fmt;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::item::PlayableItem;
use crate::state::ListIdentity;

// ── Inputs ───────────────────────────────────────────────────────

/// Everything the schedule depends on.
#[derive(Debug, Clone, Copy)]
pub struct ScheduleInputs<'a> {
    pub is_playing: bool,
    pub transmission_paused: bool,
    pub item: Option<&'a PlayableItem>,
    pub index: usize,
    pub list: ListIdentity,
    /// Configured slide duration in seconds.
    pub slide_duration: Option<u32>,
    /// Legacy per-playlist interval in seconds.
    pub legacy_interval: Option<u32>,
}

impl ScheduleInputs<'_> {
    /// The configured duration, if it is usable.
    pub fn configured_duration(&self) -> Option<Duration> {
        self.slide_duration
            .filter(|s| *s > 0)
            .or(self.legacy_interval.filter(|s| *s > 0))
            .map(|s| Duration::from_secs(u64::from(s)))
    }
}

// ── Plan ─────────────────────────────────────────────────────────

/// Why no deadline is armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisabledReason {
    NotPlaying,
    TransmissionPaused,
    /// Playback is on but no positive slide duration is configured.
    DurationRequired,
    EmptyList,
}

impl fmt::Display for DisabledReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotPlaying => write!(f, "playback stopped"),
            Self::TransmissionPaused => write!(f, "transmission paused"),
            Self::DurationRequired => write!(f, "slide duration required"),
            Self::EmptyList => write!(f, "nothing to advance"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulePlan {
    Disabled(DisabledReason),
    /// Advance after this long.
    Arm(Duration),
}

/// Decide whether and when to advance.
///
/// Timed media uses its intrinsic duration when known; everything else
/// uses the configured duration. A configured duration is required
/// either way.
pub fn plan(inputs: &ScheduleInputs<'_>) -> SchedulePlan {
    if !inputs.is_playing {
        return SchedulePlan::Disabled(DisabledReason::NotPlaying);
    }
    if inputs.transmission_paused {
        return SchedulePlan::Disabled(DisabledReason::TransmissionPaused);
    }
    let Some(configured) = inputs.configured_duration() else {
        return SchedulePlan::Disabled(DisabledReason::DurationRequired);
    };
    let Some(item) = inputs.item else {
        return SchedulePlan::Disabled(DisabledReason::EmptyList);
    };
    SchedulePlan::Arm(item.intrinsic_duration().unwrap_or(configured))
}

// ── AdvanceTimer ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ScheduleKey {
    is_playing: bool,
    transmission_paused: bool,
    index: usize,
    list: ListIdentity,
    slide_duration: Option<u32>,
    plan: SchedulePlan,
}

impl ScheduleKey {
    fn of(inputs: &ScheduleInputs<'_>) -> Self {
        Self {
            is_playing: inputs.is_playing,
            transmission_paused: inputs.transmission_paused,
            index: inputs.index,
            list: inputs.list,
            slide_duration: inputs.slide_duration,
            plan: plan(inputs),
        }
    }
}

#[derive(Debug, Default)]
pub struct AdvanceTimer {
    key: Option<ScheduleKey>,
    deadline: Option<Instant>,
    fired: u64,
}

impl AdvanceTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-evaluate against the current inputs. Returns `true` if the
    /// outstanding deadline was replaced.
    pub fn reschedule(&mut self, inputs: &ScheduleInputs<'_>) -> bool {
        let key = ScheduleKey::of(inputs);
        if self.key == Some(key) {
            return false;
        }
        self.deadline = match key.plan {
            SchedulePlan::Arm(after) => {
                let deadline = Instant::now().checked_add(after);
                match deadline {
                    Some(_) => debug!(index = inputs.index, ?after, "auto-advance armed"),
                    None => debug!(index = inputs.index, ?after, "advance beyond the clock; holding"),
                }
                deadline
            }
            SchedulePlan::Disabled(reason) => {
                debug!(%reason, "auto-advance disabled");
                None
            }
        };
        self.key = Some(key);
        true
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// The current plan, if the timer has been evaluated at all.
    pub fn plan(&self) -> Option<SchedulePlan> {
        self.key.map(|k| k.plan)
    }

    /// Warning to surface to the operator, if any.
    pub fn warning(&self) -> Option<DisabledReason> {
        match self.plan() {
            Some(SchedulePlan::Disabled(r @ DisabledReason::DurationRequired)) => Some(r),
            _ => None,
        }
    }

    /// Consume the deadline if it has passed. Returns `true` exactly once
    /// per armed deadline.
    pub fn fire(&mut self) -> bool {
        match self.deadline {
            Some(at) if at <= Instant::now() => {
                self.deadline = None;
                self.fired += 1;
                true
            }
            _ => false,
        }
    }

    /// How many deadlines have fired.
    pub fn fired(&self) -> u64 {
        self.fired
    }
}

/// Sleep until `deadline`, or forever if there is none.
pub async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs<'a>(item: Option<&'a PlayableItem>, index: usize) -> ScheduleInputs<'a> {
        ScheduleInputs {
            is_playing: true,
            transmission_paused: false,
            item,
            index,
            list: ListIdentity {
                presented: true,
                revision: 1,
            },
            slide_duration: Some(5),
            legacy_interval: None,
        }
    }

    #[test]
    fn plan_requires_positive_duration() {
        let text = PlayableItem::text("t", "hello");
        let mut i = inputs(Some(&text), 0);
        i.slide_duration = Some(0);
        assert_eq!(plan(&i), SchedulePlan::Disabled(DisabledReason::DurationRequired));

        i.legacy_interval = Some(7);
        assert_eq!(plan(&i), SchedulePlan::Arm(Duration::from_secs(7)));
    }

    #[test]
    fn plan_prefers_intrinsic_media_duration() {
        let video = PlayableItem::video("v", "v.mp4").with_duration(12.0);
        assert_eq!(plan(&inputs(Some(&video), 0)), SchedulePlan::Arm(Duration::from_secs(12)));

        let unknown = PlayableItem::video("v", "v.mp4");
        assert_eq!(plan(&inputs(Some(&unknown), 0)), SchedulePlan::Arm(Duration::from_secs(5)));
    }

    #[test]
    fn plan_respects_pause_and_stop() {
        let text = PlayableItem::text("t", "hello");
        let mut i = inputs(Some(&text), 0);
        i.transmission_paused = true;
        assert_eq!(plan(&i), SchedulePlan::Disabled(DisabledReason::TransmissionPaused));
        i.is_playing = false;
        assert_eq!(plan(&i), SchedulePlan::Disabled(DisabledReason::NotPlaying));
    }

    #[tokio::test(start_paused = true)]
    async fn fires_once_after_slide_duration() {
        let text = PlayableItem::text("t", "hello");
        let mut timer = AdvanceTimer::new();
        assert!(timer.reschedule(&inputs(Some(&text), 0)));

        tokio::time::advance(Duration::from_millis(4_999)).await;
        assert!(!timer.fire());

        sleep_until(timer.deadline()).await;
        assert!(timer.fire());
        assert!(!timer.fire());

        // Same inputs (holding at the end): no new deadline.
        assert!(!timer.reschedule(&inputs(Some(&text), 0)));
        assert_eq!(timer.deadline(), None);
        assert_eq!(timer.fired(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dependency_change_replaces_deadline() {
        let text = PlayableItem::text("t", "hello");
        let mut timer = AdvanceTimer::new();
        timer.reschedule(&inputs(Some(&text), 0));
        let first = timer.deadline().unwrap();

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(timer.reschedule(&inputs(Some(&text), 1)));
        let second = timer.deadline().unwrap();
        assert_eq!(second - first, Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_past_the_clock_holds() {
        let endless = PlayableItem::video("v", "v.mp4").with_duration(1.0e19);
        let mut timer = AdvanceTimer::new();
        assert!(timer.reschedule(&inputs(Some(&endless), 0)));
        assert!(matches!(timer.plan(), Some(SchedulePlan::Arm(_))));
        assert_eq!(timer.deadline(), None);
        assert!(!timer.fire());
    }

    #[tokio::test(start_paused = true)]
    async fn sleep_without_deadline_never_wakes() {
        let mut idle = tokio_test::task::spawn(sleep_until(None));
        tokio_test::assert_pending!(idle.poll());
        tokio::time::advance(Duration::from_secs(3600)).await;
        tokio_test::assert_pending!(idle.poll());

        let at = Instant::now() + Duration::from_secs(1);
        let mut armed = tokio_test::task::spawn(sleep_until(Some(at)));
        tokio_test::assert_pending!(armed.poll());
        tokio::time::advance(Duration::from_secs(1)).await;
        tokio_test::assert_ready!(armed.poll());
    }

    #[test]
    fn duration_required_is_surfaced() {
        let text = PlayableItem::text("t", "hello");
        let mut i = inputs(Some(&text), 0);
        i.slide_duration = None;
        let mut timer = AdvanceTimer::new();
        timer.reschedule(&i);
        assert_eq!(timer.warning(), Some(DisabledReason::DurationRequired));
        assert_eq!(timer.deadline(), None);
    }
}
