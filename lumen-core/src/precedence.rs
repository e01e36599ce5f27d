//! Display precedence: which screen wins for a given set of session flags.
//!
//! Both surfaces run this same function. The control surface uses it to
//! decide what to broadcast, the remote surface to decide what to draw,
//! so the two can never disagree about precedence.
//!
//! ```text
//!  blackScreen ─► Black      (nothing, not even text)
//!  darkScreen  ─► Dark       (waiting message)
//!  !isLive     ─► NotLive    (start-the-presentation prompt)
//!  !authorized ─► Waiting    (hard content gate)
//!  otherwise   ─► Content(item) | Waiting (empty list)
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::item::PlayableItem;
use crate::settings::WaitingMessage;

/// Fixed copy shown while off-air. Distinct from the waiting message.
pub const START_PROMPT_TITLE: &str = "Presentation not started";
pub const START_PROMPT_SUBTITLE: &str = "Start the presentation from the control surface";

// ── Screen ───────────────────────────────────────────────────────

/// What the remote surface is showing, at the coarsest level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Screen {
    Black,
    Dark,
    NotLive,
    Waiting,
    Content,
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl Screen {
    /// Title/subtitle to draw for this screen, if any.
    pub fn caption(&self, waiting: &WaitingMessage) -> Option<(String, String)> {
        match self {
            Screen::Black | Screen::Content => None,
            Screen::Dark | Screen::Waiting => {
                Some((waiting.title.clone(), waiting.subtitle.clone()))
            }
            Screen::NotLive => Some((
                START_PROMPT_TITLE.to_string(),
                START_PROMPT_SUBTITLE.to_string(),
            )),
        }
    }
}

// ── SessionFlags ─────────────────────────────────────────────────

/// The flags precedence is decided from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionFlags {
    pub is_live: bool,
    pub content_authorized: bool,
    pub transmission_paused: bool,
    pub dark_screen: bool,
    pub black_screen: bool,
}

// ── Guards ───────────────────────────────────────────────────────

struct Guard {
    blocks: fn(&SessionFlags) -> bool,
    screen: Screen,
}

fn black(f: &SessionFlags) -> bool {
    f.black_screen
}

fn dark(f: &SessionFlags) -> bool {
    f.dark_screen
}

fn off_air(f: &SessionFlags) -> bool {
    !f.is_live
}

fn unauthorized(f: &SessionFlags) -> bool {
    f.is_live && !f.content_authorized
}

/// Evaluated top to bottom; the first guard that blocks decides.
const GUARDS: [Guard; 4] = [
    Guard {
        blocks: black,
        screen: Screen::Black,
    },
    Guard {
        blocks: dark,
        screen: Screen::Dark,
    },
    Guard {
        blocks: off_air,
        screen: Screen::NotLive,
    },
    Guard {
        blocks: unauthorized,
        screen: Screen::Waiting,
    },
];

/// The screen forced by the first blocking guard.
fn blocking_guard(flags: &SessionFlags) -> Option<Screen> {
    GUARDS.iter().find(|g| (g.blocks)(flags)).map(|g| g.screen)
}

// ── Resolution ───────────────────────────────────────────────────

/// Outcome of precedence resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub screen: Screen,
    pub item: Option<PlayableItem>,
}

/// Resolve what to show. `candidate` is only consulted when no guard
/// blocks, so callers may pass a lazily computed item.
pub fn resolve<F>(flags: &SessionFlags, candidate: F) -> Resolution
where
    F: FnOnce() -> Option<PlayableItem>,
{
    if let Some(screen) = blocking_guard(flags) {
        return Resolution { screen, item: None };
    }
    match candidate() {
        Some(item) => Resolution {
            screen: Screen::Content,
            item: Some(item),
        },
        None => Resolution {
            screen: Screen::Waiting,
            item: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item() -> Option<PlayableItem> {
        Some(PlayableItem::image("a", "a.png"))
    }

    fn flags(black: bool, dark: bool, live: bool, auth: bool) -> SessionFlags {
        SessionFlags {
            is_live: live,
            content_authorized: auth,
            transmission_paused: false,
            dark_screen: dark,
            black_screen: black,
        }
    }

    #[test]
    fn black_beats_dark() {
        let r = resolve(&flags(true, true, true, true), item);
        assert_eq!(r.screen, Screen::Black);
        assert!(r.item.is_none());
        assert!(r.screen.caption(&WaitingMessage::default()).is_none());
    }

    #[test]
    fn every_flag_combination_follows_the_order() {
        for bits in 0u8..16 {
            let (black, dark, live, auth) =
                (bits & 1 != 0, bits & 2 != 0, bits & 4 != 0, bits & 8 != 0);
            let r = resolve(&flags(black, dark, live, auth), item);
            let expected = if black {
                Screen::Black
            } else if dark {
                Screen::Dark
            } else if !live {
                Screen::NotLive
            } else if !auth {
                Screen::Waiting
            } else {
                Screen::Content
            };
            assert_eq!(r.screen, expected, "flags {bits:04b}");
            assert_eq!(r.item.is_some(), expected == Screen::Content);
        }
    }

    #[test]
    fn empty_list_shows_waiting() {
        let r = resolve(&flags(false, false, true, true), || None);
        assert_eq!(r.screen, Screen::Waiting);
    }

    #[test]
    fn candidate_not_evaluated_when_blocked() {
        let r = resolve(&flags(false, true, true, true), || {
            panic!("candidate must not be computed")
        });
        assert_eq!(r.screen, Screen::Dark);
    }

    #[test]
    fn off_air_prompt_differs_from_waiting_message() {
        let waiting = WaitingMessage::default();
        let (prompt, _) = Screen::NotLive.caption(&waiting).unwrap();
        let (title, _) = Screen::Dark.caption(&waiting).unwrap();
        assert_ne!(prompt, title);
        assert_eq!(
            blocking_guard(&flags(false, false, true, false)),
            Some(Screen::Waiting)
        );
    }
}
