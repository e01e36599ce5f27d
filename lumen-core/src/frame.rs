//! The broadcast frame: a complete snapshot of what the remote surface
//! should show.
//!
//! Frames are never diffed or patched. Each one replaces the previous
//! one entirely, so a lost or reordered frame heals on the next push.

use serde::{Deserialize, Serialize};

use crate::error::LumenError;
use crate::item::PlayableItem;
use crate::precedence::{self, Screen, SessionFlags};
use crate::settings::DisplaySettings;

/// Full outgoing state snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastFrame {
    /// Screen chosen by precedence on the control surface.
    pub screen: Screen,

    /// The item to draw; present only when `screen` is `Content`.
    pub item: Option<PlayableItem>,

    #[serde(flatten)]
    pub flags: SessionFlags,

    pub settings: DisplaySettings,

    pub show_projector: bool,
    pub is_playing: bool,

    /// Position of the active item in the active list (0-based).
    pub current_index: usize,
    pub total_items: usize,
}

impl BroadcastFrame {
    /// Check the frame is internally consistent.
    ///
    /// The remote surface re-runs precedence on the frame's flags; a frame
    /// whose `screen` disagrees with that is rejected rather than drawn.
    pub fn validate(&self) -> Result<(), LumenError> {
        let resolved = precedence::resolve(&self.flags, || self.item.clone());
        if resolved.screen != self.screen {
            return Err(LumenError::InvalidFrame(format!(
                "screen {} does not match flags (expected {})",
                self.screen, resolved.screen
            )));
        }
        if let Some(item) = &self.item {
            if let Some(problem) = item.problem() {
                return Err(LumenError::InvalidFrame(format!(
                    "item {}: {problem}",
                    item.id
                )));
            }
        }
        if self.total_items > 0 && self.current_index >= self.total_items {
            return Err(LumenError::InvalidFrame(format!(
                "index {} out of range (len {})",
                self.current_index, self.total_items
            )));
        }
        self.settings.validate().map_err(LumenError::InvalidFrame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn live_frame() -> BroadcastFrame {
        BroadcastFrame {
            screen: Screen::Content,
            item: Some(PlayableItem::image("a", "a.png")),
            flags: SessionFlags {
                is_live: true,
                content_authorized: true,
                ..Default::default()
            },
            settings: DisplaySettings::default(),
            show_projector: true,
            is_playing: false,
            current_index: 0,
            total_items: 3,
        }
    }

    #[test]
    fn wire_shape_is_camel_case_and_flat() {
        let json = serde_json::to_value(live_frame()).unwrap();
        assert_eq!(json["screen"], "content");
        assert_eq!(json["isLive"], true);
        assert_eq!(json["contentAuthorized"], true);
        assert_eq!(json["blackScreen"], false);
        assert_eq!(json["item"]["type"], "image");
        assert_eq!(json["settings"]["fit"], "contain");
        assert_eq!(json["totalItems"], 3);
    }

    #[test]
    fn consistent_frame_validates() {
        assert!(live_frame().validate().is_ok());
    }

    #[test]
    fn item_while_blacked_out_is_rejected() {
        let mut frame = live_frame();
        frame.flags.black_screen = true;
        assert!(matches!(frame.validate(), Err(LumenError::InvalidFrame(_))));

        frame.screen = Screen::Black;
        frame.item = None;
        assert!(frame.validate().is_ok());
    }

    #[test]
    fn bad_settings_are_rejected() {
        let mut frame = live_frame();
        frame.settings.zoom = -1.0;
        assert!(frame.validate().is_err());
    }

    #[test]
    fn index_past_end_is_rejected() {
        let mut frame = live_frame();
        frame.current_index = 3;
        assert!(frame.validate().is_err());
    }
}
