//! Playable items, as read from the gallery catalog.
//!
//! The engine never creates or edits items on its own; it only reads
//! them by id and caches intrinsic durations once they are known.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A media running time in seconds as a [`Duration`]. `None` for
/// values that are not positive, not finite, or too large to represent.
pub fn media_duration(seconds: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(seconds)
        .ok()
        .filter(|d| !d.is_zero())
}

// ── ItemKind ─────────────────────────────────────────────────────

/// The media type of a [`PlayableItem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Image,
    Video,
    Audio,
    Text,
}

impl ItemKind {
    /// Video and audio carry their own running time.
    pub fn is_timed(&self) -> bool {
        matches!(self, ItemKind::Video | ItemKind::Audio)
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKind::Image => write!(f, "image"),
            ItemKind::Video => write!(f, "video"),
            ItemKind::Audio => write!(f, "audio"),
            ItemKind::Text => write!(f, "text"),
        }
    }
}

// ── ItemStyle ────────────────────────────────────────────────────

/// Per-item visual attributes, mostly meaningful for text items.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ItemStyle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    /// Explicit font size; overrides the frame's font size and auto-fit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u16>,
}

// ── PlayableItem ─────────────────────────────────────────────────

/// One entry of the gallery: an image, a video, an audio clip, or a
/// block of inline text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayableItem {
    /// Stable gallery id.
    pub id: String,

    #[serde(rename = "type")]
    pub kind: ItemKind,

    /// Display name shown in operator listings.
    #[serde(default)]
    pub name: String,

    /// Resolvable media reference (image/video/audio).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Inline title for text items.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Inline body for text items.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Intrinsic running time in seconds, once known (video/audio).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,

    #[serde(default)]
    pub style: ItemStyle,
}

impl PlayableItem {
    fn bare(id: impl Into<String>, kind: ItemKind) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            kind,
            url: None,
            title: None,
            text: None,
            duration: None,
            style: ItemStyle::default(),
        }
    }

    pub fn image(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::bare(id, ItemKind::Image)
        }
    }

    pub fn video(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::bare(id, ItemKind::Video)
        }
    }

    pub fn audio(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::bare(id, ItemKind::Audio)
        }
    }

    pub fn text(id: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            text: Some(body.into()),
            ..Self::bare(id, ItemKind::Text)
        }
    }

    /// Set the intrinsic duration in seconds.
    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration = Some(seconds);
        self
    }

    /// Intrinsic running time, if this is timed media and it is known.
    pub fn intrinsic_duration(&self) -> Option<Duration> {
        if !self.kind.is_timed() {
            return None;
        }
        self.duration.and_then(media_duration)
    }

    /// Returns a reason string when the item cannot be rendered.
    pub fn problem(&self) -> Option<&'static str> {
        match self.kind {
            ItemKind::Text => {
                if self.text.is_none() && self.title.is_none() {
                    return Some("text item without content");
                }
            }
            _ => {
                if self.url.as_deref().is_none_or(str::is_empty) {
                    return Some("media item without source");
                }
            }
        }
        None
    }

    /// Short label for logs and listings.
    pub fn label(&self) -> &str {
        if self.name.is_empty() { &self.id } else { &self.name }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_type_tag() {
        let item = PlayableItem::image("a", "https://cdn/a.png");
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["type"], "image");
        assert_eq!(json["url"], "https://cdn/a.png");
        assert!(json.get("duration").is_none());
    }

    #[test]
    fn deserializes_gallery_entry() {
        let json = r#"{"id":"t1","type":"text","text":"Hello","style":{"bold":true,"size":64}}"#;
        let item: PlayableItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.kind, ItemKind::Text);
        assert!(item.style.bold);
        assert_eq!(item.style.size, Some(64));
        assert!(item.problem().is_none());
    }

    #[test]
    fn intrinsic_duration_only_for_timed_media() {
        let video = PlayableItem::video("v", "v.mp4").with_duration(12.5);
        assert_eq!(video.intrinsic_duration(), Some(Duration::from_millis(12_500)));

        let image = PlayableItem::image("i", "i.png").with_duration(3.0);
        assert_eq!(image.intrinsic_duration(), None);

        let unknown = PlayableItem::audio("a", "a.mp3");
        assert_eq!(unknown.intrinsic_duration(), None);
    }

    #[test]
    fn unrepresentable_durations_are_unknown() {
        for seconds in [1e300, f64::INFINITY, f64::NAN, -1.0, 0.0] {
            let video = PlayableItem::video("v", "v.mp4").with_duration(seconds);
            assert_eq!(video.intrinsic_duration(), None, "{seconds}");
        }
        assert_eq!(media_duration(90.0), Some(Duration::from_secs(90)));
    }

    #[test]
    fn media_without_source_is_a_problem() {
        let mut item = PlayableItem::image("i", "");
        assert!(item.problem().is_some());
        item.url = Some("x.png".into());
        assert!(item.problem().is_none());
    }
}
