//! Display and playback settings.
//!
//! These are plain values edited by the operator. They travel inside
//! every broadcast frame unchanged and are persisted after each edit.

use serde::{Deserialize, Serialize};

// ── Enums ────────────────────────────────────────────────────────

/// How media is fitted to the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitMode {
    #[default]
    Contain,
    Cover,
    Fill,
    None,
}

impl std::str::FromStr for FitMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "contain" => Ok(FitMode::Contain),
            "cover" => Ok(FitMode::Cover),
            "fill" => Ok(FitMode::Fill),
            "none" => Ok(FitMode::None),
            other => Err(format!("unknown fit mode '{other}'")),
        }
    }
}

/// Horizontal text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    #[default]
    Center,
    Right,
}

impl std::str::FromStr for Alignment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "left" => Ok(Alignment::Left),
            "center" | "centre" => Ok(Alignment::Center),
            "right" => Ok(Alignment::Right),
            other => Err(format!("unknown alignment '{other}'")),
        }
    }
}

// ── Nested settings ──────────────────────────────────────────────

/// A point in normalized surface coordinates (`0.0..=1.0` on both axes).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedPoint {
    pub x: f32,
    pub y: f32,
}

impl Default for NormalizedPoint {
    fn default() -> Self {
        Self { x: 0.5, y: 0.9 }
    }
}

/// Media pan offset, `-1.0..=1.0` on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pan {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LogoSettings {
    pub visible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Text drawn on top of whatever item is displayed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OverlaySettings {
    pub title: String,
    pub subtitle: String,
    pub body: String,
    pub position: NormalizedPoint,
}

impl OverlaySettings {
    /// An overlay with no text is not drawn.
    pub fn is_empty(&self) -> bool {
        self.title.is_empty() && self.subtitle.is_empty() && self.body.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Theme {
    pub font: String,
    pub color: String,
    pub alignment: Alignment,
    pub shadow: bool,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            font: "sans-serif".into(),
            color: "#ffffff".into(),
            alignment: Alignment::Center,
            shadow: true,
        }
    }
}

/// Title/subtitle shown while there is nothing to display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WaitingMessage {
    pub title: String,
    pub subtitle: String,
}

impl Default for WaitingMessage {
    fn default() -> Self {
        Self {
            title: "Please wait".into(),
            subtitle: "The presentation will begin shortly".into(),
        }
    }
}

// ── DisplaySettings ──────────────────────────────────────────────

/// Everything that shapes how an item is drawn on the remote surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DisplaySettings {
    pub fit: FitMode,
    pub zoom: f32,
    pub pan: Pan,
    pub font_size: u16,
    pub auto_fit_text: bool,
    pub logo: LogoSettings,
    pub overlay: OverlaySettings,
    pub theme: Theme,
    pub muted: bool,
    pub volume: f32,
    /// Loop video/audio playback on the surface.
    pub loop_media: bool,
    pub waiting: WaitingMessage,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            fit: FitMode::Contain,
            zoom: 1.0,
            pan: Pan::default(),
            font_size: 48,
            auto_fit_text: false,
            logo: LogoSettings::default(),
            overlay: OverlaySettings::default(),
            theme: Theme::default(),
            muted: false,
            volume: 1.0,
            loop_media: false,
            waiting: WaitingMessage::default(),
        }
    }
}

impl DisplaySettings {
    /// Check value ranges. Returns the first violation found.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.zoom.is_finite() && self.zoom > 0.0) {
            return Err(format!("zoom must be positive, got {}", self.zoom));
        }
        if !in_range(self.pan.x, -1.0, 1.0) || !in_range(self.pan.y, -1.0, 1.0) {
            return Err("pan must be within -1..=1".into());
        }
        let pos = self.overlay.position;
        if !in_range(pos.x, 0.0, 1.0) || !in_range(pos.y, 0.0, 1.0) {
            return Err("overlay position must be normalized".into());
        }
        if !in_range(self.volume, 0.0, 1.0) {
            return Err(format!("volume must be within 0..=1, got {}", self.volume));
        }
        if self.font_size == 0 {
            return Err("font size must be positive".into());
        }
        Ok(())
    }
}

fn in_range(v: f32, lo: f32, hi: f32) -> bool {
    v.is_finite() && v >= lo && v <= hi
}

// ── PlaybackSettings ─────────────────────────────────────────────

/// Persisted auto-advance configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlaybackSettings {
    /// Seconds per slide. `None` or `0` disables auto-advance.
    pub slide_duration: Option<u32>,
    /// Wrap from the last item back to the first.
    pub repeat_all: bool,
}

/// The blob written to the persistence sink.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PersistedSettings {
    pub display: DisplaySettings,
    pub playback: PlaybackSettings,
}
