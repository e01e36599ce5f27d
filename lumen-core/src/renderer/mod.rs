//! The remote surface's view of the broadcast.
//!
//! `RemoteRenderer` is driven purely by the latest [`BroadcastFrame`]:
//! it re-runs precedence on the frame's flags and settles on one
//! [`RenderState`]. Drawing is left to the host; this module only
//! decides *what* to draw.

pub mod fullscreen;
pub mod layout;

use tracing::{debug, warn};

use crate::frame::BroadcastFrame;
use crate::item::{ItemKind, PlayableItem};
use crate::message::Message;
use crate::precedence::{self, Screen};
use crate::settings::{DisplaySettings, FitMode, LogoSettings, OverlaySettings, Pan, Theme};

pub use fullscreen::{FullscreenTarget, RetrySchedule, assert_fullscreen};
pub use layout::auto_fit_font_size;

// ── Scene ────────────────────────────────────────────────────────

/// Title and subtitle drawn over an empty screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caption {
    pub title: String,
    pub subtitle: String,
}

/// How to lay out a text item.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub title: Option<String>,
    pub body: String,
    pub font_size: u16,
}

/// Everything needed to draw one item.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub item: PlayableItem,
    pub fit: FitMode,
    pub zoom: f32,
    pub pan: Pan,
    pub theme: Theme,
    pub overlay: Option<OverlaySettings>,
    pub logo: Option<String>,
    pub muted: bool,
    pub volume: f32,
    pub loop_media: bool,
    /// Present for text items only.
    pub text: Option<TextBlock>,
}

impl Scene {
    fn build(item: PlayableItem, settings: &DisplaySettings, surface: (u32, u32)) -> Self {
        let text = (item.kind == ItemKind::Text).then(|| text_block(&item, settings, surface));
        Self {
            fit: settings.fit,
            zoom: settings.zoom,
            pan: settings.pan,
            theme: settings.theme.clone(),
            overlay: (!settings.overlay.is_empty()).then(|| settings.overlay.clone()),
            logo: logo(&settings.logo),
            muted: settings.muted,
            volume: settings.volume,
            loop_media: settings.loop_media,
            text,
            item,
        }
    }
}

fn logo(logo: &LogoSettings) -> Option<String> {
    logo.visible.then(|| logo.url.clone()).flatten()
}

fn text_block(item: &PlayableItem, settings: &DisplaySettings, surface: (u32, u32)) -> TextBlock {
    let body = item.text.clone().unwrap_or_default();
    let font_size = match item.style.size {
        Some(size) => size,
        None if settings.auto_fit_text => {
            let content = match &item.title {
                Some(title) => format!("{title}\n{body}"),
                None => body.clone(),
            };
            auto_fit_font_size(&content, surface.0, surface.1, settings.font_size)
        }
        None => settings.font_size,
    };
    TextBlock {
        title: item.title.clone(),
        body,
        font_size,
    }
}

// ── RenderState ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Default)]
pub enum RenderState {
    /// No frame received yet.
    #[default]
    Uninitialized,
    BlackScreen,
    DarkScreen(Caption),
    NotLive(Caption),
    Waiting(Caption),
    Displaying(Box<Scene>),
}

impl RenderState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::BlackScreen => "black",
            Self::DarkScreen(_) => "dark",
            Self::NotLive(_) => "not-live",
            Self::Waiting(_) => "waiting",
            Self::Displaying(_) => "displaying",
        }
    }

    pub fn caption(&self) -> Option<&Caption> {
        match self {
            Self::DarkScreen(c) | Self::NotLive(c) | Self::Waiting(c) => Some(c),
            _ => None,
        }
    }

    pub fn scene(&self) -> Option<&Scene> {
        match self {
            Self::Displaying(scene) => Some(scene),
            _ => None,
        }
    }
}

/// What the host should do after a message was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderEvent {
    Redraw,
    VisibilityChanged(bool),
    FullscreenRequested,
    /// Not meant for this side of the link.
    Ignored,
}

// ── RemoteRenderer ───────────────────────────────────────────────

#[derive(Debug)]
pub struct RemoteRenderer {
    state: RenderState,
    visible: bool,
    surface: (u32, u32),
    frame: Option<BroadcastFrame>,
}

impl RemoteRenderer {
    /// `surface` is the drawable size used for text auto-fit.
    pub fn new(surface: (u32, u32)) -> Self {
        Self {
            state: RenderState::Uninitialized,
            visible: true,
            surface,
            frame: None,
        }
    }

    pub fn state(&self) -> &RenderState {
        &self.state
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn frame(&self) -> Option<&BroadcastFrame> {
        self.frame.as_ref()
    }

    /// Replace the current frame and settle on a render state.
    pub fn apply(&mut self, frame: BroadcastFrame) -> &RenderState {
        let resolution = precedence::resolve(&frame.flags, || frame.item.clone());
        if resolution.screen != frame.screen {
            warn!(
                sent = %frame.screen,
                resolved = %resolution.screen,
                "frame screen disagrees with its flags; using flags"
            );
        }
        let caption = |screen: Screen| {
            screen
                .caption(&frame.settings.waiting)
                .map(|(title, subtitle)| Caption { title, subtitle })
                .unwrap_or_else(|| Caption {
                    title: String::new(),
                    subtitle: String::new(),
                })
        };
        self.state = match (resolution.screen, resolution.item) {
            (Screen::Black, _) => RenderState::BlackScreen,
            (Screen::Dark, _) => RenderState::DarkScreen(caption(Screen::Dark)),
            (Screen::NotLive, _) => RenderState::NotLive(caption(Screen::NotLive)),
            (Screen::Content, Some(item)) => RenderState::Displaying(Box::new(Scene::build(
                item,
                &frame.settings,
                self.surface,
            ))),
            (Screen::Waiting | Screen::Content, _) => {
                RenderState::Waiting(caption(Screen::Waiting))
            }
        };
        debug!(state = self.state.name(), index = frame.current_index, "frame applied");
        self.visible = frame.show_projector;
        self.frame = Some(frame);
        &self.state
    }

    /// Recompute layout for a new surface size.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.surface = (width, height);
        if let Some(frame) = self.frame.take() {
            self.apply(frame);
        }
    }

    /// Hide or show without touching the render state.
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Handle one message from the control surface.
    pub fn handle(&mut self, message: Message) -> RenderEvent {
        match message {
            Message::Update(frame) => {
                self.apply(*frame);
                RenderEvent::Redraw
            }
            Message::Visibility(v) => {
                self.set_visible(v.show_projector);
                RenderEvent::VisibilityChanged(v.show_projector)
            }
            Message::RequestFullscreen => RenderEvent::FullscreenRequested,
            other => {
                debug!(kind = %other.kind(), "ignoring back-channel message");
                RenderEvent::Ignored
            }
        }
    }
}
