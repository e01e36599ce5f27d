//! The broadcast engine: canonical presentation state on the control
//! surface.
//!
//! `Engine` owns the session and staging pair together with settings,
//! the auto-advance timer and the link to the remote surface. Every
//! operator command and every back-channel message goes through it, and
//! after each one it recomputes the [`BroadcastFrame`], pushes it whole,
//! and re-evaluates the schedule.
//!
//! The engine never spawns anything. Its owner drives it from a single
//! `select!` loop:
//!
//! ```ignore
//! loop {
//!     let deadline = engine.advance_deadline();
//!     tokio::select! {
//!         Some(cmd) = commands.recv() => { engine.apply(cmd).await?; }
//!         Some(msg) = engine.next_remote_message() => engine.handle_remote(msg),
//!         _ = scheduler::sleep_until(deadline) => engine.on_deadline(),
//!     }
//! }
//! ```

use std::future::Future;
use std::pin::Pin;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::command::{OperatorCommand, SettingEdit};
use crate::error::{EngineError, LumenError};
use crate::frame::BroadcastFrame;
use crate::item::{self, PlayableItem};
use crate::message::{FullscreenAck, MediaDuration, Message};
use crate::precedence::{Resolution, Screen};
use crate::scheduler::{AdvanceTimer, DisabledReason, ScheduleInputs};
use crate::settings::{DisplaySettings, PersistedSettings, PlaybackSettings};
use crate::state::{LinkPhase, PlaylistStaging, PresentationSession};
use crate::storage::{PersistedPlaylist, SettingsStore};
use crate::transport::{SurfaceLink, SurfaceOpener, Transport};

// ── EngineStatus ─────────────────────────────────────────────────

/// A read-only summary for operator displays.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineStatus {
    pub screen: Screen,
    pub item: Option<String>,
    pub is_live: bool,
    pub authorized: bool,
    pub paused: bool,
    pub dark_screen: bool,
    pub black_screen: bool,
    pub presented: bool,
    pub staleness: u64,
    pub is_playing: bool,
    pub repeat_all: bool,
    pub slide_duration: Option<u32>,
    pub warning: Option<DisabledReason>,
    pub link: LinkPhase,
    pub show_projector: bool,
    pub fullscreen_granted: Option<bool>,
    pub active_index: usize,
    pub working: Vec<String>,
    pub working_index: usize,
    pub published_len: Option<usize>,
}

// ── Opening the surface ──────────────────────────────────────────

/// Result of an open started by [`Engine::begin_open_surface`]. Carries
/// the opener back to the engine.
pub struct OpenOutcome {
    opener: Box<dyn SurfaceOpener>,
    result: Result<Box<dyn Transport>, LumenError>,
}

impl std::fmt::Debug for OpenOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenOutcome")
            .field("ok", &self.result.is_ok())
            .finish_non_exhaustive()
    }
}

/// An open in flight. Await it anywhere, then hand the outcome to
/// [`Engine::finish_open_surface`].
pub type PendingOpen = Pin<Box<dyn Future<Output = OpenOutcome> + Send>>;

// ── Engine ───────────────────────────────────────────────────────

pub struct Engine {
    staging: PlaylistStaging,
    session: PresentationSession,
    display: DisplaySettings,
    playback: PlaybackSettings,
    is_playing: bool,
    show_projector: bool,
    fullscreen_granted: Option<bool>,

    timer: AdvanceTimer,
    link: SurfaceLink,
    /// `None` while an open is in flight.
    opener: Option<Box<dyn SurfaceOpener>>,

    catalog: Catalog,
    store: Box<dyn SettingsStore>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("staging", &self.staging)
            .field("session", &self.session)
            .field("is_playing", &self.is_playing)
            .field("timer", &self.timer)
            .field("link", &self.link)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Build the engine, restoring settings and the working list from
    /// `store`. Load failures fall back to defaults.
    pub fn new(
        catalog: Catalog,
        store: Box<dyn SettingsStore>,
        opener: Box<dyn SurfaceOpener>,
    ) -> Self {
        let settings = store.load_settings().unwrap_or_else(|e| {
            warn!("cannot load settings ({e}); using defaults");
            None
        });
        let playlist = store.load_playlist().unwrap_or_else(|e| {
            warn!("cannot load playlist ({e}); starting empty");
            None
        });

        let PersistedSettings { display, playback } = settings.unwrap_or_default();
        let display = match display.validate() {
            Ok(()) => display,
            Err(e) => {
                warn!("stored display settings invalid ({e}); using defaults");
                DisplaySettings::default()
            }
        };

        let mut staging = PlaylistStaging::new();
        if let Some(playlist) = playlist {
            let (items, missing) = catalog.resolve(playlist.item_ids.iter().map(String::as_str));
            if !missing.is_empty() {
                warn!(?missing, "stored playlist references unknown items");
            }
            staging.stage(items);
            staging.set_interval(playlist.interval);
            staging.set_loop(playlist.loop_playlist);
        }

        let mut engine = Self {
            staging,
            session: PresentationSession::new(),
            display,
            playback,
            is_playing: false,
            show_projector: true,
            fullscreen_granted: None,
            timer: AdvanceTimer::new(),
            link: SurfaceLink::new(),
            opener: Some(opener),
            catalog,
            store,
        };
        engine.reschedule();
        info!(
            working = engine.staging.working().len(),
            catalog = engine.catalog.len(),
            "engine ready"
        );
        engine
    }

    /// Use `seconds` as the slide duration unless one was restored.
    pub fn with_default_duration(mut self, seconds: Option<u32>) -> Self {
        if self.playback.slide_duration.is_none() {
            self.playback.slide_duration = seconds;
            self.reschedule();
        }
        self
    }

    // ── Accessors ────────────────────────────────────────────────

    pub fn staging(&self) -> &PlaylistStaging {
        &self.staging
    }

    pub fn session(&self) -> &PresentationSession {
        &self.session
    }

    pub fn display(&self) -> &DisplaySettings {
        &self.display
    }

    pub fn playback(&self) -> &PlaybackSettings {
        &self.playback
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn link(&self) -> &SurfaceLink {
        &self.link
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn show_projector(&self) -> bool {
        self.show_projector
    }

    /// When the next auto-advance is due, if one is armed.
    pub fn advance_deadline(&self) -> Option<Instant> {
        self.timer.deadline()
    }

    /// The auto-advance warning to show, if any.
    pub fn schedule_warning(&self) -> Option<DisabledReason> {
        self.timer.warning()
    }

    // ── Derived state ────────────────────────────────────────────

    pub fn resolve(&self) -> Resolution {
        self.session.resolve(self.staging.active_item())
    }

    /// The full snapshot the remote surface should show right now.
    pub fn frame(&self) -> BroadcastFrame {
        let Resolution { screen, item } = self.resolve();
        let total_items = self.staging.active_items().len();
        BroadcastFrame {
            screen,
            item,
            flags: self.session.flags(),
            settings: self.display.clone(),
            show_projector: self.show_projector,
            is_playing: self.is_playing,
            current_index: self.staging.active_index().min(total_items.saturating_sub(1)),
            total_items,
        }
    }

    pub fn status(&self) -> EngineStatus {
        let Resolution { screen, item } = self.resolve();
        let flags = self.session.flags();
        EngineStatus {
            screen,
            item: item.map(|i| i.label().to_string()),
            is_live: flags.is_live,
            authorized: flags.content_authorized,
            paused: flags.transmission_paused,
            dark_screen: flags.dark_screen,
            black_screen: flags.black_screen,
            presented: self.staging.is_presented(),
            staleness: self.staging.staleness(),
            is_playing: self.is_playing,
            repeat_all: self.playback.repeat_all,
            slide_duration: self.playback.slide_duration,
            warning: self.timer.warning(),
            link: self.link.phase().clone(),
            show_projector: self.show_projector,
            fullscreen_granted: self.fullscreen_granted,
            active_index: self.staging.active_index(),
            working: self
                .staging
                .working()
                .iter()
                .map(|i| format!("{} [{}]", i.label(), i.kind))
                .collect(),
            working_index: self.staging.working_index(),
            published_len: self.staging.published().map(|p| p.items().len()),
        }
    }

    fn reschedule(&mut self) {
        let inputs = ScheduleInputs {
            is_playing: self.is_playing,
            transmission_paused: self.session.is_paused(),
            item: self.staging.active_item(),
            index: self.staging.active_index(),
            list: self.staging.list_identity(),
            slide_duration: self.playback.slide_duration,
            legacy_interval: self.staging.interval(),
        };
        if self.timer.reschedule(&inputs) {
            if let Some(reason) = self.timer.warning() {
                warn!("auto-advance paused: {reason}");
            }
        }
    }

    /// Re-evaluate the schedule and push a fresh frame.
    fn refresh(&mut self) {
        self.reschedule();
        self.push_frame();
    }

    fn push_frame(&mut self) {
        let frame = self.frame();
        debug!(screen = %frame.screen, index = frame.current_index, "pushing frame");
        self.link.push(Message::update(frame));
    }

    // ── Persistence ──────────────────────────────────────────────

    fn persist_settings(&mut self) {
        self.store.save_settings(&PersistedSettings {
            display: self.display.clone(),
            playback: self.playback.clone(),
        });
    }

    fn persist_playlist(&mut self) {
        self.store.save_playlist(&PersistedPlaylist {
            item_ids: self.staging.working().iter().map(|i| i.id.clone()).collect(),
            interval: self.staging.interval(),
            loop_playlist: self.staging.loops(),
        });
    }

    // ── Operator commands ────────────────────────────────────────

    /// Apply one operator command. Rejected commands leave no partial
    /// changes behind.
    pub async fn apply(&mut self, cmd: OperatorCommand) -> Result<(), EngineError> {
        match cmd {
            OperatorCommand::OpenSurface => self.open_surface().await,
            other => self.execute(other),
        }
    }

    /// Apply a command that needs no I/O. Opening the surface is only
    /// possible through [`Engine::apply`].
    pub fn execute(&mut self, cmd: OperatorCommand) -> Result<(), EngineError> {
        debug!(?cmd, "operator command");
        let result = self.mutate(cmd);
        if let Err(e) = &result {
            warn!("command rejected: {e}");
        }
        self.refresh();
        result
    }

    fn mutate(&mut self, cmd: OperatorCommand) -> Result<(), EngineError> {
        use OperatorCommand as C;

        match cmd {
            // Session
            C::GoLive => {
                self.session.go_live();
            }
            C::EndLive => {
                self.session.end_live();
                self.staging.unpublish();
            }
            C::Authorize => self.session.authorize()?,
            C::TogglePause => {
                let current = self.resolve().item;
                self.session.toggle_pause(current);
            }
            C::SetDarkScreen(on) => self.session.set_dark_screen(on),
            C::SetBlackScreen(on) => self.session.set_black_screen(on),

            // Playlist
            C::Stage(ids) => {
                let (items, missing) = self.catalog.resolve(ids.iter().map(String::as_str));
                if !missing.is_empty() {
                    return Err(EngineError::UnknownItem(missing.join(", ")));
                }
                self.stage_items(items);
            }
            C::Add(id) => {
                let item = self.catalog.lookup(&id)?;
                self.staging.add(item);
                self.persist_playlist();
            }
            C::Remove(index) => {
                let removed = self.staging.remove(index)?;
                debug!(id = %removed.id, "removed from working list");
                self.persist_playlist();
            }
            C::Move { from, to } => {
                self.staging.reorder(from, to)?;
                self.persist_playlist();
            }
            C::Present => {
                self.staging.present()?;
                info!(items = self.staging.active_items().len(), "playlist presented");
            }
            C::Update => {
                self.staging.update()?;
                info!(items = self.staging.active_items().len(), "presentation updated");
            }
            C::Clear => {
                self.staging.clear();
                self.persist_playlist();
            }
            C::SetInterval(seconds) => {
                self.staging.set_interval(seconds);
                self.persist_playlist();
            }
            C::SetLoop(on) => {
                self.staging.set_loop(on);
                self.persist_playlist();
            }

            // Playback
            C::SetPlay(on) => self.is_playing = on,
            C::TogglePlay => self.is_playing = !self.is_playing,
            C::SetDuration(seconds) => {
                self.playback.slide_duration = seconds;
                self.persist_settings();
            }
            C::SetRepeat(on) => {
                self.playback.repeat_all = on;
                self.persist_settings();
            }
            C::Next => {
                self.staging.next();
            }
            C::Previous => {
                self.staging.previous();
            }
            C::Select(index) => self.staging.select(index)?,
            C::RecordDuration { id, seconds } => self.record_duration(&id, seconds),

            // Remote surface
            C::OpenSurface => warn!("opening the remote surface requires async apply"),
            C::ToggleVisibility => self.set_visibility(!self.show_projector),
            C::Fullscreen => {
                if !self.link.push(Message::RequestFullscreen) {
                    warn!(phase = %self.link.phase(), "fullscreen request not sent");
                }
            }

            C::Setting(edit) => self.edit_setting(edit)?,
        }
        Ok(())
    }

    /// Replace the working list with already-resolved items.
    pub fn stage_items(&mut self, items: Vec<PlayableItem>) {
        self.staging.stage(items);
        self.persist_playlist();
    }

    fn record_duration(&mut self, id: &str, seconds: f64) {
        if item::media_duration(seconds).is_none() {
            warn!(id, seconds, "ignoring unusable media duration");
            return;
        }
        self.catalog.record_duration(id, seconds);
        if self.staging.record_duration(id, seconds) {
            debug!(id, seconds, "media duration recorded");
        }
    }

    fn set_visibility(&mut self, show: bool) {
        self.show_projector = show;
        self.link.push(Message::visibility(show));
    }

    fn edit_setting(&mut self, edit: SettingEdit) -> Result<(), EngineError> {
        let mut next = self.display.clone();
        match edit {
            SettingEdit::Fit(fit) => next.fit = fit,
            SettingEdit::Zoom(zoom) => next.zoom = zoom,
            SettingEdit::Pan { x, y } => {
                next.pan.x = x;
                next.pan.y = y;
            }
            SettingEdit::FontSize(size) => next.font_size = size,
            SettingEdit::AutoFit(on) => next.auto_fit_text = on,
            SettingEdit::Logo { visible, url } => {
                next.logo.visible = visible;
                if url.is_some() {
                    next.logo.url = url;
                }
            }
            SettingEdit::Overlay { title, subtitle, body } => {
                next.overlay.title = title;
                next.overlay.subtitle = subtitle;
                next.overlay.body = body;
            }
            SettingEdit::OverlayPosition { x, y } => {
                next.overlay.position.x = x;
                next.overlay.position.y = y;
            }
            SettingEdit::ThemeFont(font) => next.theme.font = font,
            SettingEdit::ThemeColor(color) => next.theme.color = color,
            SettingEdit::ThemeAlignment(alignment) => next.theme.alignment = alignment,
            SettingEdit::ThemeShadow(on) => next.theme.shadow = on,
            SettingEdit::Mute(on) => next.muted = on,
            SettingEdit::Volume(volume) => next.volume = volume,
            SettingEdit::LoopMedia(on) => next.loop_media = on,
            SettingEdit::Waiting { title, subtitle } => {
                next.waiting.title = title;
                next.waiting.subtitle = subtitle;
            }
        }
        next.validate().map_err(EngineError::InvalidSetting)?;
        self.display = next;
        self.persist_settings();
        Ok(())
    }

    // ── Remote surface ───────────────────────────────────────────

    /// Create the remote surface. Already open is not an error.
    pub async fn open_surface(&mut self) -> Result<(), EngineError> {
        match self.begin_open_surface() {
            Some(pending) => {
                let outcome = pending.await;
                self.finish_open_surface(outcome)
            }
            None => Ok(()),
        }
    }

    /// Start creating the remote surface without holding the engine
    /// while the opener works. `None` when already open or opening.
    pub fn begin_open_surface(&mut self) -> Option<PendingOpen> {
        let Some(mut opener) = self.opener.take() else {
            info!("remote surface already opening");
            return None;
        };
        if !self.link.begin_open() {
            self.opener = Some(opener);
            return None;
        }
        Some(Box::pin(async move {
            let result = opener.open().await;
            OpenOutcome { opener, result }
        }))
    }

    pub fn finish_open_surface(&mut self, outcome: OpenOutcome) -> Result<(), EngineError> {
        let OpenOutcome { opener, result } = outcome;
        self.opener = Some(opener);
        self.link.finish_open(result)?;
        self.refresh();
        Ok(())
    }

    /// Next message from the remote surface. Pending while none is open.
    pub async fn next_remote_message(&mut self) -> Option<Message> {
        self.link.recv().await
    }

    /// Handle one back-channel message.
    pub fn handle_remote(&mut self, message: Message) {
        debug!(kind = %message.kind(), "remote message");
        match message {
            Message::ProjectorReady => {
                if self.link.mark_ready() {
                    info!("remote surface ready");
                    self.push_frame();
                    self.link.push(Message::visibility(self.show_projector));
                }
            }
            Message::ToggleProjector => self.back_channel(OperatorCommand::ToggleVisibility),
            Message::TogglePlay => self.back_channel(OperatorCommand::TogglePlay),
            Message::Next => self.back_channel(OperatorCommand::Next),
            Message::Previous => self.back_channel(OperatorCommand::Previous),
            Message::FullscreenAck(FullscreenAck { granted }) => {
                if !granted {
                    warn!("remote surface could not enter fullscreen");
                }
                self.fullscreen_granted = Some(granted);
            }
            Message::MediaDuration(MediaDuration { id, seconds }) => {
                self.back_channel(OperatorCommand::RecordDuration { id, seconds });
            }
            other => warn!(kind = %other.kind(), "unexpected message from remote surface"),
        }
    }

    /// Remote keys have no one to report a rejection to.
    fn back_channel(&mut self, cmd: OperatorCommand) {
        if let Err(e) = self.execute(cmd) {
            debug!("back-channel command ignored: {e}");
        }
    }

    /// Call when [`Engine::advance_deadline`] has passed.
    pub fn on_deadline(&mut self) {
        if !self.timer.fire() {
            return;
        }
        let moved = self.staging.advance(self.playback.repeat_all);
        info!(index = self.staging.active_index(), moved, "auto-advance");
        self.refresh();
    }

    /// Drop the remote surface, if any.
    pub fn close_surface(&mut self) {
        self.link.close();
    }

    /// Close the surface and wait for pending saves to land.
    pub async fn shutdown(&mut self) {
        self.close_surface();
        self.store.flush().await;
        info!("engine stopped");
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::error::LumenError;
    use crate::scheduler;
    use crate::storage::MemoryStore;
    use crate::transport::{ChannelTransport, Transport};

    /// Hands out one end of a channel pair per open.
    struct PairOpener {
        remote: std::sync::Arc<std::sync::Mutex<Option<ChannelTransport>>>,
    }

    #[async_trait]
    impl SurfaceOpener for PairOpener {
        async fn open(&mut self) -> Result<Box<dyn Transport>, LumenError> {
            let (ours, theirs) = ChannelTransport::pair();
            *self.remote.lock().unwrap() = Some(theirs);
            Ok(Box::new(ours))
        }
    }

    struct NoSurface;

    #[async_trait]
    impl SurfaceOpener for NoSurface {
        async fn open(&mut self) -> Result<Box<dyn Transport>, LumenError> {
            Err(LumenError::Other("blocked".into()))
        }
    }

    fn catalog() -> Catalog {
        Catalog::new(vec![
            PlayableItem::image("img0", "0.png"),
            PlayableItem::image("img1", "1.png"),
            PlayableItem::image("img2", "2.png"),
            PlayableItem::text("txt", "Welcome"),
            PlayableItem::video("vid", "v.mp4"),
        ])
    }

    fn engine() -> Engine {
        Engine::new(catalog(), Box::new(MemoryStore::new()), Box::new(NoSurface))
    }

    fn stage(engine: &mut Engine, ids: &[&str]) {
        engine
            .execute(OperatorCommand::Stage(ids.iter().map(|s| s.to_string()).collect()))
            .unwrap();
    }

    fn live_authorized(engine: &mut Engine) {
        engine.execute(OperatorCommand::GoLive).unwrap();
        engine.execute(OperatorCommand::Authorize).unwrap();
    }

    fn shown(engine: &Engine) -> Option<String> {
        engine.frame().item.map(|i| i.id)
    }

    /// Engine wired to a channel pair, already past the ready handshake.
    async fn connected() -> (Engine, ChannelTransport) {
        let slot = std::sync::Arc::new(std::sync::Mutex::new(None));
        let opener = PairOpener { remote: slot.clone() };
        let mut engine = Engine::new(catalog(), Box::new(MemoryStore::new()), Box::new(opener));
        engine.apply(OperatorCommand::OpenSurface).await.unwrap();
        let remote = slot.lock().unwrap().take().unwrap();
        (engine, remote)
    }

    fn drain(remote: &mut ChannelTransport) -> Vec<Message> {
        std::iter::from_fn(|| remote.try_recv()).collect()
    }

    // ── Staging through the engine ───────────────────────────────

    #[test]
    fn pass_through_while_not_presented() {
        let mut e = engine();
        live_authorized(&mut e);
        stage(&mut e, &["img0", "img1"]);
        assert_eq!(shown(&e).as_deref(), Some("img0"));

        e.execute(OperatorCommand::Select(1)).unwrap();
        stage(&mut e, &["txt", "img2", "vid"]);
        assert_eq!(shown(&e).as_deref(), Some("img2"));
    }

    #[test]
    fn stage_after_present_waits_for_update() {
        let mut e = engine();
        live_authorized(&mut e);
        stage(&mut e, &["img0", "img1"]);
        e.execute(OperatorCommand::Present).unwrap();

        stage(&mut e, &["txt"]);
        assert!(e.staging().is_stale());
        assert_eq!(shown(&e).as_deref(), Some("img0"));

        e.execute(OperatorCommand::Update).unwrap();
        assert!(!e.staging().is_stale());
        assert_eq!(shown(&e).as_deref(), Some("txt"));
    }

    #[test]
    fn present_empty_is_rejected_without_changes() {
        let mut e = engine();
        assert_eq!(e.execute(OperatorCommand::Present), Err(EngineError::EmptyPlaylist));
        assert!(!e.staging().is_presented());
        assert_eq!(e.execute(OperatorCommand::Update), Err(EngineError::NotPresented));
    }

    #[test]
    fn unknown_ids_stage_nothing() {
        let mut e = engine();
        stage(&mut e, &["img0"]);
        let err = e
            .execute(OperatorCommand::Stage(vec!["img1".into(), "ghost".into()]))
            .unwrap_err();
        assert_eq!(err, EngineError::UnknownItem("ghost".into()));
        assert_eq!(e.staging().working().len(), 1);
    }

    #[test]
    fn end_live_tears_down_presentation() {
        let mut e = engine();
        stage(&mut e, &["img0", "img1"]);
        e.execute(OperatorCommand::Present).unwrap();
        live_authorized(&mut e);
        e.execute(OperatorCommand::TogglePause).unwrap();

        e.execute(OperatorCommand::EndLive).unwrap();
        assert!(!e.staging().is_presented());
        assert!(!e.session().is_paused());
        assert_eq!(e.frame().screen, Screen::NotLive);
    }

    // ── Session ──────────────────────────────────────────────────

    #[test]
    fn authorize_off_air_is_not_live() {
        let mut e = engine();
        assert_eq!(e.execute(OperatorCommand::Authorize), Err(EngineError::NotLive));
    }

    #[test]
    fn go_live_always_requires_fresh_authorization() {
        let mut e = engine();
        stage(&mut e, &["img0"]);
        live_authorized(&mut e);
        assert!(e.session().is_authorized());

        e.execute(OperatorCommand::EndLive).unwrap();
        e.execute(OperatorCommand::GoLive).unwrap();
        assert!(!e.session().is_authorized());
        assert_eq!(shown(&e), None);
    }

    #[test]
    fn black_beats_dark() {
        let mut e = engine();
        stage(&mut e, &["img0"]);
        live_authorized(&mut e);
        e.execute(OperatorCommand::SetDarkScreen(true)).unwrap();
        e.execute(OperatorCommand::SetBlackScreen(true)).unwrap();

        let frame = e.frame();
        assert_eq!(frame.screen, Screen::Black);
        assert!(frame.item.is_none());
        assert!(frame.screen.caption(&frame.settings.waiting).is_none());
    }

    #[test]
    fn pause_freezes_across_index_changes() {
        let mut e = engine();
        stage(&mut e, &["img0", "img1", "img2"]);
        live_authorized(&mut e);

        e.execute(OperatorCommand::TogglePause).unwrap();
        e.execute(OperatorCommand::Next).unwrap();
        e.execute(OperatorCommand::Next).unwrap();
        assert_eq!(e.staging().active_index(), 2);
        assert_eq!(shown(&e).as_deref(), Some("img0"));

        e.execute(OperatorCommand::TogglePause).unwrap();
        assert_eq!(shown(&e).as_deref(), Some("img2"));
    }

    // ── Scenarios ────────────────────────────────────────────────

    #[test]
    fn scenario_present_and_hold_at_end() {
        let mut e = engine();
        live_authorized(&mut e);
        stage(&mut e, &["img0", "img1", "img2"]);
        e.execute(OperatorCommand::Present).unwrap();
        assert_eq!(shown(&e).as_deref(), Some("img0"));

        for _ in 0..3 {
            e.execute(OperatorCommand::Next).unwrap();
        }
        assert_eq!(e.staging().active_index(), 2);
        assert_eq!(shown(&e).as_deref(), Some("img2"));
    }

    #[test]
    fn scenario_go_live_then_authorize() {
        let mut e = engine();
        stage(&mut e, &["img0", "img1", "img2"]);
        e.execute(OperatorCommand::Present).unwrap();

        e.execute(OperatorCommand::GoLive).unwrap();
        assert_eq!(shown(&e), None);
        assert_eq!(e.frame().screen, Screen::Waiting);

        e.execute(OperatorCommand::Authorize).unwrap();
        assert_eq!(shown(&e).as_deref(), Some("img0"));
    }

    #[test]
    fn scenario_dark_and_back_without_reauthorizing() {
        let mut e = engine();
        stage(&mut e, &["img0", "img1"]);
        e.execute(OperatorCommand::Present).unwrap();
        live_authorized(&mut e);

        e.execute(OperatorCommand::SetDarkScreen(true)).unwrap();
        let frame = e.frame();
        assert_eq!(frame.item, None);
        let (title, _) = frame.screen.caption(&frame.settings.waiting).unwrap();
        assert_eq!(title, e.display().waiting.title);

        e.execute(OperatorCommand::SetDarkScreen(false)).unwrap();
        assert_eq!(shown(&e).as_deref(), Some("img0"));
    }

    // ── Auto-advance ─────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn auto_advance_fires_once_per_schedule() {
        let mut e = engine();
        stage(&mut e, &["txt", "img0"]);
        live_authorized(&mut e);
        e.execute(OperatorCommand::SetDuration(Some(5))).unwrap();
        e.execute(OperatorCommand::SetPlay(true)).unwrap();

        let armed = e.advance_deadline().unwrap();
        tokio::time::advance(Duration::from_millis(4_900)).await;
        e.on_deadline();
        assert_eq!(e.staging().active_index(), 0);

        scheduler::sleep_until(Some(armed)).await;
        e.on_deadline();
        assert_eq!(e.staging().active_index(), 1);

        // Re-armed by the index change; at the end it holds and stays disarmed.
        scheduler::sleep_until(e.advance_deadline()).await;
        e.on_deadline();
        assert_eq!(e.staging().active_index(), 1);
        assert_eq!(e.advance_deadline(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn repeat_all_wraps() {
        let mut e = engine();
        stage(&mut e, &["img0", "img1"]);
        e.execute(OperatorCommand::SetDuration(Some(2))).unwrap();
        e.execute(OperatorCommand::SetRepeat(true)).unwrap();
        e.execute(OperatorCommand::Select(1)).unwrap();
        e.execute(OperatorCommand::SetPlay(true)).unwrap();

        scheduler::sleep_until(e.advance_deadline()).await;
        e.on_deadline();
        assert_eq!(e.staging().active_index(), 0);
        assert!(e.advance_deadline().is_some());
    }

    #[test]
    fn missing_duration_is_a_warning_not_an_error() {
        let mut e = engine();
        stage(&mut e, &["img0", "img1"]);
        e.execute(OperatorCommand::SetPlay(true)).unwrap();
        assert_eq!(e.schedule_warning(), Some(DisabledReason::DurationRequired));
        assert_eq!(e.advance_deadline(), None);

        e.execute(OperatorCommand::SetInterval(Some(3))).unwrap();
        assert_eq!(e.schedule_warning(), None);
        assert!(e.advance_deadline().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn discovered_media_duration_reschedules() {
        let mut e = engine();
        stage(&mut e, &["vid", "img0"]);
        e.execute(OperatorCommand::SetDuration(Some(5))).unwrap();
        e.execute(OperatorCommand::SetPlay(true)).unwrap();
        let first = e.advance_deadline().unwrap();

        e.execute(OperatorCommand::RecordDuration { id: "vid".into(), seconds: 30.0 })
            .unwrap();
        let second = e.advance_deadline().unwrap();
        assert_eq!(second - first, Duration::from_secs(25));
        assert_eq!(e.catalog().get("vid").unwrap().duration, Some(30.0));
    }

    #[tokio::test(start_paused = true)]
    async fn oversized_media_duration_is_ignored() {
        let mut e = engine();
        stage(&mut e, &["vid"]);
        e.execute(OperatorCommand::SetDuration(Some(5))).unwrap();
        e.execute(OperatorCommand::SetPlay(true)).unwrap();
        let armed = e.advance_deadline().unwrap();

        let cmd: OperatorCommand = "media-duration vid 1e30".parse().unwrap();
        e.execute(cmd).unwrap();
        assert_eq!(e.staging().working()[0].duration, None);
        assert_eq!(e.advance_deadline(), Some(armed));
    }

    #[tokio::test(start_paused = true)]
    async fn oversized_catalog_duration_falls_back_to_slide_duration() {
        let items: Vec<PlayableItem> = serde_json::from_str(
            r#"[{"id":"vid","type":"video","url":"v.mp4","duration":1e300}]"#,
        )
        .unwrap();
        let mut e = Engine::new(Catalog::new(items), Box::new(MemoryStore::new()), Box::new(NoSurface));
        stage(&mut e, &["vid"]);
        e.execute(OperatorCommand::SetDuration(Some(5))).unwrap();
        e.execute(OperatorCommand::SetPlay(true)).unwrap();
        let deadline = e.advance_deadline().unwrap();
        assert_eq!(deadline - Instant::now(), Duration::from_secs(5));
    }

    #[test]
    fn pausing_transmission_disarms_the_timer() {
        let mut e = engine();
        stage(&mut e, &["img0", "img1"]);
        live_authorized(&mut e);
        e.execute(OperatorCommand::SetDuration(Some(5))).unwrap();
        e.execute(OperatorCommand::SetPlay(true)).unwrap();
        assert!(e.advance_deadline().is_some());

        e.execute(OperatorCommand::TogglePause).unwrap();
        assert_eq!(e.advance_deadline(), None);
    }

    // ── Settings and persistence ─────────────────────────────────

    #[test]
    fn invalid_setting_is_rejected_and_not_persisted() {
        let store = MemoryStore::new();
        let mut e = Engine::new(catalog(), Box::new(store.clone()), Box::new(NoSurface));
        let err = e
            .execute(OperatorCommand::Setting(SettingEdit::Volume(3.0)))
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidSetting(_)));
        assert_eq!(store.writes(), 0);

        e.execute(OperatorCommand::Setting(SettingEdit::Volume(0.5))).unwrap();
        assert_eq!(store.settings().unwrap().display.volume, 0.5);
    }

    #[test]
    fn state_is_restored_from_store() {
        let store = MemoryStore::new();
        {
            let mut e = Engine::new(catalog(), Box::new(store.clone()), Box::new(NoSurface));
            stage(&mut e, &["img2", "txt"]);
            e.execute(OperatorCommand::SetLoop(true)).unwrap();
            e.execute(OperatorCommand::SetDuration(Some(8))).unwrap();
            e.execute(OperatorCommand::Setting(SettingEdit::FontSize(72))).unwrap();
        }
        let e = Engine::new(catalog(), Box::new(store), Box::new(NoSurface))
            .with_default_duration(Some(3));
        let ids: Vec<_> = e.staging().working().iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["img2", "txt"]);
        assert!(e.staging().loops());
        assert_eq!(e.playback().slide_duration, Some(8));
        assert_eq!(e.display().font_size, 72);
    }

    // ── Remote surface ───────────────────────────────────────────

    #[tokio::test]
    async fn open_failure_is_reported() {
        let mut e = engine();
        let err = e.apply(OperatorCommand::OpenSurface).await.unwrap_err();
        assert!(matches!(err, EngineError::SurfaceUnavailable(_)));
        assert!(e.link().phase().is_closed());
    }

    #[tokio::test]
    async fn ready_handshake_pushes_current_frame() {
        let (mut e, mut remote) = connected().await;
        stage(&mut e, &["img0"]);
        live_authorized(&mut e);
        assert!(drain(&mut remote).is_empty());

        e.handle_remote(Message::ProjectorReady);
        let sent = drain(&mut remote);
        assert_eq!(sent.len(), 2);
        match &sent[0] {
            Message::Update(frame) => assert_eq!(frame.item.as_ref().unwrap().id, "img0"),
            other => panic!("expected update, got {other:?}"),
        }
        assert_eq!(sent[1], Message::visibility(true));
    }

    #[tokio::test]
    async fn every_change_pushes_a_full_frame() {
        let (mut e, mut remote) = connected().await;
        e.handle_remote(Message::ProjectorReady);
        drain(&mut remote);

        stage(&mut e, &["img0", "img1"]);
        e.execute(OperatorCommand::Next).unwrap();
        let frames: Vec<_> = drain(&mut remote)
            .into_iter()
            .filter_map(|m| match m {
                Message::Update(f) => Some(f),
                _ => None,
            })
            .collect();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].current_index, 1);
        assert_eq!(frames[1].total_items, 2);
        assert!(frames.iter().all(|f| f.validate().is_ok()));
    }

    #[tokio::test]
    async fn back_channel_drives_the_engine() {
        let (mut e, mut remote) = connected().await;
        e.handle_remote(Message::ProjectorReady);
        stage(&mut e, &["img0", "img1"]);
        drain(&mut remote);

        e.handle_remote(Message::Next);
        assert_eq!(e.staging().active_index(), 1);
        e.handle_remote(Message::Previous);
        assert_eq!(e.staging().active_index(), 0);
        e.handle_remote(Message::TogglePlay);
        assert!(e.is_playing());

        e.handle_remote(Message::ToggleProjector);
        assert!(!e.show_projector());
        assert!(drain(&mut remote).contains(&Message::visibility(false)));

        e.handle_remote(Message::FullscreenAck(FullscreenAck { granted: false }));
        assert_eq!(e.status().fullscreen_granted, Some(false));
    }

    #[tokio::test(start_paused = true)]
    async fn surface_reported_duration_drives_the_schedule() {
        let mut e = engine();
        stage(&mut e, &["vid", "img0"]);
        e.execute(OperatorCommand::SetDuration(Some(5))).unwrap();
        e.execute(OperatorCommand::SetPlay(true)).unwrap();

        e.handle_remote(Message::MediaDuration(MediaDuration {
            id: "vid".into(),
            seconds: 20.0,
        }));
        let due = e.advance_deadline().unwrap() - Instant::now();
        assert_eq!(due, Duration::from_secs(20));

        e.handle_remote(Message::MediaDuration(MediaDuration {
            id: "img0".into(),
            seconds: f64::INFINITY,
        }));
        assert_eq!(e.catalog().get("img0").unwrap().duration, None);
    }

    #[tokio::test]
    async fn closed_surface_drops_frames_silently() {
        let (mut e, remote) = connected().await;
        e.handle_remote(Message::ProjectorReady);
        drop(remote);

        stage(&mut e, &["img0"]);
        assert!(e.link().phase().is_closed());
        e.execute(OperatorCommand::Next).unwrap();
    }

    #[tokio::test]
    async fn engine_stays_usable_while_surface_opens() {
        let slot = std::sync::Arc::new(std::sync::Mutex::new(None));
        let opener = PairOpener { remote: slot.clone() };
        let mut e = Engine::new(catalog(), Box::new(MemoryStore::new()), Box::new(opener));

        let pending = e.begin_open_surface().unwrap();
        assert_eq!(*e.link().phase(), LinkPhase::Opening);
        assert!(e.begin_open_surface().is_none());
        stage(&mut e, &["img0"]);

        let outcome = pending.await;
        e.finish_open_surface(outcome).unwrap();
        assert_eq!(*e.link().phase(), LinkPhase::AwaitingReady);
        assert!(slot.lock().unwrap().is_some());
        assert!(e.begin_open_surface().is_none());
    }

    #[tokio::test]
    async fn reopening_an_open_surface_is_ok() {
        let (mut e, _remote) = connected().await;
        e.handle_remote(Message::ProjectorReady);
        e.apply(OperatorCommand::OpenSurface).await.unwrap();
        assert!(e.link().is_ready());
    }

    #[tokio::test]
    async fn fullscreen_request_is_forwarded() {
        let (mut e, mut remote) = connected().await;
        e.handle_remote(Message::ProjectorReady);
        drain(&mut remote);
        e.execute(OperatorCommand::Fullscreen).unwrap();
        assert!(drain(&mut remote).contains(&Message::RequestFullscreen));
    }
}
