//! Drawing the audience view.
//!
//! The renderer decides what to show; this module maps each
//! [`RenderState`] onto terminal widgets.

use async_trait::async_trait;
use lumen_core::renderer::{Caption, FullscreenTarget};
use lumen_core::settings::Alignment;
use lumen_core::{ItemKind, LumenError, RemoteRenderer, RenderState, Scene};
use ratatui::{
    Frame,
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Paragraph, Widget, Wrap},
};

// ── Fullscreen ───────────────────────────────────────────────────

/// The terminal as a fullscreen surface: the alternate screen with the
/// cursor hidden.
#[derive(Debug, Default)]
pub struct TerminalFullscreen {
    active: bool,
}

#[async_trait]
impl FullscreenTarget for TerminalFullscreen {
    async fn enter_fullscreen(&mut self) -> Result<bool, LumenError> {
        crossterm::execute!(
            std::io::stdout(),
            crossterm::terminal::EnterAlternateScreen,
            crossterm::cursor::Hide,
            crossterm::terminal::SetTitle("Lumen"),
        )?;
        let (cols, rows) = crossterm::terminal::size()?;
        self.active = cols > 0 && rows > 0;
        Ok(self.active)
    }

    fn is_fullscreen(&self) -> bool {
        self.active
    }
}

// ── Drawing ──────────────────────────────────────────────────────

pub fn draw(frame: &mut Frame, renderer: &RemoteRenderer) {
    let area = frame.area();
    render(renderer, area, frame.buffer_mut());
}

/// Render into a buffer. Hidden surfaces stay black.
pub fn render(renderer: &RemoteRenderer, area: Rect, buf: &mut Buffer) {
    Block::default()
        .style(Style::default().bg(Color::Black))
        .render(area, buf);
    if !renderer.is_visible() {
        return;
    }

    match renderer.state() {
        RenderState::Uninitialized => render_caption(
            &Caption {
                title: String::new(),
                subtitle: "waiting for control".into(),
            },
            Color::DarkGray,
            area,
            buf,
        ),
        RenderState::BlackScreen => {}
        RenderState::DarkScreen(caption) => render_caption(caption, Color::Gray, area, buf),
        RenderState::NotLive(caption) | RenderState::Waiting(caption) => {
            render_caption(caption, Color::White, area, buf)
        }
        RenderState::Displaying(scene) => render_scene(scene, area, buf),
    }
}

fn render_caption(caption: &Caption, color: Color, area: Rect, buf: &mut Buffer) {
    let lines = vec![
        Line::from(Span::styled(
            caption.title.as_str(),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            caption.subtitle.as_str(),
            Style::default().fg(color).add_modifier(Modifier::DIM),
        )),
    ];
    let body = centered(area, lines.len() as u16);
    Paragraph::new(lines)
        .alignment(ratatui::layout::Alignment::Center)
        .wrap(Wrap { trim: true })
        .render(body, buf);
}

fn render_scene(scene: &Scene, area: Rect, buf: &mut Buffer) {
    let overlay_height = if scene.overlay.is_some() { 4 } else { 0 };
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(overlay_height),
        ])
        .split(area);

    if let Some(logo) = &scene.logo {
        Paragraph::new(Span::styled(
            format!("[{logo}]"),
            Style::default().fg(Color::DarkGray),
        ))
        .alignment(ratatui::layout::Alignment::Right)
        .render(layout[0], buf);
    }

    let color = theme_color(&scene.theme.color);
    let alignment = match scene.theme.alignment {
        Alignment::Left => ratatui::layout::Alignment::Left,
        Alignment::Center => ratatui::layout::Alignment::Center,
        Alignment::Right => ratatui::layout::Alignment::Right,
    };
    let mut style = Style::default().fg(color);
    if scene.theme.shadow {
        style = style.add_modifier(Modifier::BOLD);
    }

    let mut lines = Vec::new();
    match (&scene.text, scene.item.kind) {
        (Some(text), _) => {
            if let Some(title) = &text.title {
                lines.push(Line::from(Span::styled(
                    title.as_str(),
                    style.add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
                )));
                lines.push(Line::from(""));
            }
            lines.extend(text.body.lines().map(|l| Line::from(Span::styled(l, style))));
        }
        (None, kind) => {
            lines.push(Line::from(Span::styled(
                format!("{} {}", kind_marker(kind), scene.item.label()),
                style.add_modifier(Modifier::BOLD),
            )));
            if let Some(url) = &scene.item.url {
                lines.push(Line::from(Span::styled(
                    url.as_str(),
                    Style::default().fg(Color::DarkGray),
                )));
            }
            lines.push(Line::from(Span::styled(
                media_details(scene),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::DIM),
            )));
        }
    }
    let body = centered(layout[1], lines.len() as u16);
    Paragraph::new(lines)
        .alignment(alignment)
        .wrap(Wrap { trim: false })
        .render(body, buf);

    if let Some(overlay) = &scene.overlay {
        let mut lines = vec![Line::from(Span::styled(
            overlay.title.as_str(),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ))];
        for text in [&overlay.subtitle, &overlay.body] {
            if !text.is_empty() {
                lines.push(Line::from(Span::styled(text.as_str(), Style::default().fg(Color::Gray))));
            }
        }
        Paragraph::new(lines)
            .block(Block::default().style(Style::default().bg(Color::Rgb(24, 24, 24))))
            .render(layout[2], buf);
    }
}

fn kind_marker(kind: ItemKind) -> &'static str {
    match kind {
        ItemKind::Image => "[image]",
        ItemKind::Video => "[video]",
        ItemKind::Audio => "[audio]",
        ItemKind::Text => "[text]",
    }
}

fn media_details(scene: &Scene) -> String {
    let mut details = format!("{:?} x{:.2}", scene.fit, scene.zoom);
    if scene.item.kind.is_timed() {
        if scene.muted {
            details.push_str(" muted");
        } else {
            details.push_str(&format!(" vol {:.0}%", scene.volume * 100.0));
        }
        if scene.loop_media {
            details.push_str(" loop");
        }
    }
    details
}

/// A band of `height` rows in the vertical middle of `area`.
fn centered(area: Rect, height: u16) -> Rect {
    let height = height.min(area.height);
    Rect {
        y: area.y + (area.height - height) / 2,
        height,
        ..area
    }
}

/// `#rrggbb` or `#rgb`; anything else falls back to white.
fn theme_color(value: &str) -> Color {
    let hex = value.trim().trim_start_matches('#');
    if !hex.is_ascii() {
        return Color::White;
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    let rgb = match hex.len() {
        6 => (channel(&hex[0..2]), channel(&hex[2..4]), channel(&hex[4..6])),
        3 => (
            channel(&hex[0..1].repeat(2)),
            channel(&hex[1..2].repeat(2)),
            channel(&hex[2..3].repeat(2)),
        ),
        _ => (None, None, None),
    };
    match rgb {
        (Some(r), Some(g), Some(b)) => Color::Rgb(r, g, b),
        _ => Color::White,
    }
}
