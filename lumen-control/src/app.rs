use lumen_core::{EngineStatus, LinkPhase, OperatorCommand, Screen};
use ratatui::{
    Frame,
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::border,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Widget},
};

/// Console-only verbs, handled without reaching the engine.
const LOCAL_VERBS: &[&str] = &["help", "quit"];

/// Verbs whose arguments are catalog ids.
const ITEM_VERBS: &[&str] = &["stage", "add"];

#[derive(Debug, Clone)]
pub enum UiEvent {
    Key(crossterm::event::KeyEvent),
    Resize(u16, u16),
}

#[derive(Debug, Clone)]
pub enum ControlEvent {
    Log(String),
    Status(Box<EngineStatus>),
    Catalog(Vec<String>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CompletionType {
    Command,
    Item,
}

#[derive(Debug, Default)]
pub struct CompletionState {
    pub options: Vec<String>,
    pub selected_index: usize,
    pub active: bool,
    pub trigger_type: Option<CompletionType>,
}

#[derive(Debug)]
pub struct App {
    pub status: Option<EngineStatus>,
    pub catalog: Vec<String>,
    pub command_to_execute: String,
    pub logs: Vec<String>,
    pub log_scroll: usize,
    pub autoscroll: bool,
    pub completion: CompletionState,
    pub exit: bool,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    pub fn new() -> Self {
        Self {
            status: None,
            catalog: Vec::new(),
            command_to_execute: String::new(),
            logs: vec![
                "Welcome to Lumen Control".to_string(),
                "Type 'help' for commands".to_string(),
            ],
            log_scroll: 0,
            autoscroll: true,
            completion: CompletionState::default(),
            exit: false,
        }
    }

    fn push_log(&mut self, msg: &str) {
        for line in msg.lines() {
            self.logs.push(line.to_string());
        }
        if self.autoscroll {
            self.log_scroll = 0;
        }
    }

    pub fn update(&mut self, event: ControlEvent) {
        match event {
            ControlEvent::Log(msg) => self.push_log(&msg),
            ControlEvent::Status(status) => self.status = Some(*status),
            ControlEvent::Catalog(ids) => {
                self.push_log(&format!("- catalog: {} items", ids.len()));
                self.catalog = ids;
            }
        }
    }

    // ── Input ────────────────────────────────────────────────────

    pub fn type_char(&mut self, c: char) {
        self.command_to_execute.push(c);
        self.completion.active = false;
    }

    pub fn backspace(&mut self) {
        self.command_to_execute.pop();
        self.completion.active = false;
    }

    pub fn handle_tab(&mut self) {
        if self.completion.active && !self.completion.options.is_empty() {
            self.completion.selected_index =
                (self.completion.selected_index + 1) % self.completion.options.len();
        } else {
            self.trigger_completion();
        }
    }

    pub fn handle_up(&mut self) {
        if self.completion.active && !self.completion.options.is_empty() {
            if self.completion.selected_index == 0 {
                self.completion.selected_index = self.completion.options.len() - 1;
            } else {
                self.completion.selected_index -= 1;
            }
        } else {
            self.log_scroll = (self.log_scroll + 1).min(self.logs.len().saturating_sub(1));
            self.autoscroll = false;
        }
    }

    pub fn handle_down(&mut self) {
        if self.completion.active && !self.completion.options.is_empty() {
            self.completion.selected_index =
                (self.completion.selected_index + 1) % self.completion.options.len();
        } else {
            self.log_scroll = self.log_scroll.saturating_sub(1);
            if self.log_scroll == 0 {
                self.autoscroll = true;
            }
        }
    }

    /// Returns the line to send to the engine, if any. Console-only
    /// verbs are handled here.
    pub fn handle_enter(&mut self) -> Option<String> {
        if self.completion.active && !self.completion.options.is_empty() {
            self.apply_completion();
            self.completion.active = false;
            return None;
        }
        let line = self.command_to_execute.trim().to_string();
        self.command_to_execute.clear();
        self.completion.active = false;
        if line.is_empty() {
            return None;
        }
        self.push_log(&format!("> {line}"));
        match line.as_str() {
            "help" => {
                self.push_log(&help_text());
                None
            }
            "quit" => {
                self.exit = true;
                None
            }
            _ => Some(line),
        }
    }

    pub fn handle_esc(&mut self) {
        if self.completion.active {
            self.completion.active = false;
        } else {
            self.exit = true;
        }
    }

    /// Line for a function-key shortcut. Toggles read the last known
    /// status.
    pub fn shortcut(&self, key: u8) -> Option<String> {
        let status = self.status.as_ref();
        let on_off = |flag: bool| if flag { "off" } else { "on" };
        let line = match key {
            1 => "help".to_string(),
            2 => match status.map(|s| s.is_live) {
                Some(true) => "end-live".to_string(),
                _ => "go-live".to_string(),
            },
            3 => "authorize".to_string(),
            4 => "pause".to_string(),
            5 => format!("dark {}", on_off(status.is_some_and(|s| s.dark_screen))),
            6 => format!("black {}", on_off(status.is_some_and(|s| s.black_screen))),
            7 => "prev".to_string(),
            8 => "next".to_string(),
            9 => "play".to_string(),
            10 => "present".to_string(),
            11 => "update".to_string(),
            12 => "open".to_string(),
            _ => return None,
        };
        Some(line)
    }

    fn trigger_completion(&mut self) {
        let input = self.command_to_execute.to_lowercase();

        // Verb (first word)
        if !input.contains(' ') {
            let options: Vec<String> = OperatorCommand::VERBS
                .iter()
                .chain(LOCAL_VERBS)
                .filter(|verb| verb.starts_with(&input))
                .map(|verb| verb.to_string())
                .collect();
            self.show_options(CompletionType::Command, options);
            return;
        }

        // Catalog ids for item verbs
        let verb = input.split_whitespace().next().unwrap_or_default();
        if ITEM_VERBS.contains(&verb) {
            let prefix = if input.ends_with(' ') {
                ""
            } else {
                input.split_whitespace().last().unwrap_or_default()
            };
            let options: Vec<String> = self
                .catalog
                .iter()
                .filter(|id| id.to_lowercase().starts_with(prefix))
                .cloned()
                .collect();
            self.show_options(CompletionType::Item, options);
        } else {
            self.completion.active = false;
        }
    }

    fn show_options(&mut self, kind: CompletionType, options: Vec<String>) {
        self.completion.active = !options.is_empty();
        self.completion.trigger_type = Some(kind);
        self.completion.options = options;
        self.completion.selected_index = 0;
    }

    fn apply_completion(&mut self) {
        let Some(choice) = self.completion.options.get(self.completion.selected_index) else {
            return;
        };
        match self.completion.trigger_type {
            Some(CompletionType::Command) => {
                self.command_to_execute = format!("{choice} ");
            }
            Some(CompletionType::Item) => {
                let input = &self.command_to_execute;
                let kept = if input.ends_with(' ') {
                    input.as_str()
                } else {
                    input.rsplit_once(' ').map_or("", |(head, _)| head)
                };
                self.command_to_execute = format!("{} {choice} ", kept.trim_end());
            }
            None => {}
        }
    }

    // ── Drawing ──────────────────────────────────────────────────

    pub fn draw(&mut self, frame: &mut Frame) {
        let area = frame.area();
        self.render_main(area, frame.buffer_mut());
    }

    fn render_main(&self, area: Rect, buf: &mut Buffer) {
        let outer_block = Block::bordered()
            .title(
                Line::from(vec![
                    Span::raw(" Lumen Control "),
                    Span::styled(
                        screen_label(self.status.as_ref()),
                        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                    ),
                    Span::raw(" "),
                ])
                .centered(),
            )
            .border_set(border::THICK)
            .border_style(Style::default().fg(Color::DarkGray));
        let inner_area = outer_block.inner(area);
        outer_block.render(area, buf);

        let main_layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(3)])
            .split(inner_area);
        let top_area = main_layout[0];
        let input_area = main_layout[1];

        let top_layout = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(top_area);
        self.render_logs(top_layout[0], buf);

        let sidebar = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(12),
                Constraint::Min(0),
                Constraint::Length(8),
            ])
            .split(top_layout[1]);
        self.render_status(sidebar[0], buf);
        self.render_playlist(sidebar[1], buf);
        self.render_catalog(sidebar[2], buf);

        self.render_input(inner_area, input_area, buf);
    }

    fn render_logs(&self, area: Rect, buf: &mut Buffer) {
        let logs_block = Block::bordered()
            .title(Line::from(vec![
                Span::styled(
                    " Console ",
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                ),
                if self.autoscroll {
                    Span::styled("[Autoscroll]", Style::default().fg(Color::Green).add_modifier(Modifier::DIM))
                } else {
                    Span::styled("[Manual]", Style::default().fg(Color::Yellow).add_modifier(Modifier::DIM))
                },
            ]))
            .border_style(Style::default().fg(Color::DarkGray))
            .padding(ratatui::widgets::Padding::horizontal(1));
        let inner = logs_block.inner(area);
        logs_block.render(area, buf);

        let visible_height = inner.height as usize;
        let total = self.logs.len();
        // scroll 0 = newest lines at the bottom
        let start = total
            .saturating_sub(visible_height)
            .saturating_sub(self.log_scroll);
        let end = (start + visible_height).min(total);

        let items: Vec<ListItem> = self.logs[start..end]
            .iter()
            .map(|log| {
                if let Some(rest) = log.strip_prefix("> ") {
                    ListItem::new(Line::from(vec![
                        Span::styled("> ", Style::default().fg(Color::Green)),
                        Span::raw(rest),
                    ]))
                } else if let Some(rest) = log.strip_prefix("- ") {
                    ListItem::new(Line::from(vec![
                        Span::styled("- ", Style::default().fg(Color::Blue)),
                        Span::styled(rest, Style::default().fg(Color::Gray).add_modifier(Modifier::ITALIC)),
                    ]))
                } else {
                    ListItem::new(Line::from(log.as_str()))
                }
            })
            .collect();
        List::new(items).render(inner, buf);
    }

    fn render_status(&self, area: Rect, buf: &mut Buffer) {
        let block = Block::bordered()
            .title(Span::styled(
                " Session ",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ))
            .border_style(Style::default().fg(Color::DarkGray))
            .padding(ratatui::widgets::Padding::horizontal(1));
        let inner = block.inner(area);
        block.render(area, buf);

        let Some(status) = &self.status else {
            Paragraph::new("waiting for engine...").render(inner, buf);
            return;
        };

        let label = |name: &'static str| Span::styled(name, Style::default().fg(Color::Gray));
        let flag = |on: bool, text: &'static str| {
            let color = if on { Color::Green } else { Color::DarkGray };
            Span::styled(text, Style::default().fg(color))
        };
        let duration = match status.slide_duration {
            Some(s) => format!("{s}s"),
            None => "unset".to_string(),
        };
        let link_color = match status.link {
            LinkPhase::Ready { .. } => Color::Green,
            LinkPhase::Closed => Color::Red,
            _ => Color::Yellow,
        };
        let fullscreen = match status.fullscreen_granted {
            Some(true) => "granted",
            Some(false) => "refused",
            None => "-",
        };

        let mut lines = vec![
            Line::from(vec![
                label("Showing : "),
                Span::styled(
                    status.item.clone().unwrap_or_else(|| "-".to_string()),
                    Style::default().fg(Color::Yellow),
                ),
            ]),
            Line::from(vec![
                label("Flags   : "),
                flag(status.is_live, "LIVE "),
                flag(status.authorized, "AUTH "),
                flag(status.paused, "PAUSED "),
                flag(status.dark_screen, "DARK "),
                flag(status.black_screen, "BLACK"),
            ]),
            Line::from(vec![
                label("Playback: "),
                flag(status.is_playing, "PLAY "),
                flag(status.repeat_all, "REPEAT "),
                Span::raw(duration),
            ]),
            Line::from(vec![
                label("Projector: "),
                Span::styled(status.link.to_string(), Style::default().fg(link_color)),
                Span::raw(if status.show_projector { " visible" } else { " hidden" }),
            ]),
            Line::from(vec![label("Fullscreen: "), Span::raw(fullscreen)]),
        ];
        let published = match status.published_len {
            Some(len) if status.staleness > 0 => format!("{len} items, {} edits pending", status.staleness),
            Some(len) => format!("{len} items"),
            None => "not presented".to_string(),
        };
        lines.push(Line::from(vec![label("Presented: "), Span::raw(published)]));
        if let Some(reason) = status.warning {
            lines.push(Line::from(Span::styled(
                format!("Auto-advance off: {reason}"),
                Style::default().fg(Color::Red),
            )));
        }
        Paragraph::new(lines).render(inner, buf);
    }

    fn render_playlist(&self, area: Rect, buf: &mut Buffer) {
        let block = Block::bordered()
            .title(Span::styled(
                " Working playlist ",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ))
            .border_style(Style::default().fg(Color::DarkGray))
            .padding(ratatui::widgets::Padding::horizontal(1));
        let inner = block.inner(area);
        block.render(area, buf);

        let Some(status) = &self.status else {
            return;
        };
        let items: Vec<ListItem> = status
            .working
            .iter()
            .enumerate()
            .map(|(i, label)| {
                let style = if i == status.working_index {
                    Style::default().bg(Color::Cyan).fg(Color::Black).add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::Gray)
                };
                ListItem::new(Line::from(vec![
                    Span::styled(format!("{i:>3} "), Style::default().fg(Color::DarkGray)),
                    Span::styled(label.as_str(), style),
                ]))
            })
            .collect();
        List::new(items).render(inner, buf);
    }

    fn render_catalog(&self, area: Rect, buf: &mut Buffer) {
        let block = Block::bordered()
            .title(Span::styled(
                " Catalog ",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ))
            .border_style(Style::default().fg(Color::DarkGray))
            .padding(ratatui::widgets::Padding::horizontal(1));
        let inner = block.inner(area);
        block.render(area, buf);
        Paragraph::new(Line::from(self.catalog.join("  ")))
            .wrap(ratatui::widgets::Wrap { trim: true })
            .render(inner, buf);
    }

    fn render_input(&self, inner_area: Rect, input_area: Rect, buf: &mut Buffer) {
        let input_block = Block::default()
            .borders(Borders::TOP)
            .border_style(Style::default().fg(Color::DarkGray));
        let input_inner = input_block.inner(input_area);
        input_block.render(input_area, buf);

        let input_text = Line::from(vec![
            Span::styled(" > ", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
            Span::raw(&self.command_to_execute),
        ]);
        Paragraph::new(input_text).render(input_inner, buf);

        if !self.completion.active || self.completion.options.is_empty() {
            return;
        }
        let num_options = self.completion.options.len().min(10);
        let dropdown_height = (num_options + 2) as u16;
        let dropdown_width = 32.min(inner_area.width.saturating_sub(4));
        let dropdown_area = Rect {
            x: input_inner.x + 3,
            y: input_area.y.saturating_sub(dropdown_height),
            width: dropdown_width,
            height: dropdown_height,
        };
        Clear.render(dropdown_area, buf);

        let dropdown_block = Block::bordered()
            .border_style(Style::default().fg(Color::Cyan))
            .title(Span::styled(
                " Suggestions ",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ));
        let skip = self.completion.selected_index.saturating_sub(num_options - 1);
        let list_items: Vec<ListItem> = self
            .completion
            .options
            .iter()
            .enumerate()
            .skip(skip)
            .take(num_options)
            .map(|(i, opt)| {
                let style = if i == self.completion.selected_index {
                    Style::default().bg(Color::Cyan).fg(Color::Black).add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                ListItem::new(Line::from(Span::styled(opt.as_str(), style)))
            })
            .collect();
        List::new(list_items).block(dropdown_block).render(dropdown_area, buf);
    }
}

fn screen_label(status: Option<&EngineStatus>) -> &'static str {
    match status.map(|s| s.screen) {
        Some(Screen::Black) => "[BLACK]",
        Some(Screen::Dark) => "[DARK]",
        Some(Screen::NotLive) => "[OFF AIR]",
        Some(Screen::Waiting) => "[WAITING]",
        Some(Screen::Content) => "[ON AIR]",
        None => "",
    }
}

fn help_text() -> String {
    let mut text = String::from("- commands: ");
    text.push_str(&OperatorCommand::VERBS.join(" "));
    text.push_str(
        "\n- keys: F2 live  F3 authorize  F4 pause  F5 dark  F6 black  F7/F8 prev/next\
         \n        F9 play  F10 present  F11 update  F12 open projector  Esc quit",
    );
    text
}

// ── Tests ────────────────────────────────────────────────────────
