//! Operator commands.
//!
//! Everything the operator can do to the engine, as one enum. The
//! console parses typed lines into these via [`FromStr`]; tests build
//! them directly.

use std::fmt;
use std::str::FromStr;

use crate::error::LumenError;
use crate::settings::{Alignment, FitMode};

/// An edit to the display settings.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingEdit {
    Fit(FitMode),
    Zoom(f32),
    Pan { x: f32, y: f32 },
    FontSize(u16),
    AutoFit(bool),
    Logo { visible: bool, url: Option<String> },
    Overlay { title: String, subtitle: String, body: String },
    OverlayPosition { x: f32, y: f32 },
    ThemeFont(String),
    ThemeColor(String),
    ThemeAlignment(Alignment),
    ThemeShadow(bool),
    Mute(bool),
    Volume(f32),
    LoopMedia(bool),
    Waiting { title: String, subtitle: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum OperatorCommand {
    // ── Session ──────────────────────────────────────────────────
    GoLive,
    EndLive,
    Authorize,
    TogglePause,
    SetDarkScreen(bool),
    SetBlackScreen(bool),

    // ── Playlist ─────────────────────────────────────────────────
    /// Replace the working list with these catalog ids.
    Stage(Vec<String>),
    Add(String),
    Remove(usize),
    Move { from: usize, to: usize },
    Present,
    Update,
    Clear,
    SetInterval(Option<u32>),
    SetLoop(bool),

    // ── Playback ─────────────────────────────────────────────────
    SetPlay(bool),
    TogglePlay,
    SetDuration(Option<u32>),
    SetRepeat(bool),
    Next,
    Previous,
    Select(usize),
    /// An intrinsic media duration became known.
    RecordDuration { id: String, seconds: f64 },

    // ── Remote surface ───────────────────────────────────────────
    OpenSurface,
    ToggleVisibility,
    Fullscreen,

    Setting(SettingEdit),
}

impl OperatorCommand {
    /// Console verbs, for completion and help.
    pub const VERBS: &'static [&'static str] = &[
        "go-live", "end-live", "authorize", "pause", "dark", "black", "stage", "add", "remove",
        "move", "present", "update", "clear", "interval", "loop", "play", "duration", "repeat",
        "next", "prev", "select", "media-duration", "open", "show", "fullscreen", "fit", "zoom",
        "pan", "font-size", "auto-fit", "logo", "overlay", "overlay-pos", "theme-font",
        "theme-color", "align", "shadow", "mute", "volume", "loop-media", "waiting",
    ];
}

// ── Parsing ──────────────────────────────────────────────────────

fn invalid(msg: impl fmt::Display) -> LumenError {
    LumenError::InvalidCommand(msg.to_string())
}

struct Args<'a> {
    verb: &'a str,
    rest: &'a str,
    words: Vec<&'a str>,
}

impl<'a> Args<'a> {
    fn new(line: &'a str) -> Self {
        let line = line.trim();
        let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();
        Self {
            verb,
            rest,
            words: rest.split_whitespace().collect(),
        }
    }

    fn word(&self, i: usize) -> Result<&'a str, LumenError> {
        self.words
            .get(i)
            .copied()
            .ok_or_else(|| invalid(format!("{}: missing argument {}", self.verb, i + 1)))
    }

    fn parse<T: FromStr>(&self, i: usize) -> Result<T, LumenError> {
        let word = self.word(i)?;
        word.parse()
            .map_err(|_| invalid(format!("{}: cannot parse '{word}'", self.verb)))
    }

    fn switch(&self) -> Result<bool, LumenError> {
        match self.word(0)? {
            "on" | "true" | "yes" | "1" => Ok(true),
            "off" | "false" | "no" | "0" => Ok(false),
            other => Err(invalid(format!("{}: expected on/off, got '{other}'", self.verb))),
        }
    }

    /// A number of seconds, or `off`/`none` to unset.
    fn seconds(&self) -> Result<Option<u32>, LumenError> {
        match self.word(0)? {
            "off" | "none" => Ok(None),
            _ => self.parse(0).map(Some),
        }
    }

    /// Up to `n` fields separated by `|`.
    fn fields(&self, n: usize) -> Vec<String> {
        let mut fields: Vec<String> = self.rest.splitn(n, '|').map(|f| f.trim().to_string()).collect();
        fields.resize(n, String::new());
        fields
    }
}

impl FromStr for OperatorCommand {
    type Err = LumenError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        use OperatorCommand as C;
        use SettingEdit as S;

        let a = Args::new(line);
        let cmd = match a.verb.to_ascii_lowercase().as_str() {
            "" => return Err(invalid("empty command")),
            "go-live" | "live" => C::GoLive,
            "end-live" | "end" => C::EndLive,
            "authorize" | "auth" => C::Authorize,
            "pause" => C::TogglePause,
            "dark" => C::SetDarkScreen(a.switch()?),
            "black" => C::SetBlackScreen(a.switch()?),

            "stage" => C::Stage(a.words.iter().map(|w| w.to_string()).collect()),
            "add" => C::Add(a.word(0)?.to_string()),
            "remove" | "rm" => C::Remove(a.parse(0)?),
            "move" | "mv" => C::Move {
                from: a.parse(0)?,
                to: a.parse(1)?,
            },
            "present" => C::Present,
            "update" => C::Update,
            "clear" => C::Clear,
            "interval" => C::SetInterval(a.seconds()?),
            "loop" => C::SetLoop(a.switch()?),

            "play" if a.words.is_empty() => C::TogglePlay,
            "play" => C::SetPlay(a.switch()?),
            "duration" => C::SetDuration(a.seconds()?),
            "repeat" => C::SetRepeat(a.switch()?),
            "next" => C::Next,
            "prev" | "previous" => C::Previous,
            "select" | "go" => C::Select(a.parse(0)?),
            "media-duration" => C::RecordDuration {
                id: a.word(0)?.to_string(),
                seconds: a.parse(1)?,
            },

            "open" => C::OpenSurface,
            "show" => C::ToggleVisibility,
            "fullscreen" | "fs" => C::Fullscreen,

            "fit" => C::Setting(S::Fit(a.word(0)?.parse().map_err(invalid)?)),
            "zoom" => C::Setting(S::Zoom(a.parse(0)?)),
            "pan" => C::Setting(S::Pan {
                x: a.parse(0)?,
                y: a.parse(1)?,
            }),
            "font-size" => C::Setting(S::FontSize(a.parse(0)?)),
            "auto-fit" => C::Setting(S::AutoFit(a.switch()?)),
            "logo" => C::Setting(S::Logo {
                visible: a.switch()?,
                url: a.words.get(1).map(|u| u.to_string()),
            }),
            "overlay" => {
                let f = a.fields(3);
                C::Setting(S::Overlay {
                    title: f[0].clone(),
                    subtitle: f[1].clone(),
                    body: f[2].clone(),
                })
            }
            "overlay-pos" => C::Setting(S::OverlayPosition {
                x: a.parse(0)?,
                y: a.parse(1)?,
            }),
            "theme-font" => C::Setting(S::ThemeFont(a.rest.to_string())),
            "theme-color" => C::Setting(S::ThemeColor(a.word(0)?.to_string())),
            "align" => C::Setting(S::ThemeAlignment(a.word(0)?.parse().map_err(invalid)?)),
            "shadow" => C::Setting(S::ThemeShadow(a.switch()?)),
            "mute" => C::Setting(S::Mute(a.switch()?)),
            "volume" => C::Setting(S::Volume(a.parse(0)?)),
            "loop-media" => C::Setting(S::LoopMedia(a.switch()?)),
            "waiting" => {
                let f = a.fields(2);
                C::Setting(S::Waiting {
                    title: f[0].clone(),
                    subtitle: f[1].clone(),
                })
            }
            other => return Err(invalid(format!("unknown command '{other}'"))),
        };
        Ok(cmd)
    }
}
