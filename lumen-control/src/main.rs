//! Lumen control: entry point.
//!
//! ```text
//! lumen-control                    Run the operator console
//! lumen-control --config <path>    Load a custom config TOML
//! lumen-control --listen <addr>    Override the projector listen address
//! lumen-control --gen-config       Write default config to stdout
//! ```

use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use lumen_control::config::ControlConfig;
use lumen_control::surface::ProcessOpener;
use lumen_control::{App, ControlEvent, Controller, UiEvent};
use lumen_core::{Catalog, Engine, JsonFileStore};
use ratatui::{Terminal, backend::CrosstermBackend};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "lumen-control", about = "Lumen live presentation console")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "lumen-control.toml")]
    config: PathBuf,

    /// Address the projector connects to (overrides the config).
    #[arg(short, long)]
    listen: Option<String>,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

fn init_tracing(config: &ControlConfig) -> std::io::Result<()> {
    let file = File::create(&config.logging.file)?;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        let text = toml::to_string_pretty(&ControlConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    let mut config = ControlConfig::load(&cli.config);
    if let Some(listen) = cli.listen {
        config.network.listen_address = listen;
    }
    init_tracing(&config)?;
    info!("lumen-control v{}", env!("CARGO_PKG_VERSION"));

    let catalog = Catalog::load(&config.storage.catalog).unwrap_or_else(|e| {
        warn!("cannot load catalog {}: {e}", config.storage.catalog.display());
        Catalog::default()
    });
    let store = JsonFileStore::new(&config.storage.settings, &config.storage.playlist);
    let opener = ProcessOpener::bind(&config).await?;
    let engine = Engine::new(catalog, Box::new(store), Box::new(opener))
        .with_default_duration(config.default_slide_duration());

    // 1. Channels
    let (control_tx, mut control_rx) = mpsc::unbounded_channel::<ControlEvent>();
    let (ui_tx, mut ui_rx) = mpsc::unbounded_channel::<UiEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<String>();

    // 2. Input task (blocking crossterm poll on its own thread)
    tokio::task::spawn_blocking(move || {
        loop {
            if !event::poll(Duration::from_millis(10)).unwrap_or(false) {
                if ui_tx.is_closed() {
                    break;
                }
                continue;
            }
            let sent = match event::read() {
                Ok(Event::Key(key)) => ui_tx.send(UiEvent::Key(key)),
                Ok(Event::Resize(w, h)) => ui_tx.send(UiEvent::Resize(w, h)),
                _ => Ok(()),
            };
            if sent.is_err() {
                break;
            }
        }
    });

    // 3. Engine task
    let controller = Controller::new(engine, control_tx);
    let engine_task = tokio::spawn(controller.run(cmd_rx));
    if config.projector.open_on_start {
        let _ = cmd_tx.send("open".to_string());
    }

    // 4. Terminal
    crossterm::terminal::enable_raw_mode()?;
    crossterm::execute!(std::io::stdout(), crossterm::terminal::EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(std::io::stdout()))?;
    terminal.clear()?;

    let mut app = App::new();

    // 5. UI loop
    loop {
        terminal.draw(|f| app.draw(f))?;

        tokio::select! {
            Some(event) = control_rx.recv() => app.update(event),

            Some(event) = ui_rx.recv() => match event {
                UiEvent::Key(key) if key.kind == KeyEventKind::Press => match key.code {
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => break,
                    KeyCode::F(1) => {
                        app.command_to_execute = "help".to_string();
                        let _ = app.handle_enter();
                    }
                    KeyCode::F(n) => {
                        if let Some(line) = app.shortcut(n) {
                            app.logs.push(format!("> {line}"));
                            let _ = cmd_tx.send(line);
                        }
                    }
                    KeyCode::Esc => app.handle_esc(),
                    KeyCode::Tab => app.handle_tab(),
                    KeyCode::Char(c) => app.type_char(c),
                    KeyCode::Backspace => app.backspace(),
                    KeyCode::Up => app.handle_up(),
                    KeyCode::Down => app.handle_down(),
                    KeyCode::PageUp => {
                        app.log_scroll = (app.log_scroll + 10).min(app.logs.len().saturating_sub(1));
                        app.autoscroll = false;
                    }
                    KeyCode::PageDown => {
                        app.log_scroll = app.log_scroll.saturating_sub(10);
                        if app.log_scroll == 0 {
                            app.autoscroll = true;
                        }
                    }
                    KeyCode::Enter => {
                        if let Some(line) = app.handle_enter() {
                            let _ = cmd_tx.send(line);
                        }
                    }
                    _ => {}
                },
                // Ratatui re-lays out on the next draw.
                _ => {}
            },

            else => break,
        }

        if app.exit {
            break;
        }
    }

    // Restore terminal
    crossterm::terminal::disable_raw_mode()?;
    crossterm::execute!(std::io::stdout(), crossterm::terminal::LeaveAlternateScreen)?;

    drop(cmd_tx);
    drop(ui_rx);
    if tokio::time::timeout(Duration::from_secs(2), engine_task).await.is_err() {
        warn!("engine task did not stop in time");
    }
    info!("lumen-control exited");
    Ok(())
}
