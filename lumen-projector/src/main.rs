//! Lumen projector: entry point.
//!
//! ```text
//! lumen-projector                    Connect to the console and present
//! lumen-projector --address <addr>   Override the console address
//! lumen-projector --config <path>    Load a custom config TOML
//! lumen-projector --gen-config       Write default config to stdout
//! ```
//!
//! Keys: `n`/Right next, `p`/Left previous, Space play/pause,
//! `v` hide/show, `q`/Esc quit.

use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::Ordering;
use std::time::Duration;

use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use lumen_core::RemoteRenderer;
use lumen_projector::config::ProjectorConfig;
use lumen_projector::service::{ProjectorService, SessionEnd, ViewerInput};
use lumen_projector::view::{self, TerminalFullscreen};
use ratatui::{Terminal, backend::CrosstermBackend};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "lumen-projector", about = "Lumen audience display")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "lumen-projector.toml")]
    config: PathBuf,

    /// Console address `host:port` (overrides the config).
    #[arg(short, long)]
    address: Option<String>,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

fn map_key(key: event::KeyEvent) -> Option<ViewerInput> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(ViewerInput::Quit)
        }
        KeyCode::Char('n') | KeyCode::Right | KeyCode::PageDown => Some(ViewerInput::Next),
        KeyCode::Char('p') | KeyCode::Left | KeyCode::PageUp => Some(ViewerInput::Previous),
        KeyCode::Char(' ') => Some(ViewerInput::TogglePlay),
        KeyCode::Char('v') => Some(ViewerInput::ToggleProjector),
        KeyCode::Char('q') | KeyCode::Esc => Some(ViewerInput::Quit),
        _ => None,
    }
}

/// Resolves once the viewer asks to quit; other input is dropped.
async fn wait_for_quit(input: &mut mpsc::UnboundedReceiver<ViewerInput>) {
    while let Some(event) = input.recv().await {
        if event == ViewerInput::Quit {
            return;
        }
    }
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        let text = toml::to_string_pretty(&ProjectorConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    let mut config = ProjectorConfig::load(&cli.config);
    if let Some(address) = cli.address {
        config.network.control_address = address;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(File::create(&config.logging.file)?))
        .init();

    info!("lumen-projector v{}", env!("CARGO_PKG_VERSION"));
    info!("console: {}", config.network.control_address);

    let service = ProjectorService::new(config);

    // Ctrl-C handler.
    let stop = service.stop_handle();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Ctrl-C received, shutting down");
        stop.store(false, Ordering::SeqCst);
    });

    // Input task (blocking crossterm poll on its own thread)
    let (input_tx, mut input_rx) = mpsc::unbounded_channel::<ViewerInput>();
    tokio::task::spawn_blocking(move || {
        loop {
            if !event::poll(Duration::from_millis(10)).unwrap_or(false) {
                if input_tx.is_closed() {
                    break;
                }
                continue;
            }
            let input = match event::read() {
                Ok(Event::Key(key)) => map_key(key),
                Ok(Event::Resize(w, h)) => Some(ViewerInput::Resize(w, h)),
                _ => None,
            };
            if let Some(input) = input {
                if input_tx.send(input).is_err() {
                    break;
                }
            }
        }
    });

    // Terminal
    crossterm::terminal::enable_raw_mode()?;
    crossterm::execute!(std::io::stdout(), crossterm::terminal::EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(std::io::stdout()))?;
    terminal.clear()?;

    let mut fullscreen = TerminalFullscreen::default();
    let size = terminal.size()?;
    let surface = service.config().surface_size(size.width, size.height);

    // One session per console connection; reconnect until told to stop.
    while service.is_running() {
        let mut renderer = RemoteRenderer::new(surface);
        terminal.draw(|f| view::draw(f, &renderer))?;

        let mut conn = tokio::select! {
            conn = service.connect() => match conn {
                Ok(conn) => conn,
                Err(_) => break,
            },
            _ = wait_for_quit(&mut input_rx) => break,
        };

        let end = service
            .serve(&mut conn, &mut renderer, &mut fullscreen, &mut input_rx, |r| {
                if let Err(e) = terminal.draw(|f| view::draw(f, r)) {
                    warn!("draw failed: {e}");
                }
            })
            .await;
        match end {
            Ok(SessionEnd::ControlClosed) => info!("console gone; reconnecting"),
            Ok(SessionEnd::Quit | SessionEnd::Stopped) => break,
            Err(e) => warn!("session ended: {e}; reconnecting"),
        }
    }

    // Restore terminal
    crossterm::terminal::disable_raw_mode()?;
    crossterm::execute!(
        std::io::stdout(),
        crossterm::cursor::Show,
        crossterm::terminal::LeaveAlternateScreen
    )?;
    info!("lumen-projector exited");
    Ok(())
}
