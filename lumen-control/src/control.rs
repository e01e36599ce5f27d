//! Lumen control: engine task and command dispatcher.
//!
//! `Controller` owns the [`Engine`], turns console lines into
//! [`OperatorCommand`]s, serves the projector's back-channel and fires
//! auto-advance deadlines. Everything the console shows is relayed
//! through an `mpsc::UnboundedSender<ControlEvent>`.
//!
//! Opening the projector runs beside the loop: while the opener waits
//! for the projector to connect, commands, back-channel messages and
//! deadlines are still served.

use lumen_core::{Engine, OpenOutcome, OperatorCommand, PendingOpen, scheduler};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::app::ControlEvent;

pub struct Controller {
    engine: Engine,
    ui_tx: mpsc::UnboundedSender<ControlEvent>,
    opening: Option<PendingOpen>,
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("engine", &self.engine)
            .field("opening", &self.opening.is_some())
            .finish()
    }
}

impl Controller {
    pub fn new(engine: Engine, ui_tx: mpsc::UnboundedSender<ControlEvent>) -> Self {
        Self {
            engine,
            ui_tx,
            opening: None,
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    fn log(&self, line: impl Into<String>) {
        let _ = self.ui_tx.send(ControlEvent::Log(line.into()));
    }

    fn publish_status(&self) {
        let _ = self
            .ui_tx
            .send(ControlEvent::Status(Box::new(self.engine.status())));
    }

    /// Send the catalog ids so the console can list and complete them.
    pub fn publish_catalog(&self) {
        let ids = self
            .engine
            .catalog()
            .items()
            .iter()
            .map(|item| item.id.clone())
            .collect();
        let _ = self.ui_tx.send(ControlEvent::Catalog(ids));
    }

    /// Parse and apply one console line.
    pub async fn execute_command(&mut self, line: &str) {
        let cmd = match line.parse::<OperatorCommand>() {
            Ok(cmd) => cmd,
            Err(e) => {
                self.log(format!("- {e}"));
                return;
            }
        };
        if cmd == OperatorCommand::OpenSurface {
            if self.opening.is_some() {
                self.log("- projector is already opening");
                return;
            }
            self.opening = self.engine.begin_open_surface();
            if self.opening.is_some() {
                self.log("- opening projector...");
            }
            return;
        }
        match self.engine.apply(cmd).await {
            Ok(()) => {
                if let Some(reason) = self.engine.schedule_warning() {
                    self.log(format!("- auto-advance off: {reason}"));
                }
            }
            Err(e) => {
                warn!("command '{line}' failed: {e}");
                self.log(format!("- {e}"));
            }
        }
    }

    /// Wait for the projector to open, if an open is in flight.
    pub async fn finish_open(&mut self) {
        if let Some(pending) = self.opening.as_mut() {
            let outcome = pending.await;
            self.opened(outcome);
        }
    }

    fn opened(&mut self, outcome: OpenOutcome) {
        self.opening = None;
        match self.engine.finish_open_surface(outcome) {
            Ok(()) => self.log("- projector connected; waiting for ready"),
            Err(e) => {
                warn!("open failed: {e}");
                self.log(format!("- {e}"));
            }
        }
    }

    /// Drive the engine until the console hangs up.
    pub async fn run(mut self, mut cmd_rx: mpsc::UnboundedReceiver<String>) {
        self.publish_catalog();
        loop {
            self.publish_status();
            let deadline = self.engine.advance_deadline();

            tokio::select! {
                line = cmd_rx.recv() => match line {
                    Some(line) => self.execute_command(&line).await,
                    None => break,
                },

                message = self.engine.next_remote_message() => match message {
                    Some(message) => self.engine.handle_remote(message),
                    None => self.log("- projector disconnected"),
                },

                outcome = wait_for_open(&mut self.opening) => self.opened(outcome),

                _ = scheduler::sleep_until(deadline) => self.engine.on_deadline(),
            }
        }
        self.opening = None;
        self.engine.shutdown().await;
        info!("controller stopped");
    }
}

/// Resolves with the outcome of the open in flight; pending forever
/// when there is none.
async fn wait_for_open(opening: &mut Option<PendingOpen>) -> OpenOutcome {
    match opening {
        Some(pending) => pending.await,
        None => std::future::pending().await,
    }
}
