//! Configuration for the projector.

use std::path::Path;

use lumen_core::RetrySchedule;
use serde::{Deserialize, Serialize};

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectorConfig {
    /// Network settings.
    pub network: NetworkConfig,
    /// Surface geometry.
    pub display: DisplayConfig,
    /// Fullscreen retry policy.
    pub fullscreen: FullscreenConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Control console address (`host:port`).
    pub control_address: String,
    /// Pause between connection attempts, in milliseconds.
    pub reconnect_delay_ms: u64,
}

/// Surface geometry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Pixel width of one terminal cell, for text auto-fit.
    pub cell_width_px: u32,
    /// Pixel height of one terminal cell.
    pub cell_height_px: u32,
}

/// Fullscreen retry policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FullscreenConfig {
    /// Delay before each attempt, in milliseconds.
    pub retry_delays_ms: Vec<u64>,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
    /// Log file path. The terminal belongs to the surface.
    pub file: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            control_address: "127.0.0.1:7440".into(),
            reconnect_delay_ms: 1_000,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            cell_width_px: 8,
            cell_height_px: 16,
        }
    }
}

impl Default for FullscreenConfig {
    fn default() -> Self {
        Self {
            retry_delays_ms: vec![0, 150, 400, 1000, 2500],
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            file: "lumen-projector.log".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl ProjectorConfig {
    /// Load configuration from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Write the default configuration to a file (for bootstrapping).
    pub fn write_default(path: &Path) -> std::io::Result<()> {
        let text = toml::to_string_pretty(&Self::default()).map_err(std::io::Error::other)?;
        std::fs::write(path, text)
    }

    /// An empty list still makes one immediate attempt.
    pub fn retry_schedule(&self) -> RetrySchedule {
        if self.fullscreen.retry_delays_ms.is_empty() {
            RetrySchedule::from_millis(&[0])
        } else {
            RetrySchedule::from_millis(&self.fullscreen.retry_delays_ms)
        }
    }

    /// Surface size in pixels for a terminal of `cols` x `rows`.
    pub fn surface_size(&self, cols: u16, rows: u16) -> (u32, u32) {
        (
            u32::from(cols) * self.display.cell_width_px.max(1),
            u32::from(rows) * self.display.cell_height_px.max(1),
        )
    }
}

// ── Tests ────────────────────────────────────────────────────────
