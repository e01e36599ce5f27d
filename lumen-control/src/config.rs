//! Control surface configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Network settings.
    pub network: NetworkConfig,
    /// How the projector is started.
    pub projector: ProjectorConfig,
    /// Where state lives on disk.
    pub storage: StorageConfig,
    /// Initial playback settings.
    pub playback: PlaybackConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Address the projector connects to.
    pub listen_address: String,
    /// How long to wait for the projector after opening, in milliseconds.
    pub connect_timeout_ms: u64,
}

/// Projector launch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectorConfig {
    /// Launch the projector process when the surface is opened. When
    /// false, a projector started by hand is expected to connect.
    pub auto_launch: bool,
    /// Program to run.
    pub command: String,
    /// Arguments; `{address}` is replaced with the listen address.
    pub args: Vec<String>,
    /// Open the surface as soon as the console starts.
    pub open_on_start: bool,
}

/// Storage paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON array of playable items.
    pub catalog: PathBuf,
    /// Persisted display and playback settings.
    pub settings: PathBuf,
    /// Persisted working playlist.
    pub playlist: PathBuf,
}

/// Playback defaults, used until the operator sets them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Seconds per slide. 0 leaves it unset.
    pub slide_duration: u32,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
    /// Log file path. The terminal belongs to the console UI.
    pub file: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            listen_address: "127.0.0.1:7440".into(),
            connect_timeout_ms: 10_000,
        }
    }
}

impl Default for ProjectorConfig {
    fn default() -> Self {
        Self {
            auto_launch: false,
            command: "lumen-projector".into(),
            args: vec!["--address".into(), "{address}".into()],
            open_on_start: true,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            catalog: "catalog.json".into(),
            settings: "lumen-settings.json".into(),
            playlist: "lumen-playlist.json".into(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            file: "lumen-control.log".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl ControlConfig {
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

    pub fn default_slide_duration(&self) -> Option<u32> {
        Some(self.playback.slide_duration).filter(|s| *s > 0)
    }

    /// Projector arguments with placeholders filled in.
    pub fn projector_args(&self) -> Vec<String> {
        self.projector
            .args
            .iter()
            .map(|a| a.replace("{address}", &self.network.listen_address))
            .collect()
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let text = toml::to_string_pretty(&ControlConfig::default()).unwrap();
        assert!(text.contains("listen_address"));
        assert!(text.contains("slide_duration"));
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let cfg: ControlConfig = toml::from_str("[playback]\nslide_duration = 6\n").unwrap();
        assert_eq!(cfg.default_slide_duration(), Some(6));
        assert_eq!(cfg.network.listen_address, "127.0.0.1:7440");
    }

    #[test]
    fn zero_duration_is_unset() {
        assert_eq!(ControlConfig::default().default_slide_duration(), None);
    }

    #[test]
    fn projector_args_substitute_address() {
        let mut cfg = ControlConfig::default();
        cfg.network.listen_address = "0.0.0.0:9000".into();
        assert_eq!(cfg.projector_args(), ["--address", "0.0.0.0:9000"]);
    }

    #[test]
    fn missing_file_falls_back() {
        let cfg = ControlConfig::load(Path::new("/definitely/not/here.toml"));
        assert_eq!(cfg.logging.level, "info");
    }
}
