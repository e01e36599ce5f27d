//! Persistence sink for settings and the working playlist.
//!
//! Everything is loaded once at start-up and written back after each
//! mutation. Writes are fire-and-forget: a failed write is logged and
//! never reaches the operator.
//!
//! Each file has one writer task. Saves queue up behind it, only the
//! newest pending save is written, and every write goes to a temporary
//! file that is renamed over the target, so the file on disk always
//! holds one complete save.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::error::LumenError;
use crate::settings::PersistedSettings;

/// The working list as stored: item ids plus the legacy playlist fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PersistedPlaylist {
    pub item_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<u32>,
    #[serde(rename = "loop")]
    pub loop_playlist: bool,
}

#[async_trait]
pub trait SettingsStore: Send {
    /// `Ok(None)` when nothing has been stored yet.
    fn load_settings(&self) -> Result<Option<PersistedSettings>, LumenError>;
    fn save_settings(&mut self, settings: &PersistedSettings);

    fn load_playlist(&self) -> Result<Option<PersistedPlaylist>, LumenError>;
    fn save_playlist(&mut self, playlist: &PersistedPlaylist);

    /// Wait until every save so far has reached its destination.
    async fn flush(&mut self) {}
}

// ── JsonFileStore ────────────────────────────────────────────────

enum WriteJob {
    Save(Vec<u8>),
    Flush(oneshot::Sender<()>),
}

/// Serialized writes to one file.
#[derive(Debug)]
struct FileWriter {
    path: PathBuf,
    jobs: Option<mpsc::UnboundedSender<WriteJob>>,
}

impl FileWriter {
    fn new(path: PathBuf) -> Self {
        Self { path, jobs: None }
    }

    /// Start the writer task on first use inside a runtime. Returns
    /// `false` when there is no runtime to run it on.
    fn ensure_writer(&mut self) -> bool {
        if self.jobs.as_ref().is_some_and(|tx| !tx.is_closed()) {
            return true;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return false;
        };
        let (tx, rx) = mpsc::unbounded_channel();
        handle.spawn(write_loop(self.path.clone(), rx));
        self.jobs = Some(tx);
        true
    }

    fn save(&mut self, bytes: Vec<u8>) {
        if self.ensure_writer() {
            if let Some(jobs) = &self.jobs {
                if jobs.send(WriteJob::Save(bytes)).is_err() {
                    warn!("writer for {} is gone", self.path.display());
                }
            }
            return;
        }
        if let Err(e) = replace_file(&self.path, &bytes) {
            warn!("failed to write {}: {e}", self.path.display());
        }
    }

    async fn flush(&mut self) {
        let Some(jobs) = self.jobs.as_ref() else {
            return;
        };
        let (done_tx, done_rx) = oneshot::channel();
        if jobs.send(WriteJob::Flush(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }
}

async fn write_loop(path: PathBuf, mut jobs: mpsc::UnboundedReceiver<WriteJob>) {
    while let Some(job) = jobs.recv().await {
        let mut latest = None;
        let mut waiters = Vec::new();
        for job in std::iter::once(job).chain(std::iter::from_fn(|| jobs.try_recv().ok())) {
            match job {
                WriteJob::Save(bytes) => latest = Some(bytes),
                WriteJob::Flush(done) => waiters.push(done),
            }
        }
        if let Some(bytes) = latest {
            let target = path.clone();
            let written = tokio::task::spawn_blocking(move || replace_file(&target, &bytes)).await;
            match written {
                Ok(Ok(())) => debug!("persisted {}", path.display()),
                Ok(Err(e)) => warn!("failed to write {}: {e}", path.display()),
                Err(e) => warn!("writer for {} panicked: {e}", path.display()),
            }
        }
        for done in waiters {
            let _ = done.send(());
        }
    }
}

/// Write `bytes` beside `path` and rename it into place.
fn replace_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)
}

/// Two JSON files on disk.
#[derive(Debug)]
pub struct JsonFileStore {
    settings: FileWriter,
    playlist: FileWriter,
}

impl JsonFileStore {
    pub fn new(settings_path: impl Into<PathBuf>, playlist_path: impl Into<PathBuf>) -> Self {
        Self {
            settings: FileWriter::new(settings_path.into()),
            playlist: FileWriter::new(playlist_path.into()),
        }
    }

    fn read<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Option<T>, LumenError> {
        match std::fs::read(path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn encode<T: Serialize>(path: &Path, value: &T) -> Option<Vec<u8>> {
        match serde_json::to_vec_pretty(value) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!("cannot encode {}: {e}", path.display());
                None
            }
        }
    }
}

#[async_trait]
impl SettingsStore for JsonFileStore {
    fn load_settings(&self) -> Result<Option<PersistedSettings>, LumenError> {
        Self::read(&self.settings.path)
    }

    fn save_settings(&mut self, settings: &PersistedSettings) {
        if let Some(bytes) = Self::encode(&self.settings.path, settings) {
            self.settings.save(bytes);
        }
    }

    fn load_playlist(&self) -> Result<Option<PersistedPlaylist>, LumenError> {
        Self::read(&self.playlist.path)
    }

    fn save_playlist(&mut self, playlist: &PersistedPlaylist) {
        if let Some(bytes) = Self::encode(&self.playlist.path, playlist) {
            self.playlist.save(bytes);
        }
    }

    async fn flush(&mut self) {
        self.settings.flush().await;
        self.playlist.flush().await;
    }
}

// ── MemoryStore ──────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Stored {
    settings: Option<PersistedSettings>,
    playlist: Option<PersistedPlaylist>,
    writes: usize,
}

/// In-memory store. Clones share the same contents, so a test can keep
/// one handle and give another to the engine.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Stored>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn settings(&self) -> Option<PersistedSettings> {
        self.lock().settings.clone()
    }

    pub fn playlist(&self) -> Option<PersistedPlaylist> {
        self.lock().playlist.clone()
    }

    /// Number of saves so far.
    pub fn writes(&self) -> usize {
        self.lock().writes
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Stored> {
        // A poisoned lock only means a test panicked mid-save.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    fn load_settings(&self) -> Result<Option<PersistedSettings>, LumenError> {
        Ok(self.settings())
    }

    fn save_settings(&mut self, settings: &PersistedSettings) {
        let mut stored = self.lock();
        stored.settings = Some(settings.clone());
        stored.writes += 1;
    }

    fn load_playlist(&self) -> Result<Option<PersistedPlaylist>, LumenError> {
        Ok(self.playlist())
    }

    fn save_playlist(&mut self, playlist: &PersistedPlaylist) {
        let mut stored = self.lock();
        stored.playlist = Some(playlist.clone());
        stored.writes += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("lumen-store-{name}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn missing_files_load_as_none() {
        let dir = temp_dir("missing");
        let store = JsonFileStore::new(dir.join("nope.json"), dir.join("nope2.json"));
        assert!(store.load_settings().unwrap().is_none());
        assert!(store.load_playlist().unwrap().is_none());
    }

    #[test]
    fn file_store_writes_synchronously_outside_runtime() {
        let dir = temp_dir("sync");
        let mut store = JsonFileStore::new(dir.join("settings.json"), dir.join("playlist.json"));
        let playlist = PersistedPlaylist {
            item_ids: vec!["a".into(), "b".into()],
            interval: Some(4),
            loop_playlist: true,
        };
        store.save_playlist(&playlist);
        assert_eq!(store.load_playlist().unwrap(), Some(playlist));

        let raw = std::fs::read_to_string(dir.join("playlist.json")).unwrap();
        assert!(raw.contains("\"loop\": true"));
        assert!(raw.contains("itemIds"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn burst_of_saves_leaves_the_last_one() {
        let dir = temp_dir("burst");
        let mut store = JsonFileStore::new(dir.join("settings.json"), dir.join("playlist.json"));
        for round in 0..10 {
            // Longest first so a stale write would leave trailing bytes.
            for len in (1..=20).rev() {
                store.save_playlist(&PersistedPlaylist {
                    item_ids: (0..len * 10).map(|i| format!("item-{round}-{i}")).collect(),
                    interval: None,
                    loop_playlist: false,
                });
            }
            store.flush().await;
            let stored = store.load_playlist().unwrap().unwrap();
            assert_eq!(stored.item_ids.len(), 10, "round {round}");
            assert_eq!(stored.item_ids[0], format!("item-{round}-0"));
        }
        assert!(!dir.join("playlist.json.tmp").exists());
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = temp_dir("corrupt");
        std::fs::write(dir.join("settings.json"), b"{not json").unwrap();
        let store = JsonFileStore::new(dir.join("settings.json"), dir.join("p.json"));
        assert!(store.load_settings().is_err());
    }

    #[test]
    fn memory_store_clones_share_contents() {
        let shared = MemoryStore::new();
        let mut store = shared.clone();
        store.save_settings(&PersistedSettings::default());
        assert_eq!(shared.writes(), 1);
        assert!(shared.settings().is_some());
    }
}
