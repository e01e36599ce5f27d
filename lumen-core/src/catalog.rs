//! Read-only view of the gallery: playable items by id.

use std::collections::HashMap;
use std::path::Path;

use tracing::{info, warn};

use crate::error::{EngineError, LumenError};
use crate::item::{self, PlayableItem};

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    items: Vec<PlayableItem>,
    by_id: HashMap<String, usize>,
}

impl Catalog {
    /// Build from gallery entries. Unplayable entries are skipped.
    pub fn new(entries: Vec<PlayableItem>) -> Self {
        let mut items = Vec::with_capacity(entries.len());
        let mut by_id = HashMap::with_capacity(entries.len());
        for mut entry in entries {
            if let Some(seconds) = entry.duration.filter(|s| item::media_duration(*s).is_none()) {
                warn!(id = %entry.id, seconds, "ignoring unusable catalog duration");
                entry.duration = None;
            }
            if let Some(problem) = entry.problem() {
                warn!(id = %entry.id, "skipping catalog entry: {problem}");
                continue;
            }
            if by_id.insert(entry.id.clone(), items.len()).is_some() {
                warn!(id = %entry.id, "duplicate catalog id; later entry wins");
            }
            items.push(entry);
        }
        Self { items, by_id }
    }

    /// Load a JSON array of items.
    pub fn load(path: &Path) -> Result<Self, LumenError> {
        let bytes = std::fs::read(path)?;
        let items: Vec<PlayableItem> = serde_json::from_slice(&bytes)?;
        info!(count = items.len(), "catalog loaded from {}", path.display());
        Ok(Self::new(items))
    }

    pub fn items(&self) -> &[PlayableItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&PlayableItem> {
        self.by_id.get(id).map(|&i| &self.items[i])
    }

    pub fn lookup(&self, id: &str) -> Result<PlayableItem, EngineError> {
        self.get(id)
            .cloned()
            .ok_or_else(|| EngineError::UnknownItem(id.to_string()))
    }

    /// Resolve ids in order. Unknown ids are skipped and returned
    /// separately.
    pub fn resolve<'a, I>(&self, ids: I) -> (Vec<PlayableItem>, Vec<String>)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut found = Vec::new();
        let mut missing = Vec::new();
        for id in ids {
            match self.get(id) {
                Some(item) => found.push(item.clone()),
                None => missing.push(id.to_string()),
            }
        }
        (found, missing)
    }

    /// Cache an intrinsic duration discovered at runtime. Unusable
    /// values are ignored.
    pub fn record_duration(&mut self, id: &str, seconds: f64) {
        if item::media_duration(seconds).is_none() {
            return;
        }
        if let Some(&i) = self.by_id.get(id) {
            self.items[i].duration.get_or_insert(seconds);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog::new(vec![
            PlayableItem::image("a", "a.png"),
            PlayableItem::video("b", "b.mp4"),
            PlayableItem::text("c", "Hello"),
        ])
    }

    #[test]
    fn resolve_keeps_order_and_reports_missing() {
        let (items, missing) = catalog().resolve(["c", "zz", "a"]);
        let ids: Vec<_> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["c", "a"]);
        assert_eq!(missing, ["zz"]);
    }

    #[test]
    fn lookup_unknown_is_an_error() {
        assert_eq!(
            catalog().lookup("nope"),
            Err(EngineError::UnknownItem("nope".into()))
        );
    }

    #[test]
    fn load_from_json_file() {
        let path = std::env::temp_dir().join(format!("lumen-catalog-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"[{"id":"x","type":"image","url":"x.png"},{"id":"y","type":"audio","url":"y.mp3","duration":30}]"#,
        )
        .unwrap();
        let catalog = Catalog::load(&path).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get("y").unwrap().duration, Some(30.0));
    }

    #[test]
    fn oversized_catalog_durations_are_dropped() {
        let c: Vec<PlayableItem> = serde_json::from_str(
            r#"[{"id":"v","type":"video","url":"v.mp4","duration":1e300}]"#,
        )
        .unwrap();
        let mut c = Catalog::new(c);
        assert_eq!(c.get("v").unwrap().duration, None);
        assert_eq!(c.get("v").unwrap().intrinsic_duration(), None);

        c.record_duration("v", 1e30);
        assert_eq!(c.get("v").unwrap().duration, None);
        c.record_duration("v", 42.0);
        assert_eq!(c.get("v").unwrap().duration, Some(42.0));
    }

    #[test]
    fn unplayable_entries_are_skipped() {
        let c = Catalog::new(vec![
            PlayableItem::image("ok", "ok.png"),
            PlayableItem::image("broken", ""),
        ]);
        assert_eq!(c.len(), 1);
        assert!(c.get("broken").is_none());
    }

    #[test]
    fn recorded_duration_is_kept_once() {
        let mut c = catalog();
        c.record_duration("b", 10.0);
        c.record_duration("b", 99.0);
        assert_eq!(c.get("b").unwrap().duration, Some(10.0));
    }
}
