//! Working playlist vs. published snapshot.
//!
//! The operator edits the working list freely. While presented, the
//! remote surface only sees the published snapshot, which is replaced
//! wholesale by `update()`. Revisions make the gap between the two
//! visible without ever applying it automatically.

use tracing::debug;

use crate::error::EngineError;
use crate::item::PlayableItem;

// ── PublishedSnapshot ────────────────────────────────────────────

/// What is actually live while presented.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedSnapshot {
    items: Vec<PlayableItem>,
    index: usize,
    revision: u64,
}

impl PublishedSnapshot {
    pub fn items(&self) -> &[PlayableItem] {
        &self.items
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Working revision at the moment of the last copy.
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

/// Identity of the list the remote surface is driven from.
///
/// Changes whenever a different list becomes active: presenting,
/// updating, or any structural edit while in pass-through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListIdentity {
    pub presented: bool,
    pub revision: u64,
}

// ── PlaylistStaging ──────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct PlaylistStaging {
    working: Vec<PlayableItem>,
    working_index: usize,
    working_revision: u64,

    published: Option<PublishedSnapshot>,

    /// Legacy per-playlist slide interval in seconds.
    interval: Option<u32>,
    /// Legacy per-playlist loop flag.
    loop_playlist: bool,
}

impl PlaylistStaging {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Accessors ────────────────────────────────────────────────

    pub fn working(&self) -> &[PlayableItem] {
        &self.working
    }

    pub fn working_index(&self) -> usize {
        self.working_index
    }

    pub fn working_revision(&self) -> u64 {
        self.working_revision
    }

    pub fn published(&self) -> Option<&PublishedSnapshot> {
        self.published.as_ref()
    }

    /// Revision of the published snapshot. Tracks the working revision
    /// while nothing is presented.
    pub fn published_revision(&self) -> u64 {
        self.published
            .as_ref()
            .map_or(self.working_revision, |p| p.revision)
    }

    pub fn is_presented(&self) -> bool {
        self.published.is_some()
    }

    /// Whether the working list has edits the remote surface has not seen.
    pub fn is_stale(&self) -> bool {
        self.staleness() > 0
    }

    /// Number of structural edits since the last publish.
    pub fn staleness(&self) -> u64 {
        self.working_revision - self.published_revision()
    }

    pub fn interval(&self) -> Option<u32> {
        self.interval
    }

    pub fn set_interval(&mut self, seconds: Option<u32>) {
        self.interval = seconds;
    }

    pub fn loops(&self) -> bool {
        self.loop_playlist
    }

    pub fn set_loop(&mut self, on: bool) {
        self.loop_playlist = on;
    }

    // ── Active list ──────────────────────────────────────────────

    /// The list the remote surface is driven from.
    pub fn active_items(&self) -> &[PlayableItem] {
        match &self.published {
            Some(p) => &p.items,
            None => &self.working,
        }
    }

    pub fn active_index(&self) -> usize {
        match &self.published {
            Some(p) => p.index,
            None => self.working_index,
        }
    }

    fn active_index_mut(&mut self) -> &mut usize {
        match &mut self.published {
            Some(p) => &mut p.index,
            None => &mut self.working_index,
        }
    }

    /// The active item, with the index clamped into range.
    pub fn active_item(&self) -> Option<&PlayableItem> {
        let items = self.active_items();
        let last = items.len().checked_sub(1)?;
        items.get(self.active_index().min(last))
    }

    pub fn list_identity(&self) -> ListIdentity {
        ListIdentity {
            presented: self.is_presented(),
            revision: self.published_revision(),
        }
    }

    // ── Structural edits ─────────────────────────────────────────

    fn bump(&mut self) {
        self.working_revision += 1;
        self.working_index = clamp(self.working_index, self.working.len());
    }

    /// Replace the working list.
    pub fn stage(&mut self, items: Vec<PlayableItem>) {
        self.working = items;
        self.bump();
        debug!(
            len = self.working.len(),
            revision = self.working_revision,
            "working list staged"
        );
    }

    pub fn add(&mut self, item: PlayableItem) {
        self.working.push(item);
        self.bump();
    }

    pub fn remove(&mut self, index: usize) -> Result<PlayableItem, EngineError> {
        self.check_working(index)?;
        let item = self.working.remove(index);
        if index < self.working_index {
            self.working_index -= 1;
        }
        self.bump();
        Ok(item)
    }

    /// Move the item at `from` to position `to`.
    pub fn reorder(&mut self, from: usize, to: usize) -> Result<(), EngineError> {
        self.check_working(from)?;
        self.check_working(to)?;
        let item = self.working.remove(from);
        self.working.insert(to, item);
        self.bump();
        Ok(())
    }

    /// Reset the working list and tear down any presentation.
    pub fn clear(&mut self) {
        self.working.clear();
        self.published = None;
        self.bump();
    }

    fn check_working(&self, index: usize) -> Result<(), EngineError> {
        if index < self.working.len() {
            Ok(())
        } else {
            Err(EngineError::IndexOutOfRange {
                index,
                len: self.working.len(),
            })
        }
    }

    // ── Publishing ───────────────────────────────────────────────

    /// Copy the working list into a fresh snapshot.
    pub fn present(&mut self) -> Result<(), EngineError> {
        if self.working.is_empty() {
            return Err(EngineError::EmptyPlaylist);
        }
        let index = if self.working_index < self.working.len() {
            self.working_index
        } else {
            0
        };
        self.published = Some(PublishedSnapshot {
            items: self.working.clone(),
            index,
            revision: self.working_revision,
        });
        Ok(())
    }

    /// Re-copy the working list, keeping the published position where
    /// possible.
    pub fn update(&mut self) -> Result<(), EngineError> {
        let Some(published) = self.published.as_mut() else {
            return Err(EngineError::NotPresented);
        };
        if self.working.is_empty() {
            return Err(EngineError::EmptyPlaylist);
        }
        published.items = self.working.clone();
        published.index = published.index.min(self.working.len() - 1);
        published.revision = self.working_revision;
        Ok(())
    }

    /// Drop the snapshot; the working list is kept.
    pub fn unpublish(&mut self) {
        self.published = None;
    }

    // ── Navigation ───────────────────────────────────────────────

    pub fn select(&mut self, index: usize) -> Result<(), EngineError> {
        let len = self.active_items().len();
        if index >= len {
            return Err(EngineError::IndexOutOfRange { index, len });
        }
        *self.active_index_mut() = index;
        Ok(())
    }

    /// Step forward; holds at the last item. Returns whether it moved.
    pub fn next(&mut self) -> bool {
        let len = self.active_items().len();
        let index = self.active_index_mut();
        if *index + 1 < len {
            *index += 1;
            true
        } else {
            false
        }
    }

    /// Step back; never goes below 0. Returns whether it moved.
    pub fn previous(&mut self) -> bool {
        let index = self.active_index_mut();
        if *index > 0 {
            *index -= 1;
            true
        } else {
            false
        }
    }

    /// Auto-advance step: forward one, or wrap to 0 at the end when
    /// `repeat_all` or the legacy loop flag is set.
    pub fn advance(&mut self, repeat_all: bool) -> bool {
        if self.next() {
            return true;
        }
        let wraps = repeat_all || self.loop_playlist;
        let index = self.active_index_mut();
        if wraps && *index != 0 {
            *index = 0;
            true
        } else {
            false
        }
    }

    /// Record an intrinsic duration on every copy of the item. Returns
    /// whether anything changed.
    pub fn record_duration(&mut self, id: &str, seconds: f64) -> bool {
        let published = self
            .published
            .iter_mut()
            .flat_map(|p| p.items.iter_mut());
        let mut changed = false;
        for item in self.working.iter_mut().chain(published) {
            if item.id == id && item.duration.is_none() {
                item.duration = Some(seconds);
                changed = true;
            }
        }
        changed
    }
}

fn clamp(index: usize, len: usize) -> usize {
    index.min(len.saturating_sub(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn images(n: usize) -> Vec<PlayableItem> {
        (0..n)
            .map(|i| PlayableItem::image(format!("img{i}"), format!("{i}.png")))
            .collect()
    }

    #[test]
    fn stage_passes_through_while_not_presented() {
        let mut s = PlaylistStaging::new();
        s.stage(images(3));
        s.select(2).unwrap();
        assert_eq!(s.active_item().unwrap().id, "img2");

        s.stage(images(2));
        assert_eq!(s.active_item().unwrap().id, "img1");
        assert!(!s.is_stale());
    }

    #[test]
    fn present_on_empty_list_is_rejected() {
        let mut s = PlaylistStaging::new();
        assert_eq!(s.present(), Err(EngineError::EmptyPlaylist));
        assert!(!s.is_presented());
    }

    #[test]
    fn staging_after_present_is_stale_until_update() {
        let mut s = PlaylistStaging::new();
        s.stage(images(3));
        s.present().unwrap();
        assert!(!s.is_stale());

        s.stage(vec![PlayableItem::text("t", "new")]);
        assert!(s.is_stale());
        assert_eq!(s.staleness(), 1);
        assert_eq!(s.active_item().unwrap().id, "img0");

        s.update().unwrap();
        assert!(!s.is_stale());
        assert_eq!(s.active_item().unwrap().id, "t");
    }

    #[test]
    fn update_clamps_to_last_index() {
        let mut s = PlaylistStaging::new();
        s.stage(images(5));
        s.present().unwrap();
        s.select(4).unwrap();

        s.stage(images(2));
        s.update().unwrap();
        assert_eq!(s.active_index(), 1);
    }

    #[test]
    fn update_requires_presentation_and_items() {
        let mut s = PlaylistStaging::new();
        s.stage(images(1));
        assert_eq!(s.update(), Err(EngineError::NotPresented));

        s.present().unwrap();
        s.stage(Vec::new());
        assert_eq!(s.update(), Err(EngineError::EmptyPlaylist));
        assert_eq!(s.published().unwrap().items().len(), 1);
    }

    #[test]
    fn clear_resets_presentation() {
        let mut s = PlaylistStaging::new();
        s.stage(images(3));
        s.present().unwrap();
        s.clear();
        assert!(!s.is_presented());
        assert!(s.working().is_empty());
        assert_eq!(s.published_revision(), s.working_revision());
        assert!(s.active_item().is_none());
    }

    #[test]
    fn next_holds_at_end_and_previous_at_start() {
        let mut s = PlaylistStaging::new();
        s.stage(images(2));
        assert!(!s.previous());
        assert!(s.next());
        assert!(!s.next());
        assert_eq!(s.active_index(), 1);
    }

    #[test]
    fn advance_wraps_only_when_repeating() {
        let mut s = PlaylistStaging::new();
        s.stage(images(2));
        s.select(1).unwrap();
        assert!(!s.advance(false));
        assert!(s.advance(true));
        assert_eq!(s.active_index(), 0);

        s.select(1).unwrap();
        s.set_loop(true);
        assert!(s.advance(false));
        assert_eq!(s.active_index(), 0);
    }

    #[test]
    fn remove_keeps_the_current_item_selected() {
        let mut s = PlaylistStaging::new();
        s.stage(images(3));
        s.select(2).unwrap();
        s.remove(0).unwrap();
        assert_eq!(s.active_item().unwrap().id, "img2");
        assert!(matches!(
            s.remove(9),
            Err(EngineError::IndexOutOfRange { index: 9, len: 2 })
        ));
    }

    #[test]
    fn reorder_moves_item() {
        let mut s = PlaylistStaging::new();
        s.stage(images(3));
        s.reorder(0, 2).unwrap();
        let ids: Vec<_> = s.working().iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["img1", "img2", "img0"]);
    }

    #[test]
    fn list_identity_changes_on_publish() {
        let mut s = PlaylistStaging::new();
        s.stage(images(2));
        let before = s.list_identity();
        s.present().unwrap();
        let presented = s.list_identity();
        assert_ne!(before.presented, presented.presented);

        s.add(PlayableItem::image("x", "x.png"));
        assert_eq!(s.list_identity(), presented);
        s.update().unwrap();
        assert_ne!(s.list_identity(), presented);
    }

    #[test]
    fn record_duration_touches_both_lists_once() {
        let mut s = PlaylistStaging::new();
        s.stage(vec![PlayableItem::video("v", "v.mp4")]);
        s.present().unwrap();
        assert!(s.record_duration("v", 8.0));
        assert!(!s.record_duration("v", 9.0));
        assert_eq!(s.working()[0].duration, Some(8.0));
        assert_eq!(s.published().unwrap().items()[0].duration, Some(8.0));
    }
}
