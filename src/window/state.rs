//! Window Set registry for StealthPad
//!
//! The registry owns the in-memory state of every open note window and
//! keeps the persisted store consistent with it after each creation and
//! closure. It is an explicit owned object so it can be constructed and
//! exercised without the process global; the window procedures reach it
//! through the `once_cell` accessor below.

use log::warn;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::Config;
use crate::store::{Bounds, BoundsStore};
use crate::zorder::ZOrderSequence;

/// Lifecycle phase of a note window
///
/// Created -> Shown -> {Focused, Unfocused} -> Closed; bounds persistence
/// hangs off move/resize while in the shown phases, store removal off the
/// transition into Closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowPhase {
    Created,
    Shown,
    Focused,
    Unfocused,
    Closed,
}

/// One live note window
#[derive(Debug)]
pub struct NoteWindow {
    pub note_id: String,
    /// HWND stored as isize for Send + Sync
    pub hwnd: isize,
    pub bounds: Bounds,
    /// Focus-recency stamp; higher = more recently focused
    pub z_order: u64,
    pub opacity: f64,
    pub always_on_top: bool,
    pub stealth: bool,
    pub phase: WindowPhase,
    /// Content collaborator window, captured from its first inbound message
    pub content_hwnd: isize,
    pub note_id_sent: bool,
}

/// Ordered collection of open note windows plus their durable backing
pub struct NoteRegistry {
    windows: Vec<NoteWindow>,
    zorder: ZOrderSequence,
    store: BoundsStore,
    config: Arc<Config>,
}

impl NoteRegistry {
    pub fn new(store: BoundsStore, config: Arc<Config>) -> Self {
        Self {
            windows: Vec::new(),
            zorder: ZOrderSequence::new(),
            store,
            config,
        }
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    pub fn store(&self) -> &BoundsStore {
        &self.store
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn windows(&self) -> &[NoteWindow] {
        &self.windows
    }

    pub fn get(&self, hwnd: isize) -> Option<&NoteWindow> {
        self.windows.iter().find(|w| w.hwnd == hwnd)
    }

    pub fn get_mut(&mut self, hwnd: isize) -> Option<&mut NoteWindow> {
        self.windows.iter_mut().find(|w| w.hwnd == hwnd)
    }

    /// Note ids of the current Window Set, in insertion order
    pub fn note_ids(&self) -> Vec<String> {
        self.windows.iter().map(|w| w.note_id.clone()).collect()
    }

    /// Ordinal tray labels for the current Window Set
    pub fn labels(&self) -> Vec<String> {
        (1..=self.windows.len())
            .map(|n| format!("Note {}", n))
            .collect()
    }

    /// Generate a fresh note id from the current time, de-duplicated
    /// against the open set (two notes can be created within one tick)
    pub fn fresh_note_id(&self) -> String {
        let base = chrono::Utc::now().timestamp_millis().to_string();
        if self.windows.iter().all(|w| w.note_id != base) {
            return base;
        }
        let mut n = 1;
        loop {
            let candidate = format!("{}-{}", base, n);
            if self.windows.iter().all(|w| w.note_id != candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    /// Track a newly created window and persist its id in the note list
    pub fn insert(&mut self, note_id: String, hwnd: isize, bounds: Bounds) {
        let dimmed = self.config.appearance.dimmed_opacity;
        self.windows.push(NoteWindow {
            note_id,
            hwnd,
            bounds,
            z_order: 0,
            opacity: dimmed,
            always_on_top: true,
            stealth: false,
            phase: WindowPhase::Created,
            content_hwnd: 0,
            note_id_sent: false,
        });

        let persisted = self.store.note_ids();
        let ids = self.note_ids();
        let new_id = &self.windows.last().expect("just pushed").note_id;
        if !persisted.contains(new_id) {
            if let Err(e) = self.store.set_note_ids(&ids) {
                warn!("Failed to persist note-id list: {}", e);
            }
        }
    }

    /// Drop a closed window from the set and from the persisted store.
    /// Removing an unknown handle is a no-op, so a second close is safe.
    pub fn remove_by_hwnd(&mut self, hwnd: isize) -> Option<NoteWindow> {
        let idx = self.windows.iter().position(|w| w.hwnd == hwnd)?;
        let mut removed = self.windows.remove(idx);
        removed.phase = WindowPhase::Closed;

        let remaining = self.note_ids();
        if let Err(e) = self.store.remove_note(&removed.note_id, &remaining) {
            warn!("Failed to remove note {} from store: {}", removed.note_id, e);
        }
        Some(removed)
    }

    /// Record a move/resize and persist the bounds record. Redundant
    /// notifications for an unchanged rectangle skip the store write.
    pub fn update_bounds(&mut self, hwnd: isize, bounds: Bounds) {
        let Some(window) = self.windows.iter_mut().find(|w| w.hwnd == hwnd) else {
            return;
        };
        if window.bounds == bounds {
            return;
        }
        window.bounds = bounds;
        let note_id = window.note_id.clone();
        if let Err(e) = self.store.set_bounds(&note_id, bounds) {
            warn!("Failed to persist bounds for {}: {}", note_id, e);
        }
    }

    pub fn mark_shown(&mut self, hwnd: isize) {
        if let Some(w) = self.get_mut(hwnd) {
            if w.phase == WindowPhase::Created {
                w.phase = WindowPhase::Shown;
            }
        }
    }

    /// Stamp a window as most recently focused
    pub fn focus(&mut self, hwnd: isize) -> Option<u64> {
        let stamp = self.zorder.next_stamp();
        let w = self.windows.iter_mut().find(|w| w.hwnd == hwnd)?;
        w.z_order = stamp;
        w.phase = WindowPhase::Focused;
        Some(stamp)
    }

    pub fn blur(&mut self, hwnd: isize) {
        if let Some(w) = self.get_mut(hwnd) {
            w.phase = WindowPhase::Unfocused;
        }
    }

    /// Most recently focused live window
    pub fn top_window(&self) -> Option<&NoteWindow> {
        self.windows.iter().max_by_key(|w| w.z_order)
    }

    /// Remember the content collaborator behind a note window; returns the
    /// note id the first time content attaches so `note-id` can be sent once
    pub fn attach_content(&mut self, hwnd: isize, content_hwnd: isize) -> Option<String> {
        let w = self.windows.iter_mut().find(|w| w.hwnd == hwnd)?;
        w.content_hwnd = content_hwnd;
        if w.note_id_sent {
            None
        } else {
            w.note_id_sent = true;
            Some(w.note_id.clone())
        }
    }

    /// Content windows to notify on display topology changes
    pub fn content_windows(&self) -> Vec<isize> {
        self.windows
            .iter()
            .filter(|w| w.content_hwnd != 0)
            .map(|w| w.content_hwnd)
            .collect()
    }
}

// Global registry (thread-safe), set once during application startup
static REGISTRY: once_cell::sync::OnceCell<Arc<RwLock<NoteRegistry>>> =
    once_cell::sync::OnceCell::new();

// Set while the application is quitting so close-time handlers leave the
// persisted store untouched (every note must come back on next launch)
static QUITTING: AtomicBool = AtomicBool::new(false);

/// Get the global note registry
pub fn get_registry() -> Option<Arc<RwLock<NoteRegistry>>> {
    REGISTRY.get().cloned()
}

/// Set the global note registry (called during application startup)
pub fn set_registry(registry: Arc<RwLock<NoteRegistry>>) {
    let _ = REGISTRY.set(registry);
}

pub fn set_quitting() {
    QUITTING.store(true, Ordering::SeqCst);
}

pub fn is_quitting() -> bool {
    QUITTING.load(Ordering::SeqCst)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_registry() -> (tempfile::TempDir, NoteRegistry) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = BoundsStore::open(dir.path().join("store.json"));
        let registry = NoteRegistry::new(store, Arc::new(Config::default()));
        (dir, registry)
    }

    #[test]
    fn creations_keep_set_and_store_in_step() {
        let (_dir, mut reg) = test_registry();
        for i in 0..4 {
            reg.insert(format!("note-{}", i), 100 + i, Bounds::new(0, 0, 400, 300));
        }
        assert_eq!(reg.len(), 4);

        let mut set_ids = reg.note_ids();
        let mut store_ids = reg.store().note_ids();
        set_ids.sort();
        store_ids.sort();
        assert_eq!(set_ids, store_ids);
    }

    #[test]
    fn close_removes_one_entry_everywhere_and_twice_is_noop() {
        let (_dir, mut reg) = test_registry();
        reg.insert("a".to_string(), 1, Bounds::new(0, 0, 400, 300));
        reg.insert("b".to_string(), 2, Bounds::new(30, 30, 400, 300));
        reg.update_bounds(1, Bounds::new(5, 5, 400, 300));

        let removed = reg.remove_by_hwnd(1).expect("first close removes");
        assert_eq!(removed.note_id, "a");
        assert_eq!(removed.phase, WindowPhase::Closed);
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.store().note_ids(), vec!["b".to_string()]);
        assert!(reg.store().bounds("a").is_none());

        assert!(reg.remove_by_hwnd(1).is_none());
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn refocus_outranks_later_focused_window() {
        let (_dir, mut reg) = test_registry();
        reg.insert("w1".to_string(), 1, Bounds::new(0, 0, 400, 300));
        reg.insert("w2".to_string(), 2, Bounds::new(30, 30, 400, 300));

        reg.focus(1);
        let w2_stamp = reg.focus(2).unwrap();
        let w1_stamp = reg.focus(1).unwrap();
        assert!(w1_stamp > w2_stamp);
        assert_eq!(reg.top_window().unwrap().note_id, "w1");
    }

    #[test]
    fn fresh_ids_never_collide_with_open_notes() {
        let (_dir, mut reg) = test_registry();
        let first = reg.fresh_note_id();
        reg.insert(first.clone(), 1, Bounds::new(0, 0, 400, 300));
        let second = reg.fresh_note_id();
        assert_ne!(first, second);
    }

    #[test]
    fn content_attach_reports_note_id_exactly_once() {
        let (_dir, mut reg) = test_registry();
        reg.insert("a".to_string(), 1, Bounds::new(0, 0, 400, 300));

        assert_eq!(reg.attach_content(1, 900), Some("a".to_string()));
        assert_eq!(reg.attach_content(1, 900), None);
        assert_eq!(reg.content_windows(), vec![900]);
        assert!(reg.attach_content(77, 900).is_none());
    }

    #[test]
    fn ordinal_labels_follow_insertion_order() {
        let (_dir, mut reg) = test_registry();
        reg.insert("z".to_string(), 1, Bounds::new(0, 0, 400, 300));
        reg.insert("a".to_string(), 2, Bounds::new(30, 30, 400, 300));
        assert_eq!(reg.labels(), vec!["Note 1".to_string(), "Note 2".to_string()]);
    }
}
