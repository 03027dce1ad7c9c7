//! Persistent bounds store for StealthPad
//!
//! A durable string-keyed map backing note geometry across restarts. Keys:
//! `note-ids` holds the ordered list of live note identifiers, and
//! `window-bounds-<noteId>` holds that note's last on-screen rectangle.
//! The whole document is rewritten on every mutation, so removing a bounds
//! record and rewriting the id list land in a single write.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;

use crate::error::{PadError, PadResult};

/// Key holding the ordered note-id list
const NOTE_IDS_KEY: &str = "note-ids";

/// On-screen rectangle of a note window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Bounds {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }
}

/// Durable key-value store for note ids and window geometry
pub struct BoundsStore {
    path: PathBuf,
    map: Map<String, Value>,
}

impl BoundsStore {
    /// Get the default store file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("stealthpad")
            .join("store.json")
    }

    /// Open the store at `path`, starting empty if the file is missing or unreadable
    pub fn open(path: PathBuf) -> Self {
        let map = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<Map<String, Value>>(&content) {
                Ok(map) => {
                    info!("Loaded store from {:?}", path);
                    map
                }
                Err(e) => {
                    warn!("Failed to parse store, starting empty: {}", e);
                    Map::new()
                }
            },
            Err(_) => Map::new(),
        };

        Self { path, map }
    }

    /// Ordered list of persisted note ids
    pub fn note_ids(&self) -> Vec<String> {
        self.map
            .get(NOTE_IDS_KEY)
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Rewrite the persisted note-id list
    pub fn set_note_ids(&mut self, ids: &[String]) -> PadResult<()> {
        self.map.insert(
            NOTE_IDS_KEY.to_string(),
            Value::Array(ids.iter().map(|id| Value::String(id.clone())).collect()),
        );
        self.save()
    }

    /// Stored bounds for a note, if a record exists
    pub fn bounds(&self, note_id: &str) -> Option<Bounds> {
        self.map
            .get(&bounds_key(note_id))
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Persist the bounds record for a note
    pub fn set_bounds(&mut self, note_id: &str, bounds: Bounds) -> PadResult<()> {
        let value = serde_json::to_value(bounds)
            .map_err(|e| PadError::Store(e.to_string()))?;
        self.map.insert(bounds_key(note_id), value);
        self.save()
    }

    /// Remove a note: delete its bounds record and rewrite the id list in one write
    pub fn remove_note(&mut self, note_id: &str, remaining_ids: &[String]) -> PadResult<()> {
        self.map.remove(&bounds_key(note_id));
        self.map.insert(
            NOTE_IDS_KEY.to_string(),
            Value::Array(
                remaining_ids
                    .iter()
                    .map(|id| Value::String(id.clone()))
                    .collect(),
            ),
        );
        self.save()
    }

    /// Write the store document to disk
    pub fn save(&self) -> PadResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.map)
            .map_err(|e| PadError::Store(e.to_string()))?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

fn bounds_key(note_id: &str) -> String {
    format!("window-bounds-{}", note_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, BoundsStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = BoundsStore::open(dir.path().join("store.json"));
        (dir, store)
    }

    #[test]
    fn empty_store_has_no_ids() {
        let (_dir, store) = temp_store();
        assert!(store.note_ids().is_empty());
        assert!(store.bounds("a").is_none());
    }

    #[test]
    fn ids_and_bounds_roundtrip_across_reopen() {
        let (dir, mut store) = temp_store();
        store
            .set_note_ids(&["a".to_string(), "b".to_string()])
            .unwrap();
        store.set_bounds("a", Bounds::new(10, 20, 400, 300)).unwrap();

        let reopened = BoundsStore::open(dir.path().join("store.json"));
        assert_eq!(reopened.note_ids(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(reopened.bounds("a"), Some(Bounds::new(10, 20, 400, 300)));
        assert!(reopened.bounds("b").is_none());
    }

    #[test]
    fn remove_note_drops_bounds_and_rewrites_list() {
        let (dir, mut store) = temp_store();
        store
            .set_note_ids(&["a".to_string(), "b".to_string()])
            .unwrap();
        store.set_bounds("a", Bounds::new(0, 0, 400, 300)).unwrap();
        store.set_bounds("b", Bounds::new(30, 30, 400, 300)).unwrap();

        store.remove_note("a", &["b".to_string()]).unwrap();

        let reopened = BoundsStore::open(dir.path().join("store.json"));
        assert_eq!(reopened.note_ids(), vec!["b".to_string()]);
        assert!(reopened.bounds("a").is_none());
        assert_eq!(reopened.bounds("b"), Some(Bounds::new(30, 30, 400, 300)));
    }

    #[test]
    fn corrupt_store_file_starts_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("store.json");
        std::fs::write(&path, "not json at all").unwrap();
        let store = BoundsStore::open(path);
        assert!(store.note_ids().is_empty());
    }
}
