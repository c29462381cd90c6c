use crate::location::SavedLocation;
use log::{debug, info, warn};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Slot under which the whole saved-location list is kept.
pub const SAVED_LOCATIONS_KEY: &str = "SavedLocations";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to write '{}': {source}", path.display())]
    Io { source: io::Error, path: PathBuf },
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Durable named slots, each holding one serialized blob.
///
/// Reads are wholesale and never fail: a slot that cannot be read is simply
/// absent. Writes replace the slot's whole value.
pub trait KeyValueSlots {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError>;
}

// In-memory slots, used when nothing should touch the disk
#[derive(Debug, Default)]
pub struct MemorySlots {
    slots: HashMap<String, String>,
}

impl MemorySlots {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueSlots for MemorySlots {
    fn get(&self, key: &str) -> Option<String> {
        self.slots.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        self.slots.insert(key.to_string(), value);
        Ok(())
    }
}

/// Slots kept as a single JSON object (key -> string blob) in one file.
///
/// The file is read on every `get` and rewritten on every `set`, so another
/// handle on the same path always sees the latest write.
#[derive(Debug, Clone)]
pub struct FileSlots {
    path: PathBuf,
}

impl FileSlots {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<data dir>/virtual_location/defaults.json`, falling back to the
    /// current directory when the platform has no data directory.
    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("virtual_location")
            .join("defaults.json")
    }

    fn read_all(&self) -> Map<String, Value> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Map::new(),
            Err(e) => {
                warn!("Failed to read {}: {}", self.path.display(), e);
                return Map::new();
            }
        };
        match serde_json::from_str::<Map<String, Value>>(&text) {
            Ok(map) => map,
            Err(e) => {
                warn!("Ignoring unreadable slot file {}: {}", self.path.display(), e);
                Map::new()
            }
        }
    }
}

impl KeyValueSlots for FileSlots {
    fn get(&self, key: &str) -> Option<String> {
        match self.read_all().remove(key) {
            Some(Value::String(blob)) => Some(blob),
            Some(other) => {
                warn!("Slot '{}' holds a non-string value ({}), ignoring", key, other);
                None
            }
            None => None,
        }
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        let mut all = self.read_all();
        all.insert(key.to_string(), Value::String(value));
        let text = serde_json::to_string_pretty(&all)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                source,
                path: parent.to_path_buf(),
            })?;
        }
        fs::write(&self.path, text).map_err(|source| StoreError::Io {
            source,
            path: self.path.clone(),
        })?;
        debug!("Wrote slot '{}' to {}", key, self.path.display());
        Ok(())
    }
}

/// The append-only list of named locations.
///
/// Names are unique, checked by exact match when appending. Records are never
/// edited or removed.
pub struct LocationStore<S: KeyValueSlots> {
    slots: S,
}

impl<S: KeyValueSlots> LocationStore<S> {
    pub fn new(slots: S) -> Self {
        Self { slots }
    }

    /// Reads the full list. A missing or undecodable blob reads as empty.
    pub fn load(&self) -> Vec<SavedLocation> {
        let Some(blob) = self.slots.get(SAVED_LOCATIONS_KEY) else {
            debug!("No saved locations stored yet.");
            return vec![];
        };
        match serde_json::from_str::<Vec<SavedLocation>>(&blob) {
            Ok(locations) => locations,
            Err(e) => {
                warn!("Saved locations could not be decoded, treating as empty: {}", e);
                vec![]
            }
        }
    }

    /// Same as [`load`](Self::load); what the selection menu shows.
    pub fn list(&self) -> Vec<SavedLocation> {
        self.load()
    }

    /// Appends a record unless one with the same name already exists.
    ///
    /// Returns `Ok(true)` when the record was written and `Ok(false)` when the
    /// name was taken. The whole list is rewritten on every insert.
    pub fn append(&mut self, name: &str, latitude: f64, longitude: f64) -> Result<bool, StoreError> {
        let mut locations = self.load();
        if locations.iter().any(|l| l.name == name) {
            debug!("Location named '{}' already saved, skipping.", name);
            return Ok(false);
        }

        locations.push(SavedLocation::new(name, latitude, longitude));
        let blob = serde_json::to_string(&locations)?;
        self.slots.set(SAVED_LOCATIONS_KEY, blob)?;
        info!("Saved location '{}' ({}, {}).", name, latitude, longitude);
        Ok(true)
    }

    pub fn slots(&self) -> &S {
        &self.slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn temp_path(tag: &str) -> PathBuf {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        let n = COUNTER.fetch_add(1, Ordering::SeqCst);
        std::env::temp_dir()
            .join(format!("virtual_location_store_{}_{}_{}", std::process::id(), tag, n))
            .join("defaults.json")
    }

    #[test]
    fn load_of_empty_slot_is_empty() {
        let store = LocationStore::new(MemorySlots::new());
        assert!(store.load().is_empty());
        assert!(store.list().is_empty());
    }

    #[test]
    fn load_of_corrupt_blob_is_empty() {
        let mut slots = MemorySlots::new();
        slots.set(SAVED_LOCATIONS_KEY, "{not json".to_string()).unwrap();
        let store = LocationStore::new(slots);
        assert!(store.load().is_empty());
    }

    #[test]
    fn load_of_wrong_shape_is_empty() {
        let mut slots = MemorySlots::new();
        slots
            .set(SAVED_LOCATIONS_KEY, r#"[{"name":"x"}]"#.to_string())
            .unwrap();
        let store = LocationStore::new(slots);
        assert!(store.load().is_empty());
    }

    #[test]
    fn append_keeps_first_record_for_a_name() {
        let mut store = LocationStore::new(MemorySlots::new());
        assert!(store.append("home", 1.0, 2.0).unwrap());
        assert!(!store.append("home", 3.0, 4.0).unwrap());

        assert_eq!(store.load(), vec![SavedLocation::new("home", 1.0, 2.0)]);
    }

    #[test]
    fn append_allows_same_coordinates_under_different_names() {
        let mut store = LocationStore::new(MemorySlots::new());
        store.append("a", 1.0, 2.0).unwrap();
        store.append("b", 1.0, 2.0).unwrap();

        let names: Vec<_> = store.list().into_iter().map(|l| l.name).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn append_after_corrupt_blob_starts_fresh() {
        let mut slots = MemorySlots::new();
        slots.set(SAVED_LOCATIONS_KEY, "garbage".to_string()).unwrap();
        let mut store = LocationStore::new(slots);

        assert!(store.append("a", 5.0, 6.0).unwrap());
        assert_eq!(store.load(), vec![SavedLocation::new("a", 5.0, 6.0)]);
    }

    #[test]
    fn blob_uses_plain_field_names() {
        let mut store = LocationStore::new(MemorySlots::new());
        store.append("虚拟位置", 39.9042, 116.4074).unwrap();

        let blob = store.slots().get(SAVED_LOCATIONS_KEY).unwrap();
        assert_eq!(
            blob,
            r#"[{"name":"虚拟位置","latitude":39.9042,"longitude":116.4074}]"#
        );
    }

    #[test]
    fn file_slots_round_trip_through_disk() {
        let path = temp_path("roundtrip");
        let mut store = LocationStore::new(FileSlots::new(&path));
        store.append("office", 31.2304, 121.4737).unwrap();

        // A fresh handle sees what the first one wrote
        let reopened = LocationStore::new(FileSlots::new(&path));
        assert_eq!(reopened.load(), vec![SavedLocation::new("office", 31.2304, 121.4737)]);

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn file_slots_keep_other_keys() {
        let path = temp_path("otherkeys");
        let mut slots = FileSlots::new(&path);
        slots.set("Other", "kept".to_string()).unwrap();
        slots.set(SAVED_LOCATIONS_KEY, "[]".to_string()).unwrap();

        assert_eq!(slots.get("Other").as_deref(), Some("kept"));
        assert_eq!(slots.get(SAVED_LOCATIONS_KEY).as_deref(), Some("[]"));

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn file_slots_treat_corrupt_file_as_empty() {
        let path = temp_path("corrupt");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "not a json object").unwrap();

        let mut store = LocationStore::new(FileSlots::new(&path));
        assert!(store.load().is_empty());
        // Writing over it recovers the file
        assert!(store.append("a", 1.0, 1.0).unwrap());
        assert_eq!(store.load().len(), 1);

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn file_slots_missing_file_is_empty() {
        let slots = FileSlots::new(temp_path("missing"));
        assert_eq!(slots.get(SAVED_LOCATIONS_KEY), None);
    }
}
