//! The master key → cell map.

use std::collections::HashMap;

use lodestore_error::{Result, StoreError};
use lodestore_types::Key;

use crate::cell::ValueCell;

/// The master copy of the store: a map from keys to value cells.
///
/// Cells are created lazily on the first write to an unknown key and
/// removed when a delete's UPDATE record is emitted. The map structure
/// itself is guarded by the log manager; callers never traverse it
/// concurrently.
#[derive(Debug, Default)]
pub struct StoreMap {
    cells: HashMap<Key, ValueCell>,
}

impl StoreMap {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the cell for `key`.
    ///
    /// When `create_if_missing` is set, an unknown key gets a fresh
    /// valueless cell installed; otherwise the lookup fails with
    /// `KeyNotFound`.
    pub fn get_cell(&mut self, key: &str, create_if_missing: bool) -> Result<ValueCell> {
        if let Some(cell) = self.cells.get(key) {
            return Ok(cell.clone());
        }
        if !create_if_missing {
            return Err(StoreError::key_not_found(key));
        }
        let cell = ValueCell::new();
        self.cells.insert(Key::from(key), cell.clone());
        Ok(cell)
    }

    /// Remove the entry for `key`.
    ///
    /// The cell itself stays alive through any lock handles still bound
    /// to it; their in-flight locks release on transaction termination.
    pub fn remove(&mut self, key: &str) -> Option<ValueCell> {
        self.cells.remove(key)
    }

    /// Install `cell` under `key`, re-materializing a deleted entry.
    pub fn insert(&mut self, key: Key, cell: ValueCell) {
        self.cells.insert(key, cell);
    }

    /// Whether `key` currently has an entry.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.cells.contains_key(key)
    }

    /// Number of keys in the map.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the map holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_without_create_fails() {
        let mut map = StoreMap::new();
        let err = map.get_cell("k", false).unwrap_err();
        assert!(matches!(err, StoreError::KeyNotFound { .. }));
        assert!(map.is_empty());
    }

    #[test]
    fn create_on_demand_then_reuse() {
        let mut map = StoreMap::new();
        let created = map.get_cell("k", true).unwrap();
        let fetched = map.get_cell("k", false).unwrap();
        assert!(created.same_cell(&fetched));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn remove_orphans_the_cell_and_insert_restores_it() {
        let mut map = StoreMap::new();
        let cell = map.get_cell("k", true).unwrap();
        let removed = map.remove("k").unwrap();
        assert!(cell.same_cell(&removed));
        assert!(!map.contains_key("k"));

        map.insert(Key::from("k"), removed);
        let restored = map.get_cell("k", false).unwrap();
        assert!(cell.same_cell(&restored));
    }
}
