//! Per-key value cells.

use std::sync::Arc;

use lodestore_types::Value;
use parking_lot::lock_api::{ArcRwLockReadGuard, ArcRwLockWriteGuard};
use parking_lot::{RawRwLock, RwLock};

/// Owned read guard over a cell's value slot.
pub(crate) type CellReadGuard = ArcRwLockReadGuard<RawRwLock, Option<Value>>;

/// Owned write guard over a cell's value slot.
pub(crate) type CellWriteGuard = ArcRwLockWriteGuard<RawRwLock, Option<Value>>;

/// The per-key container: the currently installed value (absent if the
/// key was deleted or never written) and the reader/writer lock
/// protecting it.
///
/// A cell is shared between its store-map entry and every lock handle
/// bound to it, so a deleted key's cell stays alive, and its lock
/// releasable, until the last handle drops. Cloning a cell clones the
/// shared reference, not the value.
#[derive(Debug, Clone, Default)]
pub struct ValueCell {
    slot: Arc<RwLock<Option<Value>>>,
}

impl ValueCell {
    /// Create a cell with no value installed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the read side, blocking while a writer holds the cell.
    pub(crate) fn lock_read(&self) -> CellReadGuard {
        self.slot.read_arc()
    }

    /// Acquire the write side, blocking while any holder remains.
    pub(crate) fn lock_write(&self) -> CellWriteGuard {
        self.slot.write_arc()
    }

    /// Copy of the current value through a transient read lock.
    #[must_use]
    pub fn peek(&self) -> Option<Value> {
        self.slot.read().clone()
    }

    /// Whether two cells share the same slot.
    #[must_use]
    pub fn same_cell(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_cell_has_no_value() {
        assert_eq!(ValueCell::new().peek(), None);
    }

    #[test]
    fn clones_share_the_slot() {
        let cell = ValueCell::new();
        let alias = cell.clone();
        assert!(cell.same_cell(&alias));

        *cell.lock_write() = Some(Value::from("v"));
        assert_eq!(alias.peek(), Some(Value::from("v")));

        assert!(!cell.same_cell(&ValueCell::new()));
    }
}
