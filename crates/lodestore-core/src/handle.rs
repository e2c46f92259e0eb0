//! Per-holder lock handles.

use lodestore_types::Value;
use parking_lot::Mutex;

use crate::cell::{CellReadGuard, CellWriteGuard, ValueCell};

#[derive(Debug)]
enum HeldGuard {
    Read(CellReadGuard),
    Write(CellWriteGuard),
}

/// A per-holder, mode-aware view of one cell's reader/writer lock.
///
/// The handle remembers whether its holder has the cell locked and in
/// which mode, makes acquisition idempotent, supports read→write
/// promotion, and releases in whichever mode is held. Exactly one
/// handle exists per (transaction, key) pair; distinct transactions
/// hold distinct handles on the same cell and contend through the
/// cell's lock, not through each other's bookkeeping.
///
/// All operations serialize on a private mutex; they may additionally
/// block on the underlying cell lock.
#[derive(Debug)]
pub struct LockHandle {
    cell: ValueCell,
    state: Mutex<Option<HeldGuard>>,
}

impl LockHandle {
    /// Create an unheld handle bound to `cell`.
    #[must_use]
    pub fn bind(cell: ValueCell) -> Self {
        Self {
            cell,
            state: Mutex::new(None),
        }
    }

    /// The cell this handle locks.
    #[must_use]
    pub fn cell(&self) -> &ValueCell {
        &self.cell
    }

    /// Acquire the read side. No-op when already held in either mode.
    pub fn read_lock(&self) {
        let mut state = self.state.lock();
        if state.is_none() {
            *state = Some(HeldGuard::Read(self.cell.lock_read()));
        }
    }

    /// Acquire the write side, promoting a held read lock.
    ///
    /// Promotion releases the read guard before acquiring the write
    /// guard. Another writer may interleave in that window, so a value
    /// observed under the read lock is not guaranteed to still be
    /// current once the write lock is held.
    pub fn write_lock(&self) {
        let mut state = self.state.lock();
        match state.take() {
            Some(HeldGuard::Write(guard)) => *state = Some(HeldGuard::Write(guard)),
            Some(HeldGuard::Read(guard)) => {
                drop(guard);
                *state = Some(HeldGuard::Write(self.cell.lock_write()));
            }
            None => *state = Some(HeldGuard::Write(self.cell.lock_write())),
        }
    }

    /// Promote a held read lock to a write lock. No-op when the write
    /// side is already held.
    pub fn promote(&self) {
        self.write_lock();
    }

    /// Release whichever side is held. No-op when not held.
    pub fn release(&self) {
        *self.state.lock() = None;
    }

    /// Whether the read side is held.
    #[must_use]
    pub fn is_read_held(&self) -> bool {
        matches!(&*self.state.lock(), Some(HeldGuard::Read(_)))
    }

    /// Whether the write side is held.
    #[must_use]
    pub fn is_write_held(&self) -> bool {
        matches!(&*self.state.lock(), Some(HeldGuard::Write(_)))
    }

    /// Copy of the cell's current value, read through the held guard,
    /// or through a transient read lock when the handle is unheld.
    #[must_use]
    pub fn current(&self) -> Option<Value> {
        match &*self.state.lock() {
            Some(HeldGuard::Read(guard)) => (**guard).clone(),
            Some(HeldGuard::Write(guard)) => (**guard).clone(),
            None => self.cell.peek(),
        }
    }

    /// Install `value` into the cell through the held write guard.
    ///
    /// # Panics
    ///
    /// Asserts that the write side is held.
    pub fn install(&self, value: Option<Value>) {
        let mut state = self.state.lock();
        match &mut *state {
            Some(HeldGuard::Write(guard)) => **guard = value,
            _ => panic!("LockHandle::install: write lock not held"),
        }
    }
}
