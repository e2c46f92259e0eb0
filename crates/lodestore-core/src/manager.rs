//! The transactional log manager.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use lodestore_error::{Result, StoreError};
use lodestore_types::{Key, Lsn, TxnId, Value};
use lodestore_wal::{LogRecord, RecordKind, segment};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::cell::ValueCell;
use crate::handle::LockHandle;
use crate::log::Log;
use crate::store::StoreMap;

/// Log directory used when the configured path is empty.
pub const DEFAULT_LOG_DIR: &str = "./data";

/// The lock handles held by one live transaction, keyed by the keys it
/// has touched.
#[derive(Debug, Default)]
struct TxnLockSet {
    handles: HashMap<Key, Arc<LockHandle>>,
}

impl TxnLockSet {
    /// Get the handle for `key`, binding a fresh one to `cell` on
    /// first touch. At most one handle exists per (transaction, key).
    fn handle_for(&mut self, key: &str, cell: &ValueCell) -> Arc<LockHandle> {
        if let Some(handle) = self.handles.get(key) {
            return Arc::clone(handle);
        }
        let handle = Arc::new(LockHandle::bind(cell.clone()));
        self.handles.insert(Key::from(key), Arc::clone(&handle));
        handle
    }

    fn get(&self, key: &str) -> Option<Arc<LockHandle>> {
        self.handles.get(key).map(Arc::clone)
    }

    fn release_all(&self) {
        for handle in self.handles.values() {
            handle.release();
        }
    }
}

/// Orchestrator of the store: owns the store map, the in-memory log
/// and its flush cursor, the TID counter, and the per-transaction lock
/// table.
///
/// All operations take `&self`; a manager is shared across threads,
/// with one logical thread of control driving each transaction (the
/// API is not re-entrant for the same TID).
#[derive(Debug)]
pub struct LogManager {
    log_dir: PathBuf,
    log: Mutex<Log>,
    next_tid: AtomicU64,
    store: Mutex<StoreMap>,
    txns: Mutex<HashMap<TxnId, TxnLockSet>>,
}

impl LogManager {
    /// Open a manager over `log_dir`, replaying the segments found
    /// there into the in-memory log.
    ///
    /// An empty path selects [`DEFAULT_LOG_DIR`]. Segments are read in
    /// ascending start-LSN order and must chain without gaps from LSN
    /// 0; a violation is `CorruptLog` and construction fails. Only the
    /// log is re-established: the store map starts empty, value state
    /// is not replayed.
    pub fn open(log_dir: impl AsRef<Path>) -> Result<Self> {
        let raw = log_dir.as_ref();
        let log_dir = if raw.as_os_str().is_empty() {
            PathBuf::from(DEFAULT_LOG_DIR)
        } else {
            raw.to_path_buf()
        };

        let segments = segment::list_segments(&log_dir)?;
        let mut records: Vec<LogRecord> = Vec::new();
        for info in &segments {
            let next_lsn = u64::try_from(records.len()).expect("log length fits u64");
            if info.start.get() != next_lsn {
                return Err(StoreError::corrupt(
                    &info.name,
                    format!("expected a segment starting at lsn#{next_lsn}, found {}", info.start),
                ));
            }
            let mut segment_records = segment::read_segment(info)?;
            records.append(&mut segment_records);
            let recovered = u64::try_from(records.len()).expect("log length fits u64");
            if recovered != info.end.get() + 1 {
                return Err(StoreError::corrupt(
                    &info.name,
                    "segment does not fill its LSN range",
                ));
            }
        }

        info!(
            dir = %log_dir.display(),
            segments = segments.len(),
            records = records.len(),
            "log manager opened"
        );
        Ok(Self {
            log_dir,
            log: Mutex::new(Log::recovered(records)),
            next_tid: AtomicU64::new(0),
            store: Mutex::new(StoreMap::new()),
            txns: Mutex::new(HashMap::new()),
        })
    }

    /// The directory segments are written to.
    #[must_use]
    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// The LSN the next appended record will receive.
    #[must_use]
    pub fn next_lsn(&self) -> Lsn {
        self.log.lock().next_lsn()
    }

    /// The LSN of the first record not yet flushed to a segment.
    #[must_use]
    pub fn next_lsn_to_flush(&self) -> Lsn {
        self.log.lock().next_lsn_to_flush()
    }

    /// Whether `tid` is currently running.
    #[must_use]
    pub fn is_live(&self, tid: TxnId) -> bool {
        self.txns.lock().contains_key(&tid)
    }

    /// Start a new transaction: allocate a fresh TID, journal its
    /// BEGIN record, and install an empty lock set.
    pub fn begin(&self) -> TxnId {
        let tid = TxnId::new(self.next_tid.fetch_add(1, Ordering::Relaxed));
        self.log.lock().append(LogRecord::begin(tid));
        self.txns.lock().insert(tid, TxnLockSet::default());
        debug!(%tid, "transaction began");
        tid
    }

    /// Read the current value of `key` under `tid`'s read lock.
    ///
    /// Blocks until no conflicting writer holds the cell. The returned
    /// value reflects the cell at the moment of return; no snapshot is
    /// taken, and the read lock is held until the transaction ends.
    pub fn get(&self, tid: TxnId, key: &str) -> Result<Value> {
        self.ensure_live(tid)?;
        let cell = self.store.lock().get_cell(key, false)?;
        let handle = self.handle_for(tid, key, &cell)?;
        handle.read_lock();
        handle
            .current()
            .ok_or_else(|| StoreError::key_not_found(key))
    }

    /// Install `value` for `key`, creating the key on first write.
    ///
    /// The write lock is acquired (or a held read lock promoted) and
    /// kept until the transaction ends. A missing value is rejected
    /// with `InvalidValue` before any lock or log activity.
    pub fn set(&self, tid: TxnId, key: &str, value: Option<Value>) -> Result<()> {
        self.ensure_live(tid)?;
        let Some(value) = value else {
            return Err(StoreError::InvalidValue);
        };
        let cell = self.store.lock().get_cell(key, true)?;
        let handle = self.handle_for(tid, key, &cell)?;
        handle.write_lock();

        let old_value = handle.current();
        handle.install(Some(value.clone()));
        self.log
            .lock()
            .append(LogRecord::update(tid, Key::from(key), old_value, Some(value)));
        Ok(())
    }

    /// Remove `key` from the store under `tid`'s write lock.
    ///
    /// The cell is dropped from the store map but stays alive through
    /// this transaction's handle, which releases the in-flight write
    /// lock at termination.
    pub fn delete(&self, tid: TxnId, key: &str) -> Result<()> {
        self.ensure_live(tid)?;
        let cell = self.store.lock().get_cell(key, false)?;
        let handle = self.handle_for(tid, key, &cell)?;
        handle.write_lock();

        let old_value = handle.current();
        self.store.lock().remove(key);
        self.log
            .lock()
            .append(LogRecord::update(tid, Key::from(key), old_value, None));
        Ok(())
    }

    /// Commit `tid`: journal COMMIT and END, flush every unflushed
    /// record as one segment, then release the transaction's locks.
    ///
    /// On flush failure the error is returned with the locks still
    /// held and the transaction still live; the caller decides whether
    /// to retry the commit or escalate to an abort.
    pub fn commit(&self, tid: TxnId) -> Result<()> {
        self.ensure_live(tid)?;
        {
            let mut log = self.log.lock();
            log.append(LogRecord::commit(tid));
            log.append(LogRecord::end(tid));
            log.flush_unflushed(&self.log_dir)?;
        }
        self.finish(tid);
        debug!(%tid, "transaction committed");
        Ok(())
    }

    /// Abort `tid`: journal ABORT, undo its UPDATE records newest
    /// first (emitting an UNDO record for each), journal END, flush,
    /// and release the transaction's locks.
    ///
    /// Abort durability is best-effort: a flush failure is logged and
    /// the abort still completes.
    pub fn abort(&self, tid: TxnId) -> Result<()> {
        self.ensure_live(tid)?;
        self.log.lock().append(LogRecord::abort(tid));

        // This transaction's UPDATE records, newest first, back to its
        // BEGIN record. Appends made after this snapshot are our own
        // UNDO records and must not be re-visited.
        let to_undo: Vec<LogRecord> = {
            let log = self.log.lock();
            let mut pending = Vec::new();
            for record in log.records().iter().rev() {
                if record.tid != tid {
                    continue;
                }
                match record.kind {
                    RecordKind::Update => pending.push(record.clone()),
                    RecordKind::Begin => break,
                    _ => {}
                }
            }
            pending
        };

        for record in &to_undo {
            self.undo_update(tid, record)?;
        }

        self.log.lock().append(LogRecord::end(tid));
        if let Err(err) = self.log.lock().flush_unflushed(&self.log_dir) {
            warn!(%tid, error = %err, "abort flush failed");
        }
        self.finish(tid);
        debug!(%tid, undone = to_undo.len(), "transaction aborted");
        Ok(())
    }

    /// Reverse one UPDATE record: restore the pre-image into the cell
    /// and journal the compensating UNDO record.
    fn undo_update(&self, tid: TxnId, record: &LogRecord) -> Result<()> {
        let Some(key) = &record.key else {
            // UPDATE records always carry a key.
            debug_assert!(false, "UPDATE record without a key");
            return Ok(());
        };

        let handle = match self.txn_handle(tid, key.as_str()) {
            Some(handle) => handle,
            None => {
                let cell = self.store.lock().get_cell(key.as_str(), false)?;
                self.handle_for(tid, key.as_str(), &cell)?
            }
        };
        handle.write_lock();

        if record.old_value.is_some() {
            // If the UPDATE deleted the key, put this transaction's
            // own cell back so the restored value stays reachable.
            let mut store = self.store.lock();
            if !store.contains_key(key.as_str()) {
                store.insert(key.clone(), handle.cell().clone());
            }
        } else {
            // The UPDATE created the key; restoring its pre-image
            // means the key does not exist.
            self.store.lock().remove(key.as_str());
        }
        handle.install(record.old_value.clone());

        self.log.lock().append(LogRecord::undo(
            tid,
            key.clone(),
            record.new_value.clone(),
            record.old_value.clone(),
            record.lsn,
        ));
        Ok(())
    }

    fn ensure_live(&self, tid: TxnId) -> Result<()> {
        if self.txns.lock().contains_key(&tid) {
            Ok(())
        } else {
            Err(StoreError::TransactionNotRunning { tid })
        }
    }

    /// Get or create `tid`'s handle for `key`, bound to `cell`.
    fn handle_for(&self, tid: TxnId, key: &str, cell: &ValueCell) -> Result<Arc<LockHandle>> {
        let mut txns = self.txns.lock();
        let set = txns
            .get_mut(&tid)
            .ok_or(StoreError::TransactionNotRunning { tid })?;
        Ok(set.handle_for(key, cell))
    }

    fn txn_handle(&self, tid: TxnId, key: &str) -> Option<Arc<LockHandle>> {
        self.txns.lock().get(&tid).and_then(|set| set.get(key))
    }

    /// Release every lock held by `tid` and retire it from the lock
    /// table.
    fn finish(&self, tid: TxnId) {
        let mut txns = self.txns.lock();
        if let Some(set) = txns.get(&tid) {
            set.release_all();
        }
        txns.remove(&tid);
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn open_manager(dir: &TempDir) -> LogManager {
        LogManager::open(dir.path()).unwrap()
    }

    #[test]
    fn begin_allocates_monotonic_tids() {
        let dir = TempDir::new().unwrap();
        let manager = open_manager(&dir);
        assert_eq!(manager.begin(), TxnId::new(0));
        assert_eq!(manager.begin(), TxnId::new(1));
        assert!(manager.is_live(TxnId::new(0)));
        assert!(manager.is_live(TxnId::new(1)));
    }

    #[test]
    fn get_in_transaction_sees_own_write() {
        let dir = TempDir::new().unwrap();
        let manager = open_manager(&dir);
        let tid = manager.begin();
        manager.set(tid, "k", Some(Value::from("v1"))).unwrap();
        assert_eq!(manager.get(tid, "k").unwrap(), Value::from("v1"));
        manager.commit(tid).unwrap();
    }

    #[test]
    fn operations_against_unknown_tid_fail_without_side_effects() {
        let dir = TempDir::new().unwrap();
        let manager = open_manager(&dir);
        let ghost = TxnId::new(99);
        let before = manager.next_lsn();

        assert!(matches!(
            manager.get(ghost, "k").unwrap_err(),
            StoreError::TransactionNotRunning { .. }
        ));
        assert!(matches!(
            manager.set(ghost, "k", Some(Value::from("v"))).unwrap_err(),
            StoreError::TransactionNotRunning { .. }
        ));
        assert!(matches!(
            manager.delete(ghost, "k").unwrap_err(),
            StoreError::TransactionNotRunning { .. }
        ));
        assert!(matches!(
            manager.commit(ghost).unwrap_err(),
            StoreError::TransactionNotRunning { .. }
        ));
        assert!(matches!(
            manager.abort(ghost).unwrap_err(),
            StoreError::TransactionNotRunning { .. }
        ));
        assert_eq!(manager.next_lsn(), before);
    }

    #[test]
    fn set_without_value_fails_and_appends_nothing() {
        let dir = TempDir::new().unwrap();
        let manager = open_manager(&dir);
        let tid = manager.begin();
        let before = manager.next_lsn();

        assert!(matches!(
            manager.set(tid, "k", None).unwrap_err(),
            StoreError::InvalidValue
        ));
        assert_eq!(manager.next_lsn(), before);
        // The key was never created either.
        assert!(matches!(
            manager.get(tid, "k").unwrap_err(),
            StoreError::KeyNotFound { .. }
        ));
    }

    #[test]
    fn get_on_unknown_key_fails() {
        let dir = TempDir::new().unwrap();
        let manager = open_manager(&dir);
        let tid = manager.begin();
        assert!(matches!(
            manager.get(tid, "missing").unwrap_err(),
            StoreError::KeyNotFound { .. }
        ));
    }

    #[test]
    fn commit_retires_the_transaction() {
        let dir = TempDir::new().unwrap();
        let manager = open_manager(&dir);
        let tid = manager.begin();
        manager.set(tid, "k", Some(Value::from("v"))).unwrap();
        manager.commit(tid).unwrap();

        assert!(!manager.is_live(tid));
        assert!(matches!(
            manager.get(tid, "k").unwrap_err(),
            StoreError::TransactionNotRunning { .. }
        ));
    }

    #[test]
    fn abort_restores_the_previous_value() {
        let dir = TempDir::new().unwrap();
        let manager = open_manager(&dir);

        let setup = manager.begin();
        manager.set(setup, "a", Some(Value::from("1"))).unwrap();
        manager.commit(setup).unwrap();

        let doomed = manager.begin();
        manager.set(doomed, "a", Some(Value::from("2"))).unwrap();
        manager.set(doomed, "a", Some(Value::from("3"))).unwrap();
        manager.abort(doomed).unwrap();

        let reader = manager.begin();
        assert_eq!(manager.get(reader, "a").unwrap(), Value::from("1"));
        manager.commit(reader).unwrap();
    }

    #[test]
    fn abort_of_a_creating_set_removes_the_key() {
        let dir = TempDir::new().unwrap();
        let manager = open_manager(&dir);

        let tid = manager.begin();
        manager.set(tid, "fresh", Some(Value::from("v"))).unwrap();
        manager.abort(tid).unwrap();

        let reader = manager.begin();
        assert!(matches!(
            manager.get(reader, "fresh").unwrap_err(),
            StoreError::KeyNotFound { .. }
        ));
        manager.commit(reader).unwrap();
    }

    #[test]
    fn abort_of_a_delete_rematerializes_the_key() {
        let dir = TempDir::new().unwrap();
        let manager = open_manager(&dir);

        let setup = manager.begin();
        manager.set(setup, "k", Some(Value::from("v"))).unwrap();
        manager.commit(setup).unwrap();

        let doomed = manager.begin();
        manager.delete(doomed, "k").unwrap();
        manager.abort(doomed).unwrap();

        let reader = manager.begin();
        assert_eq!(manager.get(reader, "k").unwrap(), Value::from("v"));
        manager.commit(reader).unwrap();
    }

    #[test]
    fn delete_then_get_in_a_later_transaction_fails() {
        let dir = TempDir::new().unwrap();
        let manager = open_manager(&dir);

        let setup = manager.begin();
        manager.set(setup, "k", Some(Value::from("v"))).unwrap();
        manager.commit(setup).unwrap();

        let deleter = manager.begin();
        manager.delete(deleter, "k").unwrap();
        manager.commit(deleter).unwrap();

        let reader = manager.begin();
        assert!(matches!(
            manager.get(reader, "k").unwrap_err(),
            StoreError::KeyNotFound { .. }
        ));
        manager.commit(reader).unwrap();
    }

    #[test]
    fn delete_of_unknown_key_fails() {
        let dir = TempDir::new().unwrap();
        let manager = open_manager(&dir);
        let tid = manager.begin();
        assert!(matches!(
            manager.delete(tid, "missing").unwrap_err(),
            StoreError::KeyNotFound { .. }
        ));
        manager.abort(tid).unwrap();
    }

    #[test]
    fn empty_log_dir_defaults_are_fresh() {
        let dir = TempDir::new().unwrap();
        let manager = open_manager(&dir);
        assert_eq!(manager.next_lsn(), Lsn::new(0));
        assert_eq!(manager.next_lsn_to_flush(), Lsn::new(0));
        assert_eq!(manager.log_dir(), dir.path());
    }

    #[test]
    fn open_on_missing_dir_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = LogManager::open(dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
    }
}
