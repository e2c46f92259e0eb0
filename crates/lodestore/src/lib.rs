//! Public API facade for LodeStore.
//!
//! LodeStore is a single-node, log-based, transactional key-value
//! store: an in-memory map from text keys to byte-string values, a
//! write-ahead log flushed as immutable segment files, strict
//! two-phase per-key reader/writer locking, and reverse-log undo on
//! abort.
//!
//! ```no_run
//! use lodestore::{LogManager, Value};
//!
//! # fn main() -> lodestore::Result<()> {
//! let store = LogManager::open("./data")?;
//! let tid = store.begin();
//! store.set(tid, "greeting", Some(Value::from("hello")))?;
//! store.commit(tid)?;
//! # Ok(())
//! # }
//! ```

pub use lodestore_core::{DEFAULT_LOG_DIR, LockHandle, LogManager, StoreMap, ValueCell};
pub use lodestore_error::{Result, StoreError};
pub use lodestore_types::{Key, Lsn, TxnId, Value};
pub use lodestore_wal as wal;
pub use lodestore_wal::{LogRecord, RecordKind};
