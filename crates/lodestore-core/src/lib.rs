//! Transactional core of LodeStore.
//!
//! The [`LogManager`] couples an in-memory key/value map with a
//! write-ahead log: every mutation is journaled before the transaction
//! commits, commit and abort flush the unflushed log suffix as one
//! segment file, and abort undoes a transaction's effects by walking
//! the log backwards and emitting compensating UNDO records.
//!
//! Concurrency is strict two-phase locking at per-key granularity:
//! each touched key is locked through a per-transaction [`LockHandle`]
//! and held until the transaction terminates. Deadlock detection is
//! not performed; lock acquisition order is the order in which a
//! transaction touches keys.

pub mod cell;
pub mod handle;
pub mod log;
pub mod manager;
pub mod store;

pub use cell::ValueCell;
pub use handle::LockHandle;
pub use log::Log;
pub use manager::{DEFAULT_LOG_DIR, LogManager};
pub use store::StoreMap;
