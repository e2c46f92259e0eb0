//! The in-memory transaction log.

use std::path::Path;

use lodestore_error::Result;
use lodestore_types::Lsn;
use lodestore_wal::{LogRecord, segment};
use tracing::debug;

/// The append-only record sequence and its flush cursor.
///
/// Records are indexed by LSN: the record at index `i` carries LSN
/// `i`, with no gaps. The log is prefix-complete: after recovery its
/// length equals the last flushed end-LSN plus one.
#[derive(Debug, Default)]
pub struct Log {
    records: Vec<LogRecord>,
    next_to_flush: Lsn,
}

impl Log {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the log with records recovered from disk. Every recovered
    /// record counts as already flushed.
    #[must_use]
    pub(crate) fn recovered(records: Vec<LogRecord>) -> Self {
        let next_to_flush = Lsn::new(u64::try_from(records.len()).expect("log length fits u64"));
        Self {
            records,
            next_to_flush,
        }
    }

    /// Assign the next LSN to `record` and append it.
    pub fn append(&mut self, mut record: LogRecord) -> Lsn {
        let lsn = self.next_lsn();
        record.lsn = lsn;
        self.records.push(record);
        lsn
    }

    /// The LSN the next appended record will receive.
    #[must_use]
    pub fn next_lsn(&self) -> Lsn {
        Lsn::new(u64::try_from(self.records.len()).expect("log length fits u64"))
    }

    /// The LSN of the first record not yet flushed to a segment.
    #[must_use]
    pub fn next_lsn_to_flush(&self) -> Lsn {
        self.next_to_flush
    }

    /// All records currently in the log, in LSN order.
    #[must_use]
    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    /// Write every unflushed record as one new segment under `dir`.
    ///
    /// A no-op when nothing is unflushed. On write failure the cursor
    /// is not advanced, so the same records can be retried.
    pub fn flush_unflushed(&mut self, dir: &Path) -> Result<()> {
        let start = usize::try_from(self.next_to_flush.get()).expect("flush cursor fits usize");
        if start == self.records.len() {
            return Ok(());
        }
        segment::write_segment(dir, &self.records[start..])?;
        self.next_to_flush = self.next_lsn();
        debug!(next_lsn_to_flush = %self.next_to_flush, "log flushed");
        Ok(())
    }
}
