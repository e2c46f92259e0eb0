//! Transaction log records.

use lodestore_types::{Key, Lsn, TxnId, Value};

/// The type of a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RecordKind {
    /// Transaction starts.
    Begin = 0,
    /// A cell changed from `old_value` to `new_value` (`new_value`
    /// absent for a delete).
    Update = 1,
    /// Transaction decided to commit.
    Commit = 2,
    /// Transaction decided to abort.
    Abort = 3,
    /// Transaction is fully terminated, on either side of the decision.
    End = 4,
    /// Compensating record emitted during abort: the pre-image of an
    /// UPDATE was installed back into the cell.
    Undo = 5,
}

impl RecordKind {
    /// Wire value of this kind.
    #[inline]
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Parse a wire value back into a kind.
    #[must_use]
    pub const fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Begin),
            1 => Some(Self::Update),
            2 => Some(Self::Commit),
            3 => Some(Self::Abort),
            4 => Some(Self::End),
            5 => Some(Self::Undo),
            _ => None,
        }
    }
}

/// One record in the transaction log.
///
/// UPDATE and UNDO records carry a key and value images; the control
/// kinds (BEGIN, COMMIT, ABORT, END) carry neither. Value images are
/// copies taken at emission time, so later in-place mutation of a cell
/// never changes an already-written record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    /// Position in the log. Assigned by the in-memory log at append
    /// time; the value set by a constructor is a placeholder.
    pub lsn: Lsn,
    /// The transaction this record belongs to.
    pub tid: TxnId,
    /// Record type.
    pub kind: RecordKind,
    /// UPDATE/UNDO only.
    pub key: Option<Key>,
    /// Pre-image. Absent when the key was freshly created.
    pub old_value: Option<Value>,
    /// Post-image. Absent when the record deletes the key.
    pub new_value: Option<Value>,
    /// UNDO only: the LSN of the UPDATE being reversed.
    pub undo_lsn: Option<Lsn>,
}

impl LogRecord {
    const fn control(tid: TxnId, kind: RecordKind) -> Self {
        Self {
            lsn: Lsn::ZERO,
            tid,
            kind,
            key: None,
            old_value: None,
            new_value: None,
            undo_lsn: None,
        }
    }

    /// A BEGIN record for `tid`.
    #[must_use]
    pub const fn begin(tid: TxnId) -> Self {
        Self::control(tid, RecordKind::Begin)
    }

    /// A COMMIT record for `tid`.
    #[must_use]
    pub const fn commit(tid: TxnId) -> Self {
        Self::control(tid, RecordKind::Commit)
    }

    /// An ABORT record for `tid`.
    #[must_use]
    pub const fn abort(tid: TxnId) -> Self {
        Self::control(tid, RecordKind::Abort)
    }

    /// An END record for `tid`.
    #[must_use]
    pub const fn end(tid: TxnId) -> Self {
        Self::control(tid, RecordKind::End)
    }

    /// An UPDATE record: the cell for `key` changed from `old_value`
    /// to `new_value`.
    #[must_use]
    pub fn update(
        tid: TxnId,
        key: Key,
        old_value: Option<Value>,
        new_value: Option<Value>,
    ) -> Self {
        Self {
            lsn: Lsn::ZERO,
            tid,
            kind: RecordKind::Update,
            key: Some(key),
            old_value,
            new_value,
            undo_lsn: None,
        }
    }

    /// An UNDO record reversing the UPDATE at `undo_lsn`. The images
    /// are the reverse of the undone UPDATE's.
    #[must_use]
    pub fn undo(
        tid: TxnId,
        key: Key,
        old_value: Option<Value>,
        new_value: Option<Value>,
        undo_lsn: Lsn,
    ) -> Self {
        Self {
            lsn: Lsn::ZERO,
            tid,
            kind: RecordKind::Undo,
            key: Some(key),
            old_value,
            new_value,
            undo_lsn: Some(undo_lsn),
        }
    }
}
