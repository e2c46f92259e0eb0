//! Segment file naming and I/O.
//!
//! Segment files live directly under the log directory and are named
//! `%012d_%012d.log`: start LSN, end LSN (inclusive), zero-padded
//! decimal. Anything else in the directory is ignored.

use std::fs;
use std::path::{Path, PathBuf};

use lodestore_error::{Result, StoreError};
use lodestore_types::Lsn;
use tracing::debug;

use crate::codec;
use crate::record::LogRecord;

/// Decimal digits per LSN in a segment file name.
const LSN_DIGITS: usize = 12;

/// Segment file extension, including the dot.
pub const SEGMENT_SUFFIX: &str = ".log";

/// Render the file name for the inclusive range `[start, end]`.
#[must_use]
pub fn segment_file_name(start: Lsn, end: Lsn) -> String {
    format!("{:012}_{:012}{SEGMENT_SUFFIX}", start.get(), end.get())
}

/// Parse a segment file name back into its LSN range.
///
/// Returns `None` for names not of the exact `%012d_%012d.log` shape;
/// such files are skipped during recovery.
#[must_use]
pub fn parse_segment_file_name(name: &str) -> Option<(Lsn, Lsn)> {
    let stem = name.strip_suffix(SEGMENT_SUFFIX)?;
    let bytes = stem.as_bytes();
    if bytes.len() != LSN_DIGITS * 2 + 1 || bytes[LSN_DIGITS] != b'_' {
        return None;
    }
    let (start_digits, rest) = stem.split_at(LSN_DIGITS);
    let end_digits = &rest[1..];
    if !start_digits.bytes().all(|b| b.is_ascii_digit())
        || !end_digits.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    let start = start_digits.parse::<u64>().ok()?;
    let end = end_digits.parse::<u64>().ok()?;
    Some((Lsn::new(start), Lsn::new(end)))
}

/// A segment file discovered in the log directory.
#[derive(Debug, Clone)]
pub struct SegmentInfo {
    /// Full path to the file.
    pub path: PathBuf,
    /// Bare file name, used in corruption errors.
    pub name: String,
    /// First LSN in the segment (inclusive).
    pub start: Lsn,
    /// Last LSN in the segment (inclusive).
    pub end: Lsn,
}

/// List the segment files under `dir` in ascending `start` order.
///
/// Subdirectories and files whose names do not parse are ignored, the
/// same way the recovery scan ignores them.
pub fn list_segments(dir: &Path) -> Result<Vec<SegmentInfo>> {
    let entries = fs::read_dir(dir).map_err(|err| StoreError::io(dir, err))?;
    let mut segments = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| StoreError::io(dir, err))?;
        let file_type = entry.file_type().map_err(|err| StoreError::io(entry.path(), err))?;
        if file_type.is_dir() {
            continue;
        }
        let raw_name = entry.file_name();
        let Some(name) = raw_name.to_str() else {
            continue;
        };
        let Some((start, end)) = parse_segment_file_name(name) else {
            continue;
        };
        segments.push(SegmentInfo {
            path: entry.path(),
            name: name.to_owned(),
            start,
            end,
        });
    }
    segments.sort_by_key(|segment| segment.start);
    Ok(segments)
}

/// Read and decode one segment, validating its record range.
///
/// The decoded records must exactly fill `[start, end]`: the count must
/// match and record `i` must carry LSN `start + i`.
pub fn read_segment(info: &SegmentInfo) -> Result<Vec<LogRecord>> {
    if info.end < info.start {
        return Err(StoreError::corrupt(&info.name, "end LSN precedes start LSN"));
    }
    let bytes = fs::read(&info.path).map_err(|err| StoreError::io(&info.path, err))?;
    let records = codec::decode_segment(&info.name, &bytes)?;

    let expected = info.end.get() - info.start.get() + 1;
    if records.len() as u64 != expected {
        return Err(StoreError::corrupt(
            &info.name,
            format!("expected {expected} records, found {}", records.len()),
        ));
    }
    for (index, record) in records.iter().enumerate() {
        let expected_lsn = info.start.get() + index as u64;
        if record.lsn.get() != expected_lsn {
            return Err(StoreError::corrupt(
                &info.name,
                format!("record {index} carries {}, expected lsn#{expected_lsn}", record.lsn),
            ));
        }
    }
    Ok(records)
}

/// Encode `records` as one segment file under `dir`.
///
/// The records must be a non-empty LSN-dense run; the file name is
/// derived from the first and last LSN. The file is written whole.
pub fn write_segment(dir: &Path, records: &[LogRecord]) -> Result<PathBuf> {
    assert!(!records.is_empty(), "write_segment: empty record run");
    let start = records[0].lsn;
    let end = records[records.len() - 1].lsn;
    let name = segment_file_name(start, end);
    let path = dir.join(&name);
    let bytes = codec::encode_segment(records);
    fs::write(&path, &bytes).map_err(|err| StoreError::io(&path, err))?;
    debug!(segment = %name, records = records.len(), "segment written");
    Ok(path)
}
