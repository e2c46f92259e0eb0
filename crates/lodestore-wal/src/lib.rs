//! Write-ahead log records, their wire codec, and segment file I/O.
//!
//! A segment is one flushed log file holding a contiguous inclusive LSN
//! range, named `%012d_%012d.log` (start and end LSN, zero-padded
//! decimal). Segments are written whole at commit/abort flush time and
//! never rewritten or truncated.

pub mod codec;
pub mod record;
pub mod segment;

pub use record::{LogRecord, RecordKind};
pub use segment::{
    SegmentInfo, list_segments, parse_segment_file_name, read_segment, segment_file_name,
    write_segment,
};
