//! Tagged little-endian record codec.
//!
//! A segment file is a Log container: zero or more record entries, each
//!
//! ```text
//! Offset  Size  Description
//!   0       1   Container tag: 0x01 (the repeated record field)
//!   1       4   Record payload length N (u32, little-endian)
//!   5       N   Record payload
//! ```
//!
//! A record payload is a sequence of tagged fields in ascending tag
//! order; optional fields are omitted entirely:
//!
//! ```text
//! Tag  Field       Encoding                          Presence
//!  1   lsn         8 bytes, 64-bit LE                required
//!  2   tid         8 bytes, 64-bit LE                required
//!  3   entry_type  1 byte (RecordKind)               required
//!  4   key         u32 LE length + UTF-8 bytes       UPDATE/UNDO
//!  5   old_value   u32 LE length + bytes             UPDATE/UNDO
//!  6   new_value   u32 LE length + bytes             UPDATE/UNDO
//!  7   undo_lsn    8 bytes, 64-bit LE                UNDO
//! ```
//!
//! An absent optional field and a present-but-empty byte string are
//! distinct on the wire; the store relies on that distinction for the
//! "no value" pre/post-images of UPDATE records.

use lodestore_error::{Result, StoreError};
use lodestore_types::encoding::{
    append_u32_le, append_u64_le, take_bytes, take_u8, take_u32_le, take_u64_le,
};
use lodestore_types::{Key, Lsn, TxnId, Value};

use crate::record::{LogRecord, RecordKind};

/// Container-level tag introducing each record entry.
pub const CONTAINER_RECORD_TAG: u8 = 0x01;

const TAG_LSN: u8 = 1;
const TAG_TID: u8 = 2;
const TAG_KIND: u8 = 3;
const TAG_KEY: u8 = 4;
const TAG_OLD_VALUE: u8 = 5;
const TAG_NEW_VALUE: u8 = 6;
const TAG_UNDO_LSN: u8 = 7;

fn append_len_prefixed(out: &mut Vec<u8>, bytes: &[u8]) {
    let len = u32::try_from(bytes.len()).expect("field length fits u32");
    append_u32_le(out, len);
    out.extend_from_slice(bytes);
}

/// Encode one record payload (no container framing).
#[must_use]
pub fn encode_record(record: &LogRecord) -> Vec<u8> {
    let mut out = Vec::new();
    out.push(TAG_LSN);
    append_u64_le(&mut out, record.lsn.get());
    out.push(TAG_TID);
    append_u64_le(&mut out, record.tid.get());
    out.push(TAG_KIND);
    out.push(record.kind.as_u8());
    if let Some(key) = &record.key {
        out.push(TAG_KEY);
        append_len_prefixed(&mut out, key.as_str().as_bytes());
    }
    if let Some(old) = &record.old_value {
        out.push(TAG_OLD_VALUE);
        append_len_prefixed(&mut out, old.as_bytes());
    }
    if let Some(new) = &record.new_value {
        out.push(TAG_NEW_VALUE);
        append_len_prefixed(&mut out, new.as_bytes());
    }
    if let Some(undo_lsn) = record.undo_lsn {
        out.push(TAG_UNDO_LSN);
        append_u64_le(&mut out, undo_lsn.get());
    }
    out
}

/// Encode a run of records as one Log container.
#[must_use]
pub fn encode_segment(records: &[LogRecord]) -> Vec<u8> {
    let mut out = Vec::new();
    for record in records {
        let payload = encode_record(record);
        out.push(CONTAINER_RECORD_TAG);
        append_len_prefixed(&mut out, &payload);
    }
    out
}

fn truncated(name: &str, field: &str) -> StoreError {
    StoreError::corrupt(name, format!("truncated {field} field"))
}

fn decode_len_prefixed<'a>(name: &str, input: &mut &'a [u8], field: &str) -> Result<&'a [u8]> {
    let len = take_u32_le(input).ok_or_else(|| truncated(name, field))?;
    take_bytes(input, len as usize).ok_or_else(|| truncated(name, field))
}

fn decode_record(name: &str, payload: &[u8]) -> Result<LogRecord> {
    let mut input = payload;
    let mut lsn = None;
    let mut tid = None;
    let mut kind = None;
    let mut key = None;
    let mut old_value = None;
    let mut new_value = None;
    let mut undo_lsn = None;

    let mut last_tag = 0_u8;
    while let Some(tag) = take_u8(&mut input) {
        if tag <= last_tag {
            return Err(StoreError::corrupt(
                name,
                format!("field tag {tag} repeated or out of order"),
            ));
        }
        match tag {
            TAG_LSN => {
                let raw = take_u64_le(&mut input).ok_or_else(|| truncated(name, "lsn"))?;
                lsn = Some(Lsn::new(raw));
            }
            TAG_TID => {
                let raw = take_u64_le(&mut input).ok_or_else(|| truncated(name, "tid"))?;
                tid = Some(TxnId::new(raw));
            }
            TAG_KIND => {
                let raw = take_u8(&mut input).ok_or_else(|| truncated(name, "entry_type"))?;
                kind = Some(RecordKind::from_u8(raw).ok_or_else(|| {
                    StoreError::corrupt(name, format!("unknown entry_type {raw}"))
                })?);
            }
            TAG_KEY => {
                let bytes = decode_len_prefixed(name, &mut input, "key")?;
                let text = std::str::from_utf8(bytes)
                    .map_err(|_| StoreError::corrupt(name, "key is not valid UTF-8"))?;
                key = Some(Key::from(text));
            }
            TAG_OLD_VALUE => {
                let bytes = decode_len_prefixed(name, &mut input, "old_value")?;
                old_value = Some(Value::from(bytes));
            }
            TAG_NEW_VALUE => {
                let bytes = decode_len_prefixed(name, &mut input, "new_value")?;
                new_value = Some(Value::from(bytes));
            }
            TAG_UNDO_LSN => {
                let raw = take_u64_le(&mut input).ok_or_else(|| truncated(name, "undo_lsn"))?;
                undo_lsn = Some(Lsn::new(raw));
            }
            _ => {
                return Err(StoreError::corrupt(name, format!("unknown field tag {tag}")));
            }
        }
        last_tag = tag;
    }

    let missing = |field: &str| StoreError::corrupt(name, format!("missing required {field} field"));
    Ok(LogRecord {
        lsn: lsn.ok_or_else(|| missing("lsn"))?,
        tid: tid.ok_or_else(|| missing("tid"))?,
        kind: kind.ok_or_else(|| missing("entry_type"))?,
        key,
        old_value,
        new_value,
        undo_lsn,
    })
}

/// Decode a Log container back into records.
///
/// `name` identifies the segment in corruption errors.
pub fn decode_segment(name: &str, bytes: &[u8]) -> Result<Vec<LogRecord>> {
    let mut input = bytes;
    let mut records = Vec::new();
    while let Some(tag) = take_u8(&mut input) {
        if tag != CONTAINER_RECORD_TAG {
            return Err(StoreError::corrupt(
                name,
                format!("unexpected container tag {tag}"),
            ));
        }
        let payload = decode_len_prefixed(name, &mut input, "record")?;
        records.push(decode_record(name, payload)?);
    }
    Ok(records)
}
