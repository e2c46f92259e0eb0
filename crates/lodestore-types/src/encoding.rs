//! Little-endian integer framing helpers.
//!
//! The record codec in `lodestore-wal` frames every multi-byte integer
//! little-endian. Writers append onto a growing `Vec<u8>`; readers
//! consume from the front of a shrinking slice and return `None` on
//! underrun so the caller can surface a corruption error with context.

/// Append a `u32` in little-endian order.
pub fn append_u32_le(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

/// Append a `u64` in little-endian order.
pub fn append_u64_le(out: &mut Vec<u8>, value: u64) {
    out.extend_from_slice(&value.to_le_bytes());
}

/// Consume one byte from the front of `input`.
pub fn take_u8(input: &mut &[u8]) -> Option<u8> {
    let (&byte, rest) = input.split_first()?;
    *input = rest;
    Some(byte)
}

/// Consume a little-endian `u32` from the front of `input`.
pub fn take_u32_le(input: &mut &[u8]) -> Option<u32> {
    let bytes = take_bytes(input, 4)?;
    Some(u32::from_le_bytes(bytes.try_into().ok()?))
}

/// Consume a little-endian `u64` from the front of `input`.
pub fn take_u64_le(input: &mut &[u8]) -> Option<u64> {
    let bytes = take_bytes(input, 8)?;
    Some(u64::from_le_bytes(bytes.try_into().ok()?))
}

/// Consume exactly `len` bytes from the front of `input`.
pub fn take_bytes<'a>(input: &mut &'a [u8], len: usize) -> Option<&'a [u8]> {
    if input.len() < len {
        return None;
    }
    let (taken, rest) = input.split_at(len);
    *input = rest;
    Some(taken)
}
