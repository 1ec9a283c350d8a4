// lib95hf/src/protocol/parser.rs

use crate::{Error, Result};

/// Fail with `InvalidLength` unless `data` holds at least `min` bytes.
pub fn ensure_len(data: &[u8], min: usize) -> Result<()> {
    match data.len() {
        n if n < min => Err(Error::InvalidLength {
            expected: min,
            actual: n,
        }),
        _ => Ok(()),
    }
}

/// Big-endian u16 at `idx` (file identifiers, offsets in APDUs).
pub fn be_u16_at(data: &[u8], idx: usize) -> Result<u16> {
    let b = slice_at(data, idx, 2)?;
    Ok(u16::from_be_bytes([b[0], b[1]]))
}

/// `len` bytes starting at `idx`.
pub fn slice_at(data: &[u8], idx: usize, len: usize) -> Result<&[u8]> {
    ensure_len(data, idx + len)?;
    Ok(&data[idx..idx + len])
}

pub fn byte_at(data: &[u8], idx: usize) -> Result<u8> {
    ensure_len(data, idx + 1)?;
    Ok(data[idx])
}
