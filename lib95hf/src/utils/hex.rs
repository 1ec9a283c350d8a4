// lib95hf/src/utils/hex.rs

//! Hex rendering of chip frames for logs, and a parser for frames typed by
//! hand (demos, scripted replies).

use std::fmt::Write;

use crate::{Error, Result};

/// Lowercase hex without separators, `[0x88, 0x02]` -> `"8802"`.
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut s, b| {
        let _ = write!(s, "{:02x}", b);
        s
    })
}

/// Lowercase hex with one space between bytes, the format used by frame
/// traces.
pub fn bytes_to_hex_spaced(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 3);
    for (i, b) in bytes.iter().enumerate() {
        if i != 0 {
            s.push(' ');
        }
        let _ = write!(s, "{:02x}", b);
    }
    s
}

/// Header and payload of a chip frame rendered separately, e.g.
/// `"80 05 | 30 04 ab cd 08"`. Frames shorter than the header are printed
/// as is.
pub fn frame_to_hex(frame: &[u8]) -> String {
    match frame.split_at_checked(2) {
        Some((header, data)) if !data.is_empty() => format!(
            "{} | {}",
            bytes_to_hex_spaced(header),
            bytes_to_hex_spaced(data)
        ),
        _ => bytes_to_hex_spaced(frame),
    }
}

/// Parse hex digits, ignoring whitespace, `:` and `-` separators.
pub fn parse_hex(s: &str) -> Result<Vec<u8>> {
    let digits: Vec<u8> = s
        .bytes()
        .filter(|c| !c.is_ascii_whitespace() && *c != b':' && *c != b'-')
        .collect();
    if digits.len() % 2 != 0 {
        return Err(Error::InvalidParameter(format!(
            "odd number of hex digits in {:?}",
            s
        )));
    }
    digits
        .chunks(2)
        .map(|pair| {
            std::str::from_utf8(pair)
                .ok()
                .and_then(|p| u8::from_str_radix(p, 16).ok())
                .ok_or_else(|| {
                    Error::InvalidParameter(format!(
                        "invalid hex pair {:?}",
                        String::from_utf8_lossy(pair)
                    ))
                })
        })
        .collect()
}
