//! NUL-padded fixed-width string encoding, the one wire convention shared by
//! both PDU families.
//!
//! String fields with NUL-padding are a fixed-width wire convention, not a
//! language idiom: encoding truncates to `W-1` bytes and zero-pads to `W`;
//! decoding consumes exactly `W` bytes and stops at the first NUL.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::{Result, bail};

/// Writes `s` into `dst` (exactly `dst.len()` bytes), truncating to
/// `dst.len() - 1` characters and NUL-padding the remainder.
pub fn encode_str(s: &str, dst: &mut [u8]) {
    let width = dst.len();
    dst.fill(0);
    let max = width.saturating_sub(1);
    let bytes = s.as_bytes();
    let n = bytes.len().min(max);
    dst[..n].copy_from_slice(&bytes[..n]);
}

/// Reads a NUL-padded field, returning the prefix up to the first NUL (or the
/// whole field if none is present). Non-UTF8 bytes are replaced per
/// `String::from_utf8_lossy`.
pub fn decode_str(src: &[u8]) -> String {
    let end = src.iter().position(|&b| b == 0).unwrap_or(src.len());
    String::from_utf8_lossy(&src[..end]).into_owned()
}

/// Extracts a `packet_type` byte from the front of a fixed-size buffer,
/// bailing with context if the buffer is short.
pub fn read_u8(buf: &[u8], offset: usize, field: &str) -> Result<u8> {
    buf.get(offset)
        .copied()
        .ok_or_else(|| anyhow::anyhow!("buffer too short to read {field} at offset {offset}"))
}

/// Bails with a descriptive error if `buf.len()` does not equal `expected`.
pub fn ensure_len(buf: &[u8], expected: usize, what: &str) -> Result<()> {
    if buf.len() != expected {
        bail!("{what}: expected {expected} bytes, got {}", buf.len());
    }
    Ok(())
}
