//! # Hex Encoding
//!
//! Lowercase hex rendering and fixed-width parsing for the byte newtypes.
//! Parsing accepts an optional `0x` prefix and mixed case.

use crate::error::CoreError;

/// Render bytes as lowercase hex without a prefix.
pub fn encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Render bytes as lowercase hex with a `0x` prefix.
pub fn encode_prefixed(bytes: &[u8]) -> String {
    format!("0x{}", encode(bytes))
}

/// Parse an arbitrary-length hex string (optional `0x` prefix) into bytes.
pub fn decode(s: &str) -> Result<Vec<u8>, CoreError> {
    let digits = strip_prefix(s);
    if digits.len() % 2 != 0 {
        return Err(CoreError::InvalidLength {
            expected: digits.len() + 1,
            actual: digits.len(),
        });
    }
    digits
        .as_bytes()
        .chunks(2)
        .enumerate()
        .map(|(i, pair)| {
            let hi = nibble(pair[0]).ok_or(CoreError::InvalidHex { position: i * 2 })?;
            let lo = nibble(pair[1]).ok_or(CoreError::InvalidHex {
                position: i * 2 + 1,
            })?;
            Ok((hi << 4) | lo)
        })
        .collect()
}

/// Parse a hex string of exactly `2 * N` digits into a fixed array.
pub fn decode_fixed<const N: usize>(s: &str) -> Result<[u8; N], CoreError> {
    let digits = strip_prefix(s);
    if digits.len() != N * 2 {
        return Err(CoreError::InvalidLength {
            expected: N * 2,
            actual: digits.len(),
        });
    }
    let bytes = decode(digits)?;
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes);
    Ok(out)
}

fn strip_prefix(s: &str) -> &str {
    let s = s.trim();
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

fn nibble(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}
