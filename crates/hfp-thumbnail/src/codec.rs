//! Base64 payload repair and decoding.
//!
//! Payloads may have gone through an extra JSON-escaping layer, which leaves
//! literal `\n`, `\r`, `\t` and `\/` sequences in the string. Repair order:
//!
//! 1. drop literal `\n`, `\r`, `\t`
//! 2. turn `\/` into `/`
//! 3. drop remaining whitespace
//! 4. pad with `=` to a multiple of 4
//!
//! Decoding never fails: an undecodable payload yields an empty buffer.
//! Unused bits in the last symbol are ignored, so a payload cut one
//! character short still decodes.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use tracing::{debug, warn};

/// Standard alphabet, lenient about trailing bits and padding.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_allow_trailing_bits(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

const ESCAPE_ARTIFACTS: [&str; 3] = ["\\n", "\\r", "\\t"];

/// Smallest multiple of 4 that is `>= len`.
pub fn padded_len(len: usize) -> usize {
    len.div_ceil(4) * 4
}

/// Repair escaping artifacts and pad to base64 block alignment.
pub fn normalize(payload: &str) -> String {
    let mut repaired = payload.to_string();
    for artifact in ESCAPE_ARTIFACTS {
        if repaired.contains(artifact) {
            repaired = repaired.replace(artifact, "");
        }
    }
    let repaired = repaired.replace("\\/", "/");

    let mut clean: String = repaired.chars().filter(|c| !c.is_whitespace()).collect();
    let target = padded_len(clean.len());
    if target != clean.len() {
        clean.extend(std::iter::repeat_n('=', target - clean.len()));
        debug!(len = clean.len(), "base64 padded");
    }
    clean
}

/// Normalize and decode with the lenient standard engine. Returns an empty buffer
/// when the payload cannot be decoded.
pub fn decode(payload: &str) -> Vec<u8> {
    let clean = normalize(payload);
    debug!(len = clean.len(), "final sanitized length");
    match LENIENT.decode(clean.as_bytes()) {
        Ok(bytes) => {
            debug!(bytes = bytes.len(), "base64 decoded");
            bytes
        }
        Err(e) => {
            warn!(
                len = clean.len(),
                preview = %preview(&clean, 50),
                "base64 decode error: {e}"
            );
            Vec::new()
        }
    }
}

/// First `n` characters of `s`, for log lines.
pub fn preview(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Last `n` characters of `s`, for log lines.
pub fn tail(s: &str, n: usize) -> &str {
    let count = s.chars().count();
    if count <= n {
        return s;
    }
    match s.char_indices().nth(count - n) {
        Some((idx, _)) => &s[idx..],
        None => s,
    }
}

/// Uppercase hex of the first `n` bytes, dash separated.
pub fn hex_prefix(bytes: &[u8], n: usize) -> String {
    bytes
        .iter()
        .take(n)
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join("-")
}
