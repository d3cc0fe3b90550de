//! Envelope text decoding.
//!
//! Envelopes are UTF-8 in practice; a UTF-8 or UTF-16 byte order mark is
//! honoured when present. Invalid sequences are replaced, never rejected.

use std::borrow::Cow;

const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];
const UTF16_LE_BOM: [u8; 2] = [0xFF, 0xFE];
const UTF16_BE_BOM: [u8; 2] = [0xFE, 0xFF];

/// Decode raw envelope bytes to text.
pub fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    if let Some(rest) = bytes.strip_prefix(&UTF8_BOM) {
        return String::from_utf8_lossy(rest);
    }
    if let Some(rest) = bytes.strip_prefix(&UTF16_LE_BOM) {
        return Cow::Owned(decode_utf16(rest, u16::from_le_bytes));
    }
    if let Some(rest) = bytes.strip_prefix(&UTF16_BE_BOM) {
        return Cow::Owned(decode_utf16(rest, u16::from_be_bytes));
    }
    String::from_utf8_lossy(bytes)
}

fn decode_utf16(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| unit([pair[0], pair[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_utf8_is_borrowed() {
        let text = decode_text(br#"{"thumbnail":"aGVsbG8="}"#);
        assert!(matches!(text, Cow::Borrowed(_)));
        assert_eq!(text, r#"{"thumbnail":"aGVsbG8="}"#);
    }

    #[test]
    fn utf8_bom_is_stripped() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice(b"{}");
        assert_eq!(decode_text(&bytes), "{}");
    }

    #[test]
    fn utf16_both_endians() {
        let text = "{\"thumbnail\":\"QQ==\"}";

        let mut le = UTF16_LE_BOM.to_vec();
        le.extend(text.encode_utf16().flat_map(u16::to_le_bytes));
        assert_eq!(decode_text(&le), text);

        let mut be = UTF16_BE_BOM.to_vec();
        be.extend(text.encode_utf16().flat_map(u16::to_be_bytes));
        assert_eq!(decode_text(&be), text);
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let text = decode_text(&[b'{', 0xC3, 0x28, b'}']);
        assert!(text.starts_with('{'));
        assert!(text.ends_with('}'));
        assert!(text.contains('\u{FFFD}'));
    }
}
