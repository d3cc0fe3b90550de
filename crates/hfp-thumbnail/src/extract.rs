//! Targeted scan for the embedded image field.
//!
//! Only one string-valued field is ever read, so this is a single regex scan
//! rather than a JSON parse. Escaped quotes and backslashes inside the value
//! do not end the match; escape sequences are left in place for the codec.

use hfp_core::{HfpError, HfpResult};
use regex::{Regex, RegexBuilder};
use std::ops::Range;
use std::sync::LazyLock;

/// Field name used by `.hfp` envelopes.
pub const DEFAULT_FIELD: &str = "thumbnail";

/// Compiled-size bound for a field pattern
const PATTERN_SIZE_LIMIT: usize = 1 << 20;

static DEFAULT_EXTRACTOR: LazyLock<Extractor> =
    LazyLock::new(|| Extractor::new(DEFAULT_FIELD).expect("valid default field regex"));

/// Raw (still escaped) field value and its byte span in the envelope text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedPayload {
    pub text: String,
    pub span: Range<usize>,
}

#[derive(Debug, Clone)]
pub struct Extractor {
    field: String,
    pattern: Regex,
}

impl Extractor {
    /// Build an extractor for `field` (matched case-insensitively).
    ///
    /// # Errors
    /// [`HfpError::Config`] if the field name is too long to compile.
    pub fn new(field: &str) -> HfpResult<Self> {
        let pattern = format!(r#"(?is)"{}"\s*:\s*"((?:\\.|[^"\\])*)""#, regex::escape(field));
        let pattern = RegexBuilder::new(&pattern)
            .size_limit(PATTERN_SIZE_LIMIT)
            .build()
            .map_err(|e| HfpError::Config(format!("thumbnail field ({} bytes): {e}", field.len())))?;
        Ok(Extractor {
            field: field.to_string(),
            pattern,
        })
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    /// String value of the first occurrence of the field. `None` when the
    /// field is absent or not a string; an empty first value counts as absent.
    pub fn extract(&self, text: &str) -> Option<ExtractedPayload> {
        let value = self.pattern.captures(text)?.get(1)?;
        if value.as_str().is_empty() {
            return None;
        }
        Some(ExtractedPayload {
            text: value.as_str().to_string(),
            span: value.range(),
        })
    }
}

impl Default for Extractor {
    fn default() -> Self {
        DEFAULT_EXTRACTOR.clone()
    }
}

/// Extract the `thumbnail` field.
pub fn extract(text: &str) -> Option<ExtractedPayload> {
    DEFAULT_EXTRACTOR.extract(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn simple_field() {
        let text = r#"{"thumbnail":"aGVsbG8="}"#;
        let p = extract(text).unwrap();
        assert_eq!(p.text, "aGVsbG8=");
        assert_eq!(&text[p.span.clone()], "aGVsbG8=");
    }

    #[test]
    fn whitespace_and_other_fields() {
        let text = "{\n  \"name\": \"x\",\n  \"thumbnail\"  :\t \"QUJD\",\n  \"size\": 3\n}";
        assert_eq!(extract(text).unwrap().text, "QUJD");
    }

    #[test]
    fn escaped_quote_does_not_end_value() {
        let text = r#"{"thumbnail":"ab\"cd\\","next":"zz"}"#;
        assert_eq!(extract(text).unwrap().text, r#"ab\"cd\\"#);
    }

    #[test]
    fn escaped_slash_and_newline_are_kept() {
        let text = r#"{"thumbnail":"iVBORw0\/KGgo=\n"}"#;
        assert_eq!(extract(text).unwrap().text, r#"iVBORw0\/KGgo=\n"#);
    }

    #[test]
    fn field_name_is_case_insensitive() {
        assert_eq!(extract(r#"{"Thumbnail":"QQ=="}"#).unwrap().text, "QQ==");
    }

    #[test]
    fn first_occurrence_wins() {
        let text = r#"{"thumbnail":"Zmlyc3Q=","thumbnail":"c2Vjb25k"}"#;
        assert_eq!(extract(text).unwrap().text, "Zmlyc3Q=");
    }

    #[test]
    fn absent_or_malformed_is_none() {
        assert!(extract(r#"{"preview":"aGVsbG8="}"#).is_none());
        assert!(extract(r#"{"thumbnail": 42}"#).is_none());
        assert!(extract(r#"{"thumbnail": null}"#).is_none());
        assert!(extract(r#"{"thumbnail":"unterminated"#).is_none());
        assert!(extract(r#"{"thumbnail":""}"#).is_none());
        assert!(extract("").is_none());
    }

    #[test]
    fn custom_field_is_escaped() {
        let e = Extractor::new("img.data").unwrap();
        assert_eq!(e.field(), "img.data");
        assert_eq!(e.extract(r#"{"img.data":"QQ=="}"#).unwrap().text, "QQ==");
        assert!(e.extract(r#"{"imgXdata":"QQ=="}"#).is_none());
    }

    #[test]
    fn empty_first_occurrence_hides_later_ones() {
        assert!(extract(r#"{"thumbnail":"","thumbnail":"QQ=="}"#).is_none());
    }

    #[test]
    fn oversized_field_name_is_config_error() {
        let err = Extractor::new(&"x".repeat(PATTERN_SIZE_LIMIT)).unwrap_err();
        assert!(matches!(err, HfpError::Config(_)), "{err}");
    }

    proptest! {
        #[test]
        fn never_panics_and_span_is_valid(text in ".{0,256}") {
            if let Some(p) = extract(&text) {
                prop_assert_eq!(&text[p.span.clone()], p.text.as_str());
            }
        }

        #[test]
        fn finds_any_base64_value(value in "[A-Za-z0-9+/]{1,64}={0,2}", prefix in "[a-z ,:]{0,16}") {
            let text = format!("{{{prefix}\"thumbnail\": \"{value}\"}}");
            prop_assert_eq!(extract(&text).map(|p| p.text), Some(value));
        }
    }
}
