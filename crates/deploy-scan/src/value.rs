//! Scalar value codec.
//!
//! Parses the right-hand side of a `key = value` line into a typed value and
//! renders typed values back to TOML text. Parsing never fails: anything that
//! cannot be classified is kept as [`ScalarValue::Raw`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// A property value read from a deployment descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ScalarValue {
    /// Double-quoted string. Holds the text between the quotes as written.
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Array(Vec<ScalarValue>),
    /// Text that could not be classified, kept as written.
    Raw(String),
}

impl ScalarValue {
    /// Convert a value from a fully parsed TOML document.
    ///
    /// Datetimes and inline tables have no dedicated variant and are kept as
    /// their TOML rendering.
    pub fn from_toml(value: &toml::Value) -> Self {
        match value {
            toml::Value::String(s) => ScalarValue::String(s.clone()),
            toml::Value::Integer(i) => ScalarValue::Integer(*i),
            toml::Value::Float(f) => ScalarValue::Float(*f),
            toml::Value::Boolean(b) => ScalarValue::Boolean(*b),
            toml::Value::Datetime(dt) => ScalarValue::Raw(dt.to_string()),
            toml::Value::Array(items) => {
                ScalarValue::Array(items.iter().map(ScalarValue::from_toml).collect())
            }
            table @ toml::Value::Table(_) => ScalarValue::Raw(table.to_string()),
        }
    }

    /// True for the unclassified fallback variant.
    pub fn is_raw(&self) -> bool {
        matches!(self, ScalarValue::Raw(_))
    }
}

/// The rendering used when comparing values.
///
/// Strings render without quotes; everything else renders as
/// [`format_scalar`] does. Two values are "equal" for diffing purposes when
/// these renderings match, so `8080` and `8080.0` differ.
impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::String(s) | ScalarValue::Raw(s) => f.write_str(s),
            other => f.write_str(&format_scalar(other)),
        }
    }
}

/// Parse the value part of an assignment line.
pub fn parse_scalar(text: &str) -> ScalarValue {
    let text = strip_trailing_comment(text.trim()).trim();

    if text.starts_with('[') && text.ends_with(']') {
        return match parse_toml_array(text) {
            Some(items) => ScalarValue::Array(items),
            None => {
                tracing::debug!(value = text, "array did not parse, keeping raw text");
                ScalarValue::Raw(text.to_string())
            }
        };
    }

    if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
        return ScalarValue::String(text[1..text.len() - 1].to_string());
    }

    if text.eq_ignore_ascii_case("true") {
        return ScalarValue::Boolean(true);
    }
    if text.eq_ignore_ascii_case("false") {
        return ScalarValue::Boolean(false);
    }

    if let Some(digits) = without_digit_separators(text) {
        if digits.contains('.') {
            if let Ok(f) = digits.parse::<f64>() {
                return ScalarValue::Float(f);
            }
        } else if let Ok(i) = digits.parse::<i64>() {
            return ScalarValue::Integer(i);
        }
    }

    ScalarValue::Raw(text.to_string())
}

/// Render a value as TOML text.
pub fn format_scalar(value: &ScalarValue) -> String {
    match value {
        ScalarValue::String(s) => format!("\"{s}\""),
        ScalarValue::Integer(i) => i.to_string(),
        ScalarValue::Float(f) => format_float(*f),
        ScalarValue::Boolean(b) => b.to_string(),
        ScalarValue::Array(items) => {
            let rendered: Vec<String> = items
                .iter()
                .map(|item| match item {
                    ScalarValue::String(s) => quote_escaped(s),
                    other => format_scalar(other),
                })
                .collect();
            format!("[{}]", rendered.join(", "))
        }
        ScalarValue::Raw(raw) => {
            if is_toml_value(raw) {
                raw.clone()
            } else {
                format!("\"{raw}\"")
            }
        }
    }
}

/// Cut everything from the first `#` that is not inside a string.
fn strip_trailing_comment(text: &str) -> &str {
    let mut in_basic = false;
    let mut in_literal = false;
    let mut escaped = false;

    for (idx, ch) in text.char_indices() {
        if in_basic {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_basic = false,
                _ => {}
            }
            continue;
        }
        if in_literal {
            if ch == '\'' {
                in_literal = false;
            }
            continue;
        }
        match ch {
            '"' => in_basic = true,
            '\'' => in_literal = true,
            '#' => return &text[..idx],
            _ => {}
        }
    }
    text
}

/// Drop `_` separators, but only where TOML allows them (between digits).
fn without_digit_separators(text: &str) -> Option<String> {
    if !text.contains('_') {
        return Some(text.to_string());
    }
    let bytes = text.as_bytes();
    for (idx, b) in bytes.iter().enumerate() {
        if *b == b'_' {
            let before = idx.checked_sub(1).map(|i| bytes[i]);
            let after = bytes.get(idx + 1).copied();
            let between_digits = matches!(before, Some(c) if c.is_ascii_digit())
                && matches!(after, Some(c) if c.is_ascii_digit());
            if !between_digits {
                return None;
            }
        }
    }
    Some(text.replace('_', ""))
}

fn parse_toml_array(text: &str) -> Option<Vec<ScalarValue>> {
    let doc = toml::from_str::<toml::Table>(&format!("value = {text}")).ok()?;
    match doc.get("value")? {
        toml::Value::Array(items) => Some(items.iter().map(ScalarValue::from_toml).collect()),
        _ => None,
    }
}

fn is_toml_value(text: &str) -> bool {
    !text.contains('\n') && toml::from_str::<toml::Table>(&format!("value = {text}")).is_ok()
}

fn format_float(f: f64) -> String {
    if f.is_nan() {
        "nan".to_string()
    } else if f.is_infinite() {
        let sign = if f > 0.0 { "" } else { "-" };
        format!("{sign}inf")
    } else if f.fract() == 0.0 {
        format!("{f:.1}")
    } else {
        f.to_string()
    }
}

/// Render decoded text as a TOML basic string.
fn quote_escaped(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            c if c < '\u{20}' || c == '\u{7f}' => {
                out.push_str(&format!("\\u{:04X}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> ScalarValue {
        ScalarValue::String(v.to_string())
    }

    #[test]
    fn test_parse_quoted_string() {
        assert_eq!(parse_scalar("\"wso2carbon\""), s("wso2carbon"));
        // Inner content is not unescaped
        assert_eq!(parse_scalar(r#""C:\\path""#), s(r"C:\\path"));
    }

    #[test]
    fn test_parse_strips_trailing_comment() {
        assert_eq!(parse_scalar("9443 # https port"), ScalarValue::Integer(9443));
        assert_eq!(parse_scalar("\"a#b\" # note"), s("a#b"));
    }

    #[test]
    fn test_parse_booleans_case_insensitive() {
        assert_eq!(parse_scalar("true"), ScalarValue::Boolean(true));
        assert_eq!(parse_scalar("FALSE"), ScalarValue::Boolean(false));
    }

    #[test]
    fn test_parse_numbers() {
        assert_eq!(parse_scalar("8080"), ScalarValue::Integer(8080));
        assert_eq!(parse_scalar("-12"), ScalarValue::Integer(-12));
        assert_eq!(parse_scalar("1_000"), ScalarValue::Integer(1000));
        assert_eq!(parse_scalar("0.75"), ScalarValue::Float(0.75));
        assert_eq!(parse_scalar("8080.0"), ScalarValue::Float(8080.0));
    }

    #[test]
    fn test_parse_array() {
        assert_eq!(
            parse_scalar("[\"a\", \"b\"]"),
            ScalarValue::Array(vec![s("a"), s("b")])
        );
        assert_eq!(
            parse_scalar("[1, true, \"x\"]"),
            ScalarValue::Array(vec![ScalarValue::Integer(1), ScalarValue::Boolean(true), s("x")])
        );
    }

    #[test]
    fn test_malformed_values_degrade_to_raw() {
        assert_eq!(parse_scalar("[a, b"), ScalarValue::Raw("[a, b".to_string()));
        assert_eq!(parse_scalar("[a, b]"), ScalarValue::Raw("[a, b]".to_string()));
        assert_eq!(parse_scalar("localhost"), ScalarValue::Raw("localhost".to_string()));
        assert_eq!(parse_scalar("4.2.0"), ScalarValue::Raw("4.2.0".to_string()));
        assert_eq!(parse_scalar("1__0"), ScalarValue::Raw("1__0".to_string()));
    }

    #[test]
    fn test_format_scalars() {
        assert_eq!(format_scalar(&s("x")), "\"x\"");
        assert_eq!(format_scalar(&ScalarValue::Boolean(false)), "false");
        assert_eq!(format_scalar(&ScalarValue::Integer(42)), "42");
        assert_eq!(format_scalar(&ScalarValue::Float(8080.0)), "8080.0");
        assert_eq!(format_scalar(&ScalarValue::Float(0.5)), "0.5");
    }

    #[test]
    fn test_format_string_array_escapes_quotes() {
        let value = ScalarValue::Array(vec![s("say \"hi\""), s("plain")]);
        assert_eq!(format_scalar(&value), r#"["say \"hi\"", "plain"]"#);
    }

    #[test]
    fn test_format_string_array_escapes_control_characters() {
        let value = ScalarValue::Array(vec![s("a\nb\r\tc\u{8}\u{c}\u{1}\u{7f}")]);
        let once = format_scalar(&value);
        assert_eq!(once, r#"["a\nb\r\tc\b\f\u0001\u007F"]"#);

        // Decoding the rendering gives back the same elements
        assert_eq!(parse_scalar(&once), value);
        assert_eq!(format_scalar(&parse_scalar(&once)), once);
    }

    #[test]
    fn test_format_mixed_array() {
        let value = ScalarValue::Array(vec![
            ScalarValue::Integer(1),
            s("two"),
            ScalarValue::Boolean(true),
            ScalarValue::Float(2.5),
        ]);
        assert_eq!(format_scalar(&value), r#"[1, "two", true, 2.5]"#);
    }

    #[test]
    fn test_format_raw() {
        // Valid TOML values are emitted verbatim, anything else is quoted
        assert_eq!(
            format_scalar(&ScalarValue::Raw("1979-05-27T07:32:00Z".to_string())),
            "1979-05-27T07:32:00Z"
        );
        assert_eq!(format_scalar(&ScalarValue::Raw("localhost".to_string())), "\"localhost\"");
    }

    #[test]
    fn test_round_trip_is_stable() {
        let values = vec![
            s("hello world"),
            s("with # hash"),
            s("quote\"inside"),
            s("true"),
            ScalarValue::Integer(-7),
            ScalarValue::Float(8080.0),
            ScalarValue::Float(0.001),
            ScalarValue::Boolean(true),
            ScalarValue::Array(vec![]),
            ScalarValue::Array(vec![s("a\\b"), s("c\"d")]),
            ScalarValue::Array(vec![s("line\nbreak"), s("tab\there")]),
            ScalarValue::Array(vec![ScalarValue::Integer(1), ScalarValue::Array(vec![s("n")])]),
        ];
        for value in values {
            let once = format_scalar(&value);
            let twice = format_scalar(&parse_scalar(&once));
            assert_eq!(once, twice, "unstable rendering for {:?}", value);
        }
    }

    #[test]
    fn test_display_is_diff_rendering() {
        assert_eq!(s("localhost").to_string(), "localhost");
        assert_eq!(ScalarValue::Boolean(true).to_string(), "true");
        // Integer and float forms of the same number stay distinct
        assert_ne!(
            ScalarValue::Integer(8080).to_string(),
            ScalarValue::Float(8080.0).to_string()
        );
    }

    #[test]
    fn test_from_toml_datetime_is_raw() {
        let doc: toml::Table = toml::from_str("when = 1979-05-27T07:32:00Z").unwrap();
        let value = ScalarValue::from_toml(&doc["when"]);
        assert!(value.is_raw());
        assert_eq!(value.to_string(), "1979-05-27T07:32:00Z");
    }

    #[test]
    fn test_serialization() {
        let json = serde_json::to_string(&ScalarValue::Integer(3)).unwrap();
        assert_eq!(json, r#"{"type":"integer","value":3}"#);
    }
}
