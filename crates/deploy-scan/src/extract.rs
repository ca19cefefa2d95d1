//! Section extraction.
//!
//! Groups the lines of a customized descriptor into named sections. Only the
//! structure matters here: comments and blank lines are dropped.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::line::{assignment, is_comment, is_quoted_property_key, section_header};
use crate::value::{parse_scalar, ScalarValue};

/// Sections keyed by dotted name, in first-seen order.
pub type SectionMap = IndexMap<String, Section>;

/// A `properties."name" = value` line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotedProperty {
    /// The full key, e.g. `properties."moesifKey"`.
    pub key: String,

    /// The trimmed source line, emitted verbatim.
    pub line: String,

    pub value: ScalarValue,
}

/// A named block of properties.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub name: String,

    /// Plain `key = value` properties in encounter order.
    pub regular_props: IndexMap<String, ScalarValue>,

    /// Quoted properties in encounter order.
    pub quoted_props: Vec<QuotedProperty>,

    pub is_array_table: bool,
}

impl Section {
    pub fn new(name: impl Into<String>, is_array_table: bool) -> Self {
        Self {
            name: name.into(),
            is_array_table,
            ..Default::default()
        }
    }

    /// No properties of either kind.
    pub fn is_empty(&self) -> bool {
        self.regular_props.is_empty() && self.quoted_props.is_empty()
    }
}

/// Extract sections from descriptor lines.
///
/// `array_tables` names sections that are array-tables even when written
/// with single brackets. All lines under the same name accumulate into one
/// section, wherever they occur. Assignments before the first header are
/// ignored.
pub fn extract_sections<I, S>(lines: I, array_tables: &HashSet<String>) -> SectionMap
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut sections = SectionMap::new();
    let mut current: Option<String> = None;

    for line in lines {
        let line = line.as_ref();

        if let Some(header) = section_header(line, false) {
            let is_array_table = header.is_array_table || array_tables.contains(&header.name);
            sections
                .entry(header.name.clone())
                .or_insert_with(|| Section::new(header.name.clone(), is_array_table));
            current = Some(header.name);
            continue;
        }

        if is_comment(line) {
            continue;
        }

        let (Some(name), Some(assign)) = (current.as_ref(), assignment(line)) else {
            continue;
        };
        let Some(section) = sections.get_mut(name) else {
            continue;
        };

        if is_quoted_property_key(assign.key) {
            section.quoted_props.push(QuotedProperty {
                key: assign.key.to_string(),
                line: line.trim().to_string(),
                value: parse_scalar(assign.value),
            });
        } else {
            section
                .regular_props
                .insert(assign.key.to_string(), parse_scalar(assign.value));
        }
    }

    sections
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = r#"# deployment.toml
[server]
hostname = "prod.example.com"
offset = 10

[apim.analytics]
enable = true
properties."moesifKey" = "abc123"

#[disabled]
#ignored = 1

[[custom.jwt.validators]]
issuer = "https://idp"
"#;

    fn extract(text: &str) -> SectionMap {
        extract_sections(text.lines(), &HashSet::new())
    }

    #[test]
    fn test_extracts_sections_in_order() {
        let sections = extract(SOURCE);
        let names: Vec<&str> = sections.keys().map(|k| k.as_str()).collect();
        assert_eq!(names, vec!["server", "apim.analytics", "custom.jwt.validators"]);
    }

    #[test]
    fn test_regular_properties_are_parsed() {
        let sections = extract(SOURCE);
        let server = &sections["server"];
        assert_eq!(
            server.regular_props["hostname"],
            ScalarValue::String("prod.example.com".to_string())
        );
        assert_eq!(server.regular_props["offset"], ScalarValue::Integer(10));
    }

    #[test]
    fn test_quoted_properties_keep_their_line() {
        let sections = extract(SOURCE);
        let analytics = &sections["apim.analytics"];
        assert_eq!(analytics.regular_props.len(), 1);
        assert_eq!(analytics.quoted_props.len(), 1);
        let quoted = &analytics.quoted_props[0];
        assert_eq!(quoted.key, "properties.\"moesifKey\"");
        assert_eq!(quoted.line, "properties.\"moesifKey\" = \"abc123\"");
        assert_eq!(quoted.value, ScalarValue::String("abc123".to_string()));
    }

    #[test]
    fn test_commented_lines_are_ignored() {
        let sections = extract(SOURCE);
        assert!(!sections.contains_key("disabled"));
        // The commented assignment did not leak into the previous section
        assert!(!sections["apim.analytics"].regular_props.contains_key("ignored"));
    }

    #[test]
    fn test_array_table_detection() {
        let sections = extract(SOURCE);
        assert!(sections["custom.jwt.validators"].is_array_table);
        assert!(!sections["server"].is_array_table);

        let configured: HashSet<String> = ["server".to_string()].into_iter().collect();
        let sections = extract_sections(SOURCE.lines(), &configured);
        assert!(sections["server"].is_array_table);
    }

    #[test]
    fn test_repeated_sections_accumulate() {
        let text = "[a]\nx = 1\n[b]\ny = 2\n[a]\nz = 3\nx = 4\n";
        let sections = extract(text);
        assert_eq!(sections.len(), 2);
        let a = &sections["a"];
        let keys: Vec<&str> = a.regular_props.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["x", "z"]);
        assert_eq!(a.regular_props["x"], ScalarValue::Integer(4));
    }

    #[test]
    fn test_assignments_before_first_header_are_ignored() {
        let sections = extract("top = 1\n[a]\nx = 1\n");
        assert_eq!(sections.len(), 1);
        assert!(!sections["a"].regular_props.contains_key("top"));
    }
}
