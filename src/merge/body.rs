//! Section body rewriting
//!
//! Applies one section's customizations to the target lines between its
//! header and the next header (active or commented).

use std::collections::HashSet;

use deploy_scan::{assignment, format_scalar, indentation, line_ending, section_header};

use super::changes::{ChangeKind, ChangeLog};
use super::terminate;
use crate::detect::SectionCustomization;

/// Rewritten body lines and the index of the line that ends the body.
#[derive(Debug)]
pub(crate) struct ProcessedBody {
    pub lines: Vec<String>,
    pub next: usize,
}

/// Index of the first header at or after `start`, or the end of input.
pub(crate) fn body_end(lines: &[&str], start: usize) -> usize {
    lines[start..]
        .iter()
        .position(|line| section_header(line, true).is_some())
        .map(|offset| start + offset)
        .unwrap_or(lines.len())
}

/// Rewrite the body of `section` starting at `start`.
///
/// Customized keys replace their line in place, keeping its indentation and
/// activating it if it was commented out. A commented line is left alone
/// when the same key also has an active line in this body. Keys that never
/// appeared are inserted after the last active property, or at the top of
/// the body when there is none.
///
/// A rewritten line keeps the terminator of the line it replaces. Inserted
/// lines end with `newline`.
pub(crate) fn process_body(
    lines: &[&str],
    start: usize,
    section: &str,
    custom: &SectionCustomization,
    newline: &str,
    changes: &mut ChangeLog,
) -> ProcessedBody {
    let end = body_end(lines, start);
    let body = &lines[start..end];

    let active_keys: HashSet<&str> = body
        .iter()
        .filter_map(|line| assignment(line))
        .filter(|a| !a.commented)
        .map(|a| a.key)
        .collect();

    let mut out: Vec<String> = Vec::with_capacity(body.len() + custom.len());
    let mut applied: HashSet<&str> = HashSet::new();
    let mut quoted_applied = vec![false; custom.quoted_props.len()];
    let mut last_property: Option<usize> = None;

    for &line in body {
        let Some(assign) = assignment(line) else {
            out.push(line.to_string());
            continue;
        };
        let shadowed = assign.commented && active_keys.contains(assign.key);
        let ending = match line_ending(line) {
            "" => newline,
            ending => ending,
        };

        if !shadowed && !applied.contains(assign.key) {
            if let Some(value) = custom.regular_props.get(assign.key) {
                out.push(format!(
                    "{}{} = {}{ending}",
                    indentation(line),
                    assign.key,
                    format_scalar(value)
                ));
                changes.push(
                    ChangeKind::modified(assign.commented),
                    format!("{section}.{}", assign.key),
                );
                applied.insert(assign.key);
                last_property = Some(out.len() - 1);
                continue;
            }

            let quoted_idx = custom
                .quoted_props
                .iter()
                .enumerate()
                .position(|(idx, q)| !quoted_applied[idx] && q.key == assign.key);
            if let Some(idx) = quoted_idx {
                let quoted = &custom.quoted_props[idx];
                if !assign.commented && line.trim() == quoted.line {
                    out.push(line.to_string());
                } else {
                    out.push(format!("{}{}{ending}", indentation(line), quoted.line));
                    changes.push(
                        ChangeKind::modified(assign.commented),
                        format!("{section}.{}", quoted.key),
                    );
                }
                quoted_applied[idx] = true;
                last_property = Some(out.len() - 1);
                continue;
            }
        }

        out.push(line.to_string());
        if !assign.commented {
            last_property = Some(out.len() - 1);
        }
    }

    let mut missing = Vec::new();
    for (key, value) in &custom.regular_props {
        if !applied.contains(key.as_str()) {
            missing.push(format!("{key} = {}{newline}", format_scalar(value)));
            changes.push(ChangeKind::Added, format!("{section}.{key}"));
        }
    }
    for (quoted, done) in custom.quoted_props.iter().zip(&quoted_applied) {
        if !done {
            missing.push(format!("{}{newline}", quoted.line));
            changes.push(ChangeKind::Added, format!("{section}.{}", quoted.key));
        }
    }

    if !missing.is_empty() {
        let at = last_property.map(|idx| idx + 1).unwrap_or(0);
        if at > 0 {
            terminate(&mut out[at - 1], newline);
        }
        out.splice(at..at, missing);
    }

    ProcessedBody {
        lines: out,
        next: end,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deploy_scan::{QuotedProperty, ScalarValue};

    fn custom(props: &[(&str, ScalarValue)]) -> SectionCustomization {
        SectionCustomization {
            regular_props: props
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
            ..Default::default()
        }
    }

    fn string(s: &str) -> ScalarValue {
        ScalarValue::String(s.to_string())
    }

    fn quoted(key: &str, line: &str) -> QuotedProperty {
        QuotedProperty {
            key: key.to_string(),
            line: line.to_string(),
            value: ScalarValue::Raw(String::new()),
        }
    }

    #[test]
    fn test_body_end_stops_at_commented_header() {
        let lines = ["[a]\n", "x = 1\n", "#[b]\n", "y = 2\n"];
        assert_eq!(body_end(&lines, 1), 2);
        assert_eq!(body_end(&lines, 3), 4);
    }

    #[test]
    fn test_modifies_in_place_keeping_indentation() {
        let lines = ["[server]\n", "  hostname = \"localhost\"  # default\n", "offset = 0\n", "[next]\n"];
        let mut log = ChangeLog::new();
        let body = process_body(&lines, 1, "server", &custom(&[("hostname", string("prod"))]), "\n", &mut log);
        assert_eq!(body.lines, vec!["  hostname = \"prod\"\n", "offset = 0\n"]);
        assert_eq!(body.next, 3);
        assert_eq!(log.descriptions(), vec!["Modified: server.hostname"]);
    }

    #[test]
    fn test_uncomments_commented_property() {
        let lines = ["[apim]\n", "    #api_key = \"CHANGE_ME\"\n"];
        let mut log = ChangeLog::new();
        let body = process_body(&lines, 1, "apim", &custom(&[("api_key", string("real-key"))]), "\n", &mut log);
        assert_eq!(body.lines, vec!["    api_key = \"real-key\"\n"]);
        assert_eq!(log.descriptions(), vec!["Uncommented and modified: apim.api_key"]);
    }

    #[test]
    fn test_active_line_wins_over_commented_example() {
        let lines = ["[server]\n", "#offset = 5\n", "offset = 0\n"];
        let mut log = ChangeLog::new();
        let body = process_body(&lines, 1, "server", &custom(&[("offset", ScalarValue::Integer(3))]), "\n", &mut log);
        assert_eq!(body.lines, vec!["#offset = 5\n", "offset = 3\n"]);
        assert_eq!(log.count(ChangeKind::Modified), 1);
    }

    #[test]
    fn test_missing_props_go_after_last_active_property() {
        let lines = ["[server]\n", "hostname = \"x\"\n", "#node_ip = \"\"\n", "\n", "# trailing note\n"];
        let mut c = custom(&[("offset", ScalarValue::Integer(1))]);
        c.quoted_props.push(quoted("properties.\"k\"", "properties.\"k\" = \"v\""));
        let mut log = ChangeLog::new();
        let body = process_body(&lines, 1, "server", &c, "\n", &mut log);
        assert_eq!(
            body.lines,
            vec![
                "hostname = \"x\"\n",
                "offset = 1\n",
                "properties.\"k\" = \"v\"\n",
                "#node_ip = \"\"\n",
                "\n",
                "# trailing note\n",
            ]
        );
        assert_eq!(log.descriptions(), vec!["Added: server.offset", "Added: server.properties.\"k\""]);
    }

    #[test]
    fn test_missing_props_at_top_without_active_property() {
        let lines = ["[server]\n", "# comment only\n"];
        let mut log = ChangeLog::new();
        let body = process_body(&lines, 1, "server", &custom(&[("offset", ScalarValue::Integer(1))]), "\n", &mut log);
        assert_eq!(body.lines, vec!["offset = 1\n", "# comment only\n"]);
    }

    #[test]
    fn test_existing_quoted_line_is_kept() {
        let lines = ["[apim.analytics]\n", "properties.\"moesifKey\" = \"abc123\"\n"];
        let mut c = custom(&[]);
        c.quoted_props.push(quoted("properties.\"moesifKey\"", "properties.\"moesifKey\" = \"abc123\""));
        let mut log = ChangeLog::new();
        let body = process_body(&lines, 1, "apim.analytics", &c, "\n", &mut log);
        assert_eq!(body.lines, vec!["properties.\"moesifKey\" = \"abc123\"\n"]);
        assert!(log.is_empty());
    }

    #[test]
    fn test_quoted_line_replaces_different_value() {
        let lines = ["[apim.analytics]\n", "#properties.\"moesifKey\" = \"\"\n"];
        let mut c = custom(&[]);
        c.quoted_props.push(quoted("properties.\"moesifKey\"", "properties.\"moesifKey\" = \"abc123\""));
        let mut log = ChangeLog::new();
        let body = process_body(&lines, 1, "apim.analytics", &c, "\n", &mut log);
        assert_eq!(body.lines, vec!["properties.\"moesifKey\" = \"abc123\"\n"]);
        assert_eq!(
            log.descriptions(),
            vec!["Uncommented and modified: apim.analytics.properties.\"moesifKey\""]
        );
    }

    #[test]
    fn test_insert_after_unterminated_last_line() {
        let lines = ["[server]\n", "hostname = \"x\""];
        let mut log = ChangeLog::new();
        let body = process_body(&lines, 1, "server", &custom(&[("offset", ScalarValue::Integer(1))]), "\n", &mut log);
        assert_eq!(body.lines, vec!["hostname = \"x\"\n", "offset = 1\n"]);
    }

    #[test]
    fn test_crlf_endings_are_kept() {
        let lines = ["[server]\r\n", "#hostname = \"localhost\"\r\n", "\r\n"];
        let mut c = custom(&[("hostname", string("prod"))]);
        c.regular_props.insert("offset".to_string(), ScalarValue::Integer(1));
        let mut log = ChangeLog::new();
        let body = process_body(&lines, 1, "server", &c, "\r\n", &mut log);
        assert_eq!(
            body.lines,
            vec!["hostname = \"prod\"\r\n", "offset = 1\r\n", "\r\n"]
        );
    }
}
