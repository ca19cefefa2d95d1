//! Rendering of sections the target does not have.

use deploy_scan::format_scalar;

use super::changes::{ChangeKind, ChangeLog};
use crate::detect::SectionCustomization;

/// Header line for a section.
pub(crate) fn render_header(name: &str, is_array_table: bool, newline: &str) -> String {
    if is_array_table {
        format!("[[{name}]]{newline}")
    } else {
        format!("[{name}]{newline}")
    }
}

/// Lines for a whole section: a blank separator, the header, then every
/// regular property followed by every quoted property.
pub(crate) fn render_orphan(
    name: &str,
    custom: &SectionCustomization,
    newline: &str,
    changes: &mut ChangeLog,
) -> Vec<String> {
    let mut lines = Vec::with_capacity(custom.len() + 2);
    lines.push(newline.to_string());
    lines.push(render_header(name, custom.is_array_table, newline));

    for (key, value) in &custom.regular_props {
        lines.push(format!("{key} = {}{newline}", format_scalar(value)));
        changes.push(ChangeKind::AddedSection, format!("{name}.{key}"));
    }
    for quoted in &custom.quoted_props {
        lines.push(format!("{}{newline}", quoted.line));
        changes.push(ChangeKind::AddedSection, format!("{name}.{}", quoted.key));
    }

    lines
}
