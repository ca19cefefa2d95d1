//! Line classification.
//!
//! Both the extractor and the merger look at descriptors one line at a time
//! and must agree on what a section header or an assignment is.

/// Prefix of quoted property keys such as `properties."moesifKey"`.
const QUOTED_KEY_PREFIX: &str = "properties.\"";

/// A section header found on a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionHeader {
    /// Dotted section name, e.g. `apim.analytics`.
    pub name: String,

    /// Written as `[[name]]`.
    pub is_array_table: bool,

    /// Written behind a `#`, e.g. `#[apim.analytics]`.
    pub commented: bool,
}

/// A `key = value` line, possibly commented out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assignment<'a> {
    pub key: &'a str,
    pub value: &'a str,
    pub commented: bool,
}

/// Split text into lines, keeping each line's terminator.
pub fn split_lines(text: &str) -> Vec<&str> {
    text.split_inclusive('\n').collect()
}

/// Detect a section header.
///
/// A header is a trimmed line that starts with `[` and ends with `]`. With
/// `include_commented`, a line starting `#[` is also a header once the `#` is
/// removed.
pub fn section_header(line: &str, include_commented: bool) -> Option<SectionHeader> {
    let mut stripped = line.trim();
    let mut commented = false;

    if include_commented && stripped.starts_with("#[") {
        stripped = stripped[1..].trim();
        commented = true;
    }

    if !(stripped.starts_with('[') && stripped.ends_with(']')) {
        return None;
    }

    let (name, is_array_table) = if stripped.starts_with("[[") && stripped.ends_with("]]") {
        (&stripped[2..stripped.len() - 2], true)
    } else {
        (&stripped[1..stripped.len() - 1], false)
    };

    Some(SectionHeader {
        name: name.trim().to_string(),
        is_array_table,
        commented,
    })
}

/// Detect an assignment, active or commented out.
///
/// The key is everything before the first `=`. Lines without `=` are not
/// assignments.
pub fn assignment(line: &str) -> Option<Assignment<'_>> {
    let stripped = line.trim();
    let commented = stripped.starts_with('#');
    let body = if commented { stripped[1..].trim() } else { stripped };
    let (key, value) = body.split_once('=')?;

    Some(Assignment {
        key: key.trim(),
        value: value.trim(),
        commented,
    })
}

/// Whether the trimmed line is a comment.
pub fn is_comment(line: &str) -> bool {
    line.trim_start().starts_with('#')
}

/// Terminator of a line: `"\r\n"`, `"\n"`, or empty for an unterminated
/// last line.
pub fn line_ending(line: &str) -> &'static str {
    if line.ends_with("\r\n") {
        "\r\n"
    } else if line.ends_with('\n') {
        "\n"
    } else {
        ""
    }
}

/// The terminator most lines use. Ties and unterminated input give `"\n"`.
pub fn dominant_line_ending(lines: &[&str]) -> &'static str {
    let crlf = lines.iter().filter(|line| line.ends_with("\r\n")).count();
    let lf = lines.iter().filter(|line| line.ends_with('\n')).count() - crlf;
    if crlf > lf {
        "\r\n"
    } else {
        "\n"
    }
}

/// Leading whitespace of a line.
pub fn indentation(line: &str) -> &str {
    &line[..line.len() - line.trim_start().len()]
}

/// True for keys of the form `properties."<name>"`.
pub fn is_quoted_property_key(key: &str) -> bool {
    key.len() > QUOTED_KEY_PREFIX.len() && key.starts_with(QUOTED_KEY_PREFIX) && key.ends_with('"')
}
