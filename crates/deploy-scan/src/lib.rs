//! Line scanner and value codec for TOML-like deployment descriptors.
//!
//! The source side of a migration is never parsed as a whole document. It is
//! scanned line by line, which tolerates hand-edited files that a strict TOML
//! parser would reject.

mod extract;
mod line;
mod value;

pub use extract::{extract_sections, QuotedProperty, Section, SectionMap};
pub use line::{
    assignment, dominant_line_ending, indentation, is_comment, is_quoted_property_key,
    line_ending, section_header, split_lines, Assignment, SectionHeader,
};
pub use value::{format_scalar, parse_scalar, ScalarValue};
