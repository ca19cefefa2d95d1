//! Structure-preserving merge
//!
//! Replays the target template line by line. Customized sections get their
//! bodies rewritten in place, commented-out sections are activated when the
//! source customizes them, and sections the target lacks entirely are
//! appended at the end. Every other line is copied byte for byte. New lines
//! use the target's dominant line ending.

mod body;
mod changes;
mod orphan;

pub use changes::{AppliedChange, ChangeKind, ChangeLog};

use std::collections::{BTreeMap, HashSet};

use deploy_scan::{dominant_line_ending, section_header};

use crate::detect::CustomizationSet;
use crate::rules::SectionOrdering;
use body::process_body;
use orphan::{render_header, render_orphan};

/// Comment introducing appended sections.
pub const ADDITIONAL_SECTIONS_COMMENT: &str = "# Additional sections from source file";

/// Result of a merge.
#[derive(Debug, Clone, Default)]
pub struct MergeOutcome {
    /// Output lines, each with its terminator (the last may have none).
    pub lines: Vec<String>,
    pub changes: ChangeLog,
}

impl MergeOutcome {
    pub fn text(&self) -> String {
        self.lines.concat()
    }
}

/// Apply `customizations` to the target's lines.
pub fn merge_into_target(
    target_lines: &[&str],
    customizations: &CustomizationSet,
    ordering: &SectionOrdering,
) -> MergeOutcome {
    let mut target_sections = HashSet::new();
    let mut active_sections = HashSet::new();
    for header in target_lines.iter().filter_map(|line| section_header(line, true)) {
        if !header.commented {
            active_sections.insert(header.name.clone());
        }
        target_sections.insert(header.name);
    }

    let newline = dominant_line_ending(target_lines);
    let mut merger = Merger {
        lines: target_lines,
        customizations,
        ordering,
        target_sections,
        active_sections,
        processed: HashSet::new(),
        newline,
        output: Output {
            lines: Vec::new(),
            newline,
        },
        changes: ChangeLog::new(),
    };
    merger.run();

    MergeOutcome {
        lines: merger.output.lines,
        changes: merger.changes,
    }
}

/// Make sure a line ends with a newline before something follows it.
fn terminate(line: &mut String, newline: &str) {
    if !line.ends_with('\n') {
        line.push_str(newline);
    }
}

#[derive(Debug)]
struct Output {
    lines: Vec<String>,
    newline: &'static str,
}

impl Output {
    fn push(&mut self, line: impl Into<String>) {
        if let Some(last) = self.lines.last_mut() {
            terminate(last, self.newline);
        }
        self.lines.push(line.into());
    }

    fn extend(&mut self, lines: impl IntoIterator<Item = String>) {
        for line in lines {
            self.push(line);
        }
    }
}

struct Merger<'a> {
    lines: &'a [&'a str],
    customizations: &'a CustomizationSet,
    ordering: &'a SectionOrdering,
    /// Every section named in the target, active or commented.
    target_sections: HashSet<String>,
    /// Sections with an active header somewhere in the target.
    active_sections: HashSet<String>,
    processed: HashSet<String>,
    newline: &'static str,
    output: Output,
    changes: ChangeLog,
}

impl<'a> Merger<'a> {
    fn run(&mut self) {
        let mut i = 0;
        while i < self.lines.len() {
            let line = self.lines[i];

            match section_header(line, true) {
                Some(header) if !header.commented => {
                    self.output.push(line);
                    // Every occurrence of a repeated array-table is rewritten
                    if self.customizations.contains_key(&header.name) {
                        i = self.process_section(&header.name, i + 1);
                        continue;
                    }
                }
                // Left commented when an active header of the same name
                // exists, which the customization is applied to instead
                Some(header)
                    if self.is_pending(&header.name)
                        && !self.active_sections.contains(&header.name) =>
                {
                    let custom = &self.customizations[&header.name];
                    let is_array_table = header.is_array_table || custom.is_array_table;
                    self.output
                        .push(render_header(&header.name, is_array_table, self.newline));
                    self.changes
                        .push(ChangeKind::UncommentedSection, header.name.clone());
                    tracing::debug!(section = %header.name, "uncommented section");
                    i = self.process_section(&header.name, i + 1);
                    continue;
                }
                _ => self.output.push(line),
            }
            i += 1;
        }

        self.append_source_only();
    }

    /// Customized and not handled yet.
    fn is_pending(&self, name: &str) -> bool {
        self.customizations.contains_key(name) && !self.processed.contains(name)
    }

    /// Rewrite a section body and place its following children. Returns the
    /// index to resume at.
    fn process_section(&mut self, name: &str, start: usize) -> usize {
        let customizations = self.customizations;
        let custom = &customizations[name];

        let body = process_body(
            self.lines,
            start,
            name,
            custom,
            self.newline,
            &mut self.changes,
        );
        self.output.extend(body.lines);
        self.processed.insert(name.to_string());
        tracing::debug!(section = %name, resume = body.next, "processed section");

        self.place_following_children(name);
        body.next
    }

    /// Emit declared children of `parent` that the target lacks, right after
    /// the parent.
    fn place_following_children(&mut self, parent: &str) {
        let ordering = self.ordering;
        for child in ordering.following_children(parent) {
            if self.target_sections.contains(child) {
                continue;
            }
            if self.is_pending(child) {
                self.emit_orphan(child);
            }
        }
    }

    fn emit_orphan(&mut self, name: &str) {
        let customizations = self.customizations;
        let lines = render_orphan(name, &customizations[name], self.newline, &mut self.changes);
        self.output.extend(lines);
        self.processed.insert(name.to_string());
    }

    /// Append customized sections the target never mentions.
    fn append_source_only(&mut self) {
        let customizations = self.customizations;
        let ordering = self.ordering;

        let pending: Vec<&str> = customizations
            .keys()
            .map(|name| name.as_str())
            .filter(|name| !self.target_sections.contains(*name) && !self.processed.contains(*name))
            .collect();
        if pending.is_empty() {
            return;
        }
        tracing::debug!(count = pending.len(), "appending sections missing from target");

        self.output.push(self.newline);
        self.output
            .push(format!("{ADDITIONAL_SECTIONS_COMMENT}{}", self.newline));

        let mut unparented: Vec<&str> = pending
            .iter()
            .copied()
            .filter(|name| ordering.parent_of(name).is_none())
            .collect();
        unparented.sort_unstable();

        for name in unparented {
            self.emit_orphan(name);
            for child in ordering.following_children(name) {
                if pending.contains(&child.as_str())
                    && ordering.parent_of(child) == Some(name)
                    && !self.processed.contains(child)
                {
                    self.emit_orphan(child);
                }
            }
        }

        // Children whose parent was not appended above, grouped by parent in
        // the parent's declared order.
        let mut by_parent: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for name in pending {
            if self.processed.contains(name) {
                continue;
            }
            if let Some(parent) = ordering.parent_of(name) {
                by_parent.entry(parent).or_default().push(name);
            }
        }
        for (parent, mut children) in by_parent {
            let declared = ordering.children_of(parent);
            children.sort_by_key(|child| {
                let pos = declared.iter().position(|d| d == child).unwrap_or(usize::MAX);
                (pos, *child)
            });
            for child in children {
                self.emit_orphan(child);
            }
        }
    }
}
