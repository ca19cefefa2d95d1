//! Applied change log

use serde::Serialize;
use std::fmt;

/// What happened to a key during the merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// An active target line got the customized value.
    Modified,
    /// A commented target line was activated with the customized value.
    UncommentedAndModified,
    /// A property was inserted into an existing section.
    Added,
    /// A property was written as part of a section the target lacks.
    AddedSection,
    /// A commented section header was activated.
    UncommentedSection,
}

impl ChangeKind {
    pub fn label(&self) -> &'static str {
        match self {
            ChangeKind::Modified => "Modified",
            ChangeKind::UncommentedAndModified => "Uncommented and modified",
            ChangeKind::Added => "Added",
            ChangeKind::AddedSection => "Added section",
            ChangeKind::UncommentedSection => "Uncommented section",
        }
    }

    /// `Modified` or `UncommentedAndModified` depending on the line replaced.
    pub(crate) fn modified(was_commented: bool) -> Self {
        if was_commented {
            ChangeKind::UncommentedAndModified
        } else {
            ChangeKind::Modified
        }
    }
}

/// One entry of the change log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedChange {
    pub kind: ChangeKind,

    /// Dotted key, or the section name for section-level changes.
    pub key: String,
}

impl fmt::Display for AppliedChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.label(), self.key)
    }
}

/// Changes in the order they were applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ChangeLog(Vec<AppliedChange>);

impl ChangeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: ChangeKind, key: impl Into<String>) {
        self.0.push(AppliedChange {
            kind,
            key: key.into(),
        });
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AppliedChange> {
        self.0.iter()
    }

    /// Human-readable descriptions, e.g. `"Modified: server.hostname"`.
    pub fn descriptions(&self) -> Vec<String> {
        self.0.iter().map(|c| c.to_string()).collect()
    }

    pub fn count(&self, kind: ChangeKind) -> usize {
        self.0.iter().filter(|c| c.kind == kind).count()
    }
}

impl<'a> IntoIterator for &'a ChangeLog {
    type Item = &'a AppliedChange;
    type IntoIter = std::slice::Iter<'a, AppliedChange>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
