//! Section ordering rules
//!
//! Decides where sections missing from the target are placed. A rule names a
//! parent and its children; when `children_must_follow` is set, children are
//! emitted right after the parent. The first rule mentioning a section wins.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A parent section and the children that belong with it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderingRule {
    pub parent: String,

    #[serde(default)]
    pub child_sections: Vec<String>,

    #[serde(default)]
    pub children_must_follow: bool,
}

/// The `section_ordering` block of the rules file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionOrdering {
    /// Sections that are array-tables even when written `[name]`.
    #[serde(default)]
    pub array_tables: HashSet<String>,

    #[serde(default)]
    pub rules: Vec<OrderingRule>,
}

impl SectionOrdering {
    /// Parent declared for a section, if any.
    pub fn parent_of(&self, section: &str) -> Option<&str> {
        self.rules
            .iter()
            .find(|rule| rule.child_sections.iter().any(|c| c == section))
            .map(|rule| rule.parent.as_str())
    }

    /// Declared children of a parent, in rule order.
    pub fn children_of(&self, parent: &str) -> &[String] {
        self.rules
            .iter()
            .find(|rule| rule.parent == parent && !rule.child_sections.is_empty())
            .map(|rule| rule.child_sections.as_slice())
            .unwrap_or(&[])
    }

    /// Whether children must be emitted immediately after the parent.
    pub fn children_must_follow(&self, parent: &str) -> bool {
        self.rules
            .iter()
            .find(|rule| rule.parent == parent)
            .map(|rule| rule.children_must_follow)
            .unwrap_or(false)
    }

    /// Children to place right after `parent`, or nothing if the parent's
    /// rule does not require it.
    pub fn following_children(&self, parent: &str) -> &[String] {
        if self.children_must_follow(parent) {
            self.children_of(parent)
        } else {
            &[]
        }
    }

    pub fn is_array_table(&self, section: &str) -> bool {
        self.array_tables.contains(section)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(parent: &str, children: &[&str], follow: bool) -> OrderingRule {
        OrderingRule {
            parent: parent.to_string(),
            child_sections: children.iter().map(|c| c.to_string()).collect(),
            children_must_follow: follow,
        }
    }

    fn ordering() -> SectionOrdering {
        SectionOrdering {
            array_tables: ["apim.throttling.policy".to_string()].into_iter().collect(),
            rules: vec![
                rule("apim.analytics", &["apim.analytics.properties"], true),
                rule("apim.key_manager", &["apim.key_manager.configuration"], false),
                rule("apim.gateway", &["apim.analytics.properties"], true),
            ],
        }
    }

    #[test]
    fn test_parent_of() {
        let ordering = ordering();
        assert_eq!(ordering.parent_of("apim.key_manager.configuration"), Some("apim.key_manager"));
        assert_eq!(ordering.parent_of("server"), None);
    }

    #[test]
    fn test_first_rule_wins_for_conflicting_parents() {
        let ordering = ordering();
        assert_eq!(ordering.parent_of("apim.analytics.properties"), Some("apim.analytics"));
    }

    #[test]
    fn test_children_and_follow_flag() {
        let ordering = ordering();
        assert_eq!(ordering.children_of("apim.analytics"), ["apim.analytics.properties"]);
        assert!(ordering.children_must_follow("apim.analytics"));
        assert!(!ordering.children_must_follow("apim.key_manager"));
        assert!(ordering.following_children("apim.key_manager").is_empty());
        assert!(ordering.children_of("unknown").is_empty());
    }

    #[test]
    fn test_array_tables() {
        let ordering = ordering();
        assert!(ordering.is_array_table("apim.throttling.policy"));
        assert!(!ordering.is_array_table("apim.analytics"));
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let ordering: SectionOrdering = serde_json::from_str(
            r#"{"rules": [{"parent": "a", "child_sections": ["a.b"]}]}"#,
        )
        .unwrap();
        assert!(ordering.array_tables.is_empty());
        assert!(!ordering.rules[0].children_must_follow);
    }
}
