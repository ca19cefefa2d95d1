//! Ignore patterns
//!
//! A pattern pins a known default, e.g. `server.hostname:localhost`. A source
//! property matching one is never carried over. `*` in the key matches
//! exactly one dot-delimited component, so `keystore.*.alias` matches
//! `keystore.tls.alias` but not `keystore.tls.primary.alias`.

use regex_lite::Regex;
use serde::Serialize;

use deploy_scan::ScalarValue;

/// Patterns used when the rules file provides none.
pub const DEFAULT_IGNORE_PATTERNS: &[(&str, &str)] = &[
    ("server.hostname", "localhost"),
    ("super_admin.username", "admin"),
    ("super_admin.password", "admin"),
];

/// Errors for a single pattern entry
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
    #[error("Invalid ignore pattern '{0}': expected 'key:value'")]
    MissingSeparator(String),

    #[error("Invalid ignore pattern key '{key}': {reason}")]
    BadKey { key: String, reason: String },
}

/// One `key:value` ignore rule.
#[derive(Debug, Clone, Serialize)]
pub struct IgnorePattern {
    pub key: String,
    pub value: String,
    #[serde(skip)]
    wildcard: Option<Regex>,
}

impl IgnorePattern {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Result<Self, PatternError> {
        let key = key.into();
        let wildcard = if key.contains('*') {
            let body = key
                .split('*')
                .map(regex_lite::escape)
                .collect::<Vec<_>>()
                .join("[^.]+");
            let regex = Regex::new(&format!("^{body}$")).map_err(|e| PatternError::BadKey {
                key: key.clone(),
                reason: e.to_string(),
            })?;
            Some(regex)
        } else {
            None
        };

        Ok(Self {
            key,
            value: value.into(),
            wildcard,
        })
    }

    /// Parse the `key:value` form. The key ends at the first `:`.
    pub fn parse(entry: &str) -> Result<Self, PatternError> {
        let (key, value) = entry
            .split_once(':')
            .ok_or_else(|| PatternError::MissingSeparator(entry.to_string()))?;
        Self::new(key, value)
    }

    pub fn matches_key(&self, full_key: &str) -> bool {
        match &self.wildcard {
            Some(regex) => regex.is_match(full_key),
            None => self.key == full_key,
        }
    }

    /// Values compare by their rendering, so `admin` matches the string
    /// `"admin"` and `false` matches the boolean.
    pub fn matches(&self, full_key: &str, value: &ScalarValue) -> bool {
        value.to_string() == self.value && self.matches_key(full_key)
    }
}

/// An ordered set of ignore patterns.
#[derive(Debug, Clone, Serialize)]
pub struct IgnoreSet {
    patterns: Vec<IgnorePattern>,
}

impl Default for IgnoreSet {
    fn default() -> Self {
        let patterns = DEFAULT_IGNORE_PATTERNS
            .iter()
            .filter_map(|(key, value)| IgnorePattern::new(*key, *value).ok())
            .collect();
        Self { patterns }
    }
}

impl IgnoreSet {
    pub fn new(patterns: Vec<IgnorePattern>) -> Self {
        Self { patterns }
    }

    /// Build from `key:value` entries.
    ///
    /// Invalid entries are skipped with a warning. If nothing valid remains
    /// the built-in defaults are used.
    pub fn from_entries<S: AsRef<str>>(entries: &[S]) -> Self {
        let mut patterns = Vec::new();
        for entry in entries {
            match IgnorePattern::parse(entry.as_ref()) {
                Ok(pattern) => patterns.push(pattern),
                Err(e) => tracing::warn!("{e}"),
            }
        }

        if patterns.is_empty() {
            tracing::debug!("no ignore patterns configured, using defaults");
            return Self::default();
        }
        Self { patterns }
    }

    pub fn patterns(&self) -> &[IgnorePattern] {
        &self.patterns
    }

    pub fn is_ignored(&self, full_key: &str, value: &ScalarValue) -> bool {
        self.patterns.iter().any(|p| p.matches(full_key, value))
    }
}
