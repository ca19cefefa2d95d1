//! Migration rules
//!
//! Loaded from `custom_migration_rules.json` (or a `.toml` file with the same
//! layout):
//!
//! ```json
//! {
//!   "ignore_patterns": ["server.hostname:localhost", "keystore.*.alias:wso2carbon"],
//!   "section_ordering": {
//!     "array_tables": ["apim.throttling.policy"],
//!     "rules": [
//!       {"parent": "apim.analytics", "child_sections": ["apim.analytics.properties"],
//!        "children_must_follow": true}
//!     ]
//!   }
//! }
//! ```

mod ignore;
mod ordering;

pub use ignore::{IgnorePattern, IgnoreSet, PatternError, DEFAULT_IGNORE_PATTERNS};
pub use ordering::{OrderingRule, SectionOrdering};

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default rules file name, looked up in the working directory.
pub const DEFAULT_RULES_FILE: &str = "custom_migration_rules.json";

/// Errors loading a rules file
#[derive(Debug, thiserror::Error)]
pub enum RulesError {
    #[error("Failed to read rules file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse JSON rules: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to parse TOML rules: {0}")]
    Toml(#[from] toml::de::Error),
}

/// The rules file as written on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RulesFile {
    #[serde(default)]
    pub ignore_patterns: Vec<String>,

    #[serde(default)]
    pub section_ordering: SectionOrdering,
}

/// Rules in effect for one migration.
#[derive(Debug, Clone, Default)]
pub struct MigrationRules {
    pub ignore: IgnoreSet,
    pub ordering: SectionOrdering,
}

impl From<RulesFile> for MigrationRules {
    fn from(file: RulesFile) -> Self {
        Self {
            ignore: IgnoreSet::from_entries(&file.ignore_patterns),
            ordering: file.section_ordering,
        }
    }
}

impl MigrationRules {
    /// Parse rules from JSON text.
    pub fn from_json(json: &str) -> Result<Self, RulesError> {
        let file: RulesFile = serde_json::from_str(json)?;
        Ok(file.into())
    }

    /// Parse rules from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, RulesError> {
        let file: RulesFile = toml::from_str(text)?;
        Ok(file.into())
    }

    /// Load rules, failing on any error.
    ///
    /// Files ending in `.toml` are read as TOML, everything else as JSON.
    pub fn from_file(path: &Path) -> Result<Self, RulesError> {
        let contents = fs::read_to_string(path)?;
        let is_toml = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("toml"))
            .unwrap_or(false);

        if is_toml {
            Self::from_toml(&contents)
        } else {
            Self::from_json(&contents)
        }
    }

    /// Load rules, falling back to defaults when the file is missing or
    /// malformed. Problems are reported as warnings.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            tracing::warn!(path = %path.display(), "rules file not found, using defaults");
            return Self::default();
        }

        match Self::from_file(path) {
            Ok(rules) => {
                tracing::debug!(
                    path = %path.display(),
                    patterns = rules.ignore.patterns().len(),
                    ordering_rules = rules.ordering.rules.len(),
                    "loaded migration rules"
                );
                rules
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), "error loading rules file, using defaults: {e}");
                Self::default()
            }
        }
    }
}
