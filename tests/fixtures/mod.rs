//! Test fixtures for migration golden-file assertions
//!
//! - `source.toml`: customized descriptor from the previous release
//! - `target.toml`: template shipped with the new release
//! - `expected.toml`: the merge of the two under `rules.json`

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

/// Path to the customized source descriptor
pub fn source_path() -> PathBuf {
    fixture("source.toml")
}

/// Path to the new template
pub fn target_path() -> PathBuf {
    fixture("target.toml")
}

/// Path to the golden migrated output
pub fn expected_path() -> PathBuf {
    fixture("expected.toml")
}

/// Path to the migration rules
pub fn rules_path() -> PathBuf {
    fixture("rules.json")
}

pub fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e))
}
