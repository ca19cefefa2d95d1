//! Migration driver
//!
//! Reads the source and target, computes the customization set, merges it
//! into the target's lines and writes the result in one go. The target is
//! backed up first when it is about to be overwritten.

use chrono::{DateTime, Local};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use deploy_scan::{extract_sections, split_lines};

use crate::detect::{find_customizations, CustomizationSet};
use crate::error::{MigrateError, MigrateResult};
use crate::merge::{merge_into_target, ChangeLog, MergeOutcome};
use crate::rules::MigrationRules;
use crate::validate::{validate_file, ValidationReport};

/// Options for a single migration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationOptions {
    /// Copy the target aside before overwriting it in place.
    pub create_backup: bool,

    /// Compute customizations only; write nothing.
    pub dry_run: bool,
}

impl Default for MigrationOptions {
    fn default() -> Self {
        Self {
            create_backup: true,
            dry_run: false,
        }
    }
}

/// In-memory result of migrating one text onto another.
#[derive(Debug, Clone)]
pub struct TextMigration {
    pub customizations: CustomizationSet,
    pub outcome: MergeOutcome,
}

/// What a migration did.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationReport {
    pub source: PathBuf,
    pub target: PathBuf,
    pub output: PathBuf,
    pub dry_run: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup: Option<PathBuf>,

    pub customizations: CustomizationSet,
    pub changes: ChangeLog,
}

impl MigrationReport {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Compute the customizations of `source` relative to a parsed target.
pub fn detect_customizations(
    source: &str,
    target: &toml::Table,
    rules: &MigrationRules,
) -> CustomizationSet {
    let sections = extract_sections(source.lines(), &rules.ordering.array_tables);
    find_customizations(&sections, target, &rules.ignore)
}

/// Migrate `source` onto `target` in memory.
///
/// Fails only when `target` is not valid TOML.
pub fn migrate_text(
    source: &str,
    target: &str,
    rules: &MigrationRules,
) -> Result<TextMigration, toml::de::Error> {
    let target_doc: toml::Table = toml::from_str(target)?;
    let customizations = detect_customizations(source, &target_doc, rules);
    let outcome = merge_into_target(&split_lines(target), &customizations, &rules.ordering);
    Ok(TextMigration {
        customizations,
        outcome,
    })
}

/// File-level migration of a customized descriptor onto a newer template.
#[derive(Debug, Clone)]
pub struct Migrator {
    source: PathBuf,
    target: PathBuf,
    output: PathBuf,
    rules: MigrationRules,
}

impl Migrator {
    /// Output defaults to `<target stem>.migrated.toml` next to the target.
    pub fn new(source: impl Into<PathBuf>, target: impl Into<PathBuf>, rules: MigrationRules) -> Self {
        let target = target.into();
        Self {
            source: source.into(),
            output: default_output_path(&target),
            target,
            rules,
        }
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = output.into();
        self
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn rules(&self) -> &MigrationRules {
        &self.rules
    }

    /// Run the migration.
    ///
    /// Both inputs are read and the target parsed before anything is
    /// written, so an error leaves every file untouched.
    pub fn migrate(&self, options: &MigrationOptions) -> MigrateResult<MigrationReport> {
        tracing::info!(
            source = %self.source.display(),
            target = %self.target.display(),
            "migrating"
        );

        let target_text = fs::read_to_string(&self.target).map_err(|source| MigrateError::TargetRead {
            path: self.target.clone(),
            source,
        })?;
        let target_doc: toml::Table =
            toml::from_str(&target_text).map_err(|source| MigrateError::TargetParse {
                path: self.target.clone(),
                source,
            })?;
        let source_text = fs::read_to_string(&self.source).map_err(|source| MigrateError::SourceRead {
            path: self.source.clone(),
            source,
        })?;

        let customizations = detect_customizations(&source_text, &target_doc, &self.rules);
        tracing::info!(sections = customizations.len(), "found customizations");

        let mut report = MigrationReport {
            source: self.source.clone(),
            target: self.target.clone(),
            output: self.output.clone(),
            dry_run: options.dry_run,
            backup: None,
            customizations,
            changes: ChangeLog::new(),
        };
        if options.dry_run {
            return Ok(report);
        }

        let outcome = merge_into_target(
            &split_lines(&target_text),
            &report.customizations,
            &self.rules.ordering,
        );

        if options.create_backup && same_file(&self.output, &self.target) {
            let backup = backup_path(&self.target, Local::now());
            fs::copy(&self.target, &backup).map_err(|source| MigrateError::Backup {
                path: backup.clone(),
                source,
            })?;
            tracing::info!(backup = %backup.display(), "backup created");
            report.backup = Some(backup);
        }

        write_atomic(&self.output, &outcome.text()).map_err(|source| MigrateError::Write {
            path: self.output.clone(),
            source,
        })?;
        tracing::info!(
            output = %self.output.display(),
            changes = outcome.changes.len(),
            "migration completed"
        );

        report.changes = outcome.changes;
        Ok(report)
    }

    /// Re-read the output and check it.
    pub fn validate(&self) -> MigrateResult<ValidationReport> {
        validate_file(&self.output)
    }
}

/// `deployment.toml` -> `deployment.migrated.toml`
pub fn default_output_path(target: &Path) -> PathBuf {
    target.with_extension("migrated.toml")
}

/// `deployment.toml` -> `deployment.backup_20240131_235959.toml`
pub fn backup_path(target: &Path, at: DateTime<Local>) -> PathBuf {
    target.with_extension(format!("backup_{}.toml", at.format("%Y%m%d_%H%M%S")))
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Write-then-rename so readers never see a partial file.
fn write_atomic(path: &Path, contents: &str) -> std::io::Result<()> {
    let mut temp_name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);

    fs::write(&temp_path, contents)?;
    fs::rename(&temp_path, path)
}
