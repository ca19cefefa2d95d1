//! Deploy Migrate - carry deployment.toml customizations forward
//!
//! This crate moves the values an operator customized in an old deployment
//! descriptor onto the newer template shipped with an upgrade, keeping the
//! template's layout, comments and ordering intact.

pub mod detect;
pub mod error;
pub mod merge;
pub mod migrate;
pub mod redact;
pub mod rules;
pub mod validate;

pub use detect::{find_customizations, CustomizationSet, SectionCustomization};
pub use error::{MigrateError, MigrateResult};
pub use merge::{merge_into_target, AppliedChange, ChangeKind, ChangeLog, MergeOutcome};
pub use migrate::{migrate_text, MigrationOptions, MigrationReport, Migrator, TextMigration};
pub use redact::{check_files, ExternalRedactor, GateReport, RedactError, SensitiveDataFilter};
pub use rules::{IgnoreSet, MigrationRules, SectionOrdering};
pub use validate::{validate_file, ValidationReport};
