//! Migration errors
//!
//! Only file I/O and a malformed target abort a migration. Everything that
//! goes wrong at the line level degrades instead of failing.

use std::io;
use std::path::PathBuf;

/// Fatal migration error. Nothing has been written when one is returned.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    #[error("Failed to read source file {path}: {source}")]
    SourceRead { path: PathBuf, source: io::Error },

    #[error("Failed to read target file {path}: {source}")]
    TargetRead { path: PathBuf, source: io::Error },

    #[error("Target file {path} is not valid TOML: {source}")]
    TargetParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to back up {path}: {source}")]
    Backup { path: PathBuf, source: io::Error },

    #[error("Failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("Failed to read migrated file {path}: {source}")]
    OutputRead { path: PathBuf, source: io::Error },

    #[error("Migrated file {path} is not valid TOML: {source}")]
    OutputParse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

pub type MigrateResult<T> = Result<T, MigrateError>;
