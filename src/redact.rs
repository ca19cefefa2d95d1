//! Sensitive-data filter boundary
//!
//! Redaction itself is done by an external tool. This module runs it on a
//! file, reads back how many sensitive fields it found, and gates a set of
//! files on the result (e.g. from a pre-commit hook).

use regex_lite::Regex;
use serde::Serialize;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::OnceLock;
use std::thread;
use std::time::{Duration, Instant};

/// Default limit for one redactor run.
pub const DEFAULT_REDACTOR_TIMEOUT: Duration = Duration::from_secs(60);

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Result of scanning one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FilterOutcome {
    pub sensitive_fields: usize,

    /// The file was rewritten with redacted values.
    pub rewritten: bool,
}

/// Errors from the redaction boundary
#[derive(Debug, thiserror::Error)]
pub enum RedactError {
    #[error("Failed to start redactor {program}: {source}")]
    Spawn { program: String, source: io::Error },

    #[error("Redactor I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Redactor timed out after {0:?}")]
    Timeout(Duration),

    #[error("Redactor exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("Redactor report not understood: {0}")]
    UnrecognizedReport(String),
}

/// Something that can count, and optionally redact, sensitive fields.
pub trait SensitiveDataFilter {
    /// Scan `path`. With `rewrite`, sensitive values are redacted in place.
    fn scan(&self, path: &Path, rewrite: bool) -> Result<FilterOutcome, RedactError>;
}

/// Runs an external redactor program.
///
/// Invoked as `<program> [args..] <file> --report` to scan, or
/// `<program> [args..] <file> -o <file>` to redact in place. The program
/// reports `Redacted N sensitive fields` on stderr.
#[derive(Debug, Clone)]
pub struct ExternalRedactor {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl ExternalRedactor {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: DEFAULT_REDACTOR_TIMEOUT,
        }
    }

    /// Arguments placed before the file path, e.g. the script for an
    /// interpreter.
    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn run(&self, path: &Path, rewrite: bool) -> Result<(ExitStatus, String), RedactError> {
        let mut command = Command::new(&self.program);
        command.args(&self.args).arg(path);
        if rewrite {
            command.arg("-o").arg(path);
        } else {
            command.arg("--report");
        }
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = command.spawn().map_err(|source| RedactError::Spawn {
            program: self.program.display().to_string(),
            source,
        })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let stdout_handle = thread::spawn(move || read_pipe(stdout));
        let stderr_handle = thread::spawn(move || read_pipe(stderr));

        let started = Instant::now();
        let status = loop {
            match child.try_wait()? {
                Some(status) => break status,
                None if started.elapsed() >= self.timeout => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(RedactError::Timeout(self.timeout));
                }
                None => thread::sleep(POLL_INTERVAL),
            }
        };

        let _ = stdout_handle.join();
        let stderr = stderr_handle.join().unwrap_or_default();
        Ok((status, stderr))
    }
}

impl SensitiveDataFilter for ExternalRedactor {
    fn scan(&self, path: &Path, rewrite: bool) -> Result<FilterOutcome, RedactError> {
        tracing::debug!(path = %path.display(), rewrite, "running redactor");
        let (status, stderr) = self.run(path, rewrite)?;

        if !status.success() {
            return Err(RedactError::Failed {
                status: status.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }

        let sensitive_fields = parse_report(&stderr)
            .ok_or_else(|| RedactError::UnrecognizedReport(stderr.trim().to_string()))?;
        Ok(FilterOutcome {
            sensitive_fields,
            rewritten: rewrite && sensitive_fields > 0,
        })
    }
}

fn read_pipe<R: Read>(pipe: Option<R>) -> String {
    let mut buf = String::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_string(&mut buf);
    }
    buf
}

/// Extract N from `Redacted N sensitive field(s)`.
pub fn parse_report(output: &str) -> Option<usize> {
    static REPORT_RE: OnceLock<Regex> = OnceLock::new();
    let re = REPORT_RE
        .get_or_init(|| Regex::new(r"Redacted (\d+) sensitive fields?").expect("static pattern"));
    re.captures(output)?.get(1)?.as_str().parse().ok()
}

/// A file that still contains sensitive data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlaggedFile {
    pub path: PathBuf,
    pub sensitive_fields: usize,
}

/// A file the filter could not check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GateFailure {
    pub path: PathBuf,
    pub message: String,
}

/// Result of gating a set of files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GateReport {
    pub clean: Vec<PathBuf>,
    pub flagged: Vec<FlaggedFile>,
    pub failures: Vec<GateFailure>,
}

impl GateReport {
    /// No sensitive data found and every file was checked.
    pub fn passed(&self) -> bool {
        self.flagged.is_empty() && self.failures.is_empty()
    }

    pub fn checked(&self) -> usize {
        self.clean.len() + self.flagged.len() + self.failures.len()
    }
}

/// Scan every `.toml` file in `files` in report mode. Other files are skipped.
pub fn check_files(filter: &dyn SensitiveDataFilter, files: &[PathBuf]) -> GateReport {
    let mut report = GateReport::default();

    for path in files.iter().filter(|p| is_toml(p)) {
        match filter.scan(path, false) {
            Ok(outcome) if outcome.sensitive_fields == 0 => report.clean.push(path.clone()),
            Ok(outcome) => report.flagged.push(FlaggedFile {
                path: path.clone(),
                sensitive_fields: outcome.sensitive_fields,
            }),
            Err(e) => {
                tracing::warn!(path = %path.display(), "redactor failed: {e}");
                report.failures.push(GateFailure {
                    path: path.clone(),
                    message: e.to_string(),
                });
            }
        }
    }

    report
}

fn is_toml(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("toml"))
        .unwrap_or(false)
}
