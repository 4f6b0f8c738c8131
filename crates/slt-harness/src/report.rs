//! Per-record outcomes and the per-file / per-run reports built from them.

use std::fmt::{self, Write as _};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use slt_error::{Result, SltError};

use crate::record::{Record, RecordKind};
use crate::verify::Mismatch;

// ─── Outcomes ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum FailureReason {
    /// Query results disagreed with the expected block.
    Mismatch(Mismatch),
    /// A `statement error` record succeeded.
    ExpectedError,
    /// The backend returned an error the record did not expect.
    UnexpectedError { message: String },
    /// The backend panicked.
    Panic { message: String },
    /// Verification could not be carried out.
    Fault { message: String },
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mismatch(mismatch) => fmt::Display::fmt(mismatch, f),
            Self::ExpectedError => f.write_str("Expected error but didn't get one"),
            Self::UnexpectedError { message } => write!(f, "Unexpected error {message}"),
            Self::Panic { message } => write!(f, "Caught panic: {message}"),
            Self::Fault { message } => f.write_str(message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RecordOutcome {
    Passed,
    Skipped,
    Failed { reason: FailureReason },
}

impl RecordOutcome {
    #[must_use]
    pub const fn failed(reason: FailureReason) -> Self {
        Self::Failed { reason }
    }

    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordReport {
    pub line: usize,
    pub kind: RecordKind,
    pub label: Option<String>,
    pub outcome: RecordOutcome,
}

impl RecordReport {
    #[must_use]
    pub fn new(record: &Record, outcome: RecordOutcome) -> Self {
        Self {
            line: record.canonical_line(),
            kind: record.kind(),
            label: record.label().map(str::to_owned),
            outcome,
        }
    }
}

// ─── File / Run Reports ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub source_sha256: String,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    /// A `halt` stopped the script early.
    pub halted: bool,
    /// Parse error that ended the script, if any.
    pub abandoned: Option<String>,
    pub records: Vec<RecordReport>,
}

impl FileReport {
    #[must_use]
    pub fn new(path: &Path, source: &str) -> Self {
        Self {
            path: path.to_path_buf(),
            source_sha256: source_sha256(source),
            passed: 0,
            failed: 0,
            skipped: 0,
            halted: false,
            abandoned: None,
            records: Vec::new(),
        }
    }

    pub fn push(&mut self, report: RecordReport) {
        match report.outcome {
            RecordOutcome::Passed => self.passed += 1,
            RecordOutcome::Skipped => self.skipped += 1,
            RecordOutcome::Failed { .. } => self.failed += 1,
        }
        self.records.push(report);
    }

    pub fn abandon(&mut self, error: &SltError) {
        self.abandoned = Some(error.to_string());
    }

    /// No failures and no parse error.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.failed == 0 && self.abandoned.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub files: Vec<FileReport>,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub abandoned: usize,
}

impl RunReport {
    pub fn push(&mut self, file: FileReport) {
        self.passed += file.passed;
        self.failed += file.failed;
        self.skipped += file.skipped;
        if file.abandoned.is_some() {
            self.abandoned += 1;
        }
        self.files.push(file);
    }

    #[must_use]
    pub const fn any_failed(&self) -> bool {
        self.failed > 0 || self.abandoned > 0
    }
}

// ─── Script Statistics ───────────────────────────────────────────────────

/// Record counts for a parsed but unexecuted script.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptStats {
    pub statements: usize,
    pub queries: usize,
    pub halts: usize,
    /// Records carrying at least one `skipif`/`onlyif`.
    pub conditional: usize,
    pub hashed: usize,
}

impl ScriptStats {
    #[must_use]
    pub fn from_records(records: &[Record]) -> Self {
        let mut stats = Self::default();
        for record in records {
            match record.kind() {
                RecordKind::Statement => stats.statements += 1,
                RecordKind::Query => stats.queries += 1,
                RecordKind::Halt => stats.halts += 1,
            }
            if !record.conditions().is_empty() {
                stats.conditional += 1;
            }
            if record.hash_summary().is_some() {
                stats.hashed += 1;
            }
        }
        stats
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────

/// Lowercase hex SHA-256 of a script's text.
#[must_use]
pub fn source_sha256(source: &str) -> String {
    let digest = Sha256::digest(source.as_bytes());
    let mut hex = String::with_capacity(64);
    for byte in digest {
        let _ = write!(hex, "{byte:02x}");
    }
    hex
}

/// Write any report as pretty-printed JSON, creating parent directories.
pub fn write_report_json<T: Serialize>(path: &Path, report: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(report)
        .map_err(|error| SltError::internal(format!("report_serialize_failed: {error}")))?;
    fs::write(path, json)?;
    Ok(())
}
