//! Result verification: sort observed values, hash them, and compare
//! against a record's expected block.

use std::fmt;

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use slt_error::{Result, SltError};
use tracing::{debug, warn};

use crate::record::{Record, SortMode};

/// Tag for integer columns.
const INTEGER_TAG: char = 'I';
/// Tag for floating-point columns.
const REAL_TAG: char = 'R';

// ─── Outcomes ────────────────────────────────────────────────────────────

/// Why observed results did not match the expected block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Mismatch {
    Count { expected: usize, actual: usize },
    Schema { expected: String, actual: String },
    Value {
        index: usize,
        expected: String,
        actual: String,
    },
    Hash { expected: String, actual: String },
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count { expected, actual } => write!(
                f,
                "Incorrect number of results. Expected {expected}, got {actual}"
            ),
            Self::Schema { expected, actual } => {
                write!(f, "Schemas differ. Expected {expected}, got {actual}")
            }
            Self::Value {
                index,
                expected,
                actual,
            } => write!(
                f,
                "Incorrect result at position {index}. Expected {expected}, got {actual}"
            ),
            Self::Hash { expected, actual } => write!(
                f,
                "Hash of results differ. Expected {expected}, got {actual}"
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Mismatch(Mismatch),
}

impl Verdict {
    #[must_use]
    pub const fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }
}

// ─── Verification ────────────────────────────────────────────────────────

/// Compare a query's observed output with the record's expectations.
///
/// Checks run in a fixed order and stop at the first mismatch: value
/// count, then schema, then the sorted values themselves (by digest when
/// the expected block is a hash summary). `observed_values` is never
/// reordered in place.
///
/// # Errors
///
/// Returns [`SltError::MalformedResult`] when the values cannot be split
/// into rows of the declared width for row sorting.
pub fn verify(
    record: &Record,
    observed_schema: &str,
    observed_values: &[String],
) -> Result<Verdict> {
    let expected_count = record.expected_count();
    if observed_values.len() != expected_count {
        return Ok(Verdict::Mismatch(Mismatch::Count {
            expected: expected_count,
            actual: observed_values.len(),
        }));
    }

    if !schemas_match(record.result_schema(), observed_schema, expected_count) {
        return Ok(Verdict::Mismatch(Mismatch::Schema {
            expected: record.result_schema().to_owned(),
            actual: observed_schema.to_owned(),
        }));
    }

    let sorted = sort_values(record.sort_mode(), record.column_count(), observed_values)?;

    if let Some(summary) = record.hash_summary() {
        let digest = hash_values(&sorted);
        debug!(line = record.canonical_line(), %digest, "comparing result hash");
        if digest != summary.digest {
            return Ok(Verdict::Mismatch(Mismatch::Hash {
                expected: summary.digest,
                actual: digest,
            }));
        }
        return Ok(Verdict::Pass);
    }

    if record.expected().len() > record.hash_threshold() {
        warn!(
            line = record.canonical_line(),
            values = record.expected().len(),
            threshold = record.hash_threshold(),
            "literal result block exceeds hash threshold"
        );
    }

    for (index, (expected, actual)) in record.expected().iter().zip(&sorted).enumerate() {
        if expected != actual {
            return Ok(Verdict::Mismatch(Mismatch::Value {
                index,
                expected: expected.clone(),
                actual: actual.clone(),
            }));
        }
    }
    Ok(Verdict::Pass)
}

/// Schema equality with one allowance: an empty result whose expected
/// schema is all integer columns accepts an observed schema of integer
/// and real columns of the same width.
#[must_use]
pub fn schemas_match(expected: &str, observed: &str, expected_count: usize) -> bool {
    if expected == observed {
        return true;
    }
    expected_count == 0
        && !expected.is_empty()
        && expected.chars().count() == observed.chars().count()
        && expected.chars().all(|tag| tag == INTEGER_TAG)
        && observed
            .chars()
            .all(|tag| tag == INTEGER_TAG || tag == REAL_TAG)
}

/// Return a copy of `values` ordered per `sort_mode`.
///
/// Row sorting groups `column_count` consecutive values into a row and
/// orders rows by plain string comparison, column by column. Value
/// sorting ignores row boundaries.
///
/// # Errors
///
/// Returns [`SltError::MalformedResult`] for row sorting when
/// `column_count` is zero or the values do not fill whole rows.
pub fn sort_values(
    sort_mode: SortMode,
    column_count: usize,
    values: &[String],
) -> Result<Vec<String>> {
    match sort_mode {
        SortMode::NoSort => Ok(values.to_vec()),
        SortMode::ValueSort => {
            let mut sorted = values.to_vec();
            sorted.sort_unstable();
            Ok(sorted)
        }
        SortMode::RowSort => {
            if values.is_empty() {
                return Ok(Vec::new());
            }
            if column_count == 0 {
                return Err(SltError::malformed(format!(
                    "{} values for a zero-column schema",
                    values.len()
                )));
            }
            if !values.len().is_multiple_of(column_count) {
                return Err(SltError::malformed(format!(
                    "{} values do not fill rows of {column_count} columns",
                    values.len()
                )));
            }
            let mut rows: Vec<&[String]> = values.chunks(column_count).collect();
            rows.sort();
            Ok(rows.concat())
        }
    }
}

/// MD5 over every value followed by a newline, as lowercase hex.
#[must_use]
pub fn hash_values(values: &[String]) -> String {
    let mut hasher = Md5::new();
    for value in values {
        hasher.update(value.as_bytes());
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}
