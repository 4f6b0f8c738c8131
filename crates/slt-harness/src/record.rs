//! Parsed test records and the pieces they are made of.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::conditions;

// ─── Record Kind ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// Statement executed for its side effect; only success/failure is checked.
    Statement,
    /// Query whose result set is verified.
    Query,
    /// Stops processing of the rest of the script.
    Halt,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Statement => "statement",
            Self::Query => "query",
            Self::Halt => "halt",
        })
    }
}

// ─── Sort Mode ───────────────────────────────────────────────────────────

/// How observed values are normalized before comparison.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    #[default]
    NoSort,
    RowSort,
    ValueSort,
}

impl SortMode {
    /// Parse the directive token (`nosort`, `rowsort`, `valuesort`).
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "nosort" => Some(Self::NoSort),
            "rowsort" => Some(Self::RowSort),
            "valuesort" => Some(Self::ValueSort),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoSort => "nosort",
            Self::RowSort => "rowsort",
            Self::ValueSort => "valuesort",
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Condition ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionKind {
    /// `skipif <engine>`
    Skip,
    /// `onlyif <engine>`
    Only,
}

/// A single eligibility rule attached to a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub kind: ConditionKind,
    pub engine: String,
}

impl Condition {
    pub fn skip(engine: impl Into<String>) -> Self {
        Self {
            kind: ConditionKind::Skip,
            engine: engine.into(),
        }
    }

    pub fn only(engine: impl Into<String>) -> Self {
        Self {
            kind: ConditionKind::Only,
            engine: engine.into(),
        }
    }

    #[must_use]
    pub const fn is_skip(&self) -> bool {
        matches!(self.kind, ConditionKind::Skip)
    }

    #[must_use]
    pub const fn is_only(&self) -> bool {
        matches!(self.kind, ConditionKind::Only)
    }
}

// ─── Hash Summary ────────────────────────────────────────────────────────

/// Expected-results line of the form `<N> values hashing to <hex>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashSummary {
    pub count: usize,
    pub digest: String,
}

impl HashSummary {
    /// Recognize a hash-summary line. Surrounding whitespace is ignored;
    /// the digest must be lowercase hexadecimal.
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        let mut words = line.split_whitespace();
        let count = words.next()?;
        if count.is_empty() || !count.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        if words.next()? != "values" || words.next()? != "hashing" || words.next()? != "to" {
            return None;
        }
        let digest = words.next()?;
        if words.next().is_some()
            || !digest
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
        {
            return None;
        }
        Some(Self {
            count: count.parse().ok()?,
            digest: digest.to_owned(),
        })
    }
}

impl fmt::Display for HashSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} values hashing to {}", self.count, self.digest)
    }
}

// ─── Record ──────────────────────────────────────────────────────────────

/// Where a record sits in its script, used when rewriting result blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpan {
    /// Line of the `statement`/`query`/`halt` directive.
    pub directive_line: usize,
    /// Line of the `----` separator, for queries that have one.
    pub separator_line: Option<usize>,
    /// Last line belonging to the record (blank terminator excluded).
    pub end_line: usize,
}

/// One parsed unit of work. Built once by the parser, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub(crate) kind: RecordKind,
    pub(crate) expects_error: bool,
    pub(crate) conditions: Vec<Condition>,
    pub(crate) result_schema: String,
    pub(crate) sort_mode: SortMode,
    pub(crate) text: String,
    pub(crate) canonical_line: usize,
    pub(crate) expected: Vec<String>,
    pub(crate) label: Option<String>,
    pub(crate) hash_threshold: usize,
    pub(crate) span: SourceSpan,
}

impl Record {
    #[must_use]
    pub const fn kind(&self) -> RecordKind {
        self.kind
    }

    /// Whether a statement is expected to fail. Always false for queries.
    #[must_use]
    pub const fn expects_error(&self) -> bool {
        self.expects_error
    }

    #[must_use]
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Column type tags, e.g. `"ITTR"`.
    #[must_use]
    pub fn result_schema(&self) -> &str {
        &self.result_schema
    }

    #[must_use]
    pub fn column_count(&self) -> usize {
        self.result_schema.chars().count()
    }

    #[must_use]
    pub const fn sort_mode(&self) -> SortMode {
        self.sort_mode
    }

    /// SQL body with comments removed and line breaks collapsed.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// First source line of the SQL body (the directive line for halts).
    #[must_use]
    pub const fn canonical_line(&self) -> usize {
        self.canonical_line
    }

    /// Raw expected-result lines in declared order.
    #[must_use]
    pub fn expected(&self) -> &[String] {
        &self.expected
    }

    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    #[must_use]
    pub const fn hash_threshold(&self) -> usize {
        self.hash_threshold
    }

    #[must_use]
    pub const fn span(&self) -> SourceSpan {
        self.span
    }

    /// The hash summary, when the expected block is a single hash line.
    #[must_use]
    pub fn hash_summary(&self) -> Option<HashSummary> {
        match self.expected.as_slice() {
            [line] => HashSummary::parse(line),
            _ => None,
        }
    }

    /// Number of values (not rows) the record expects.
    #[must_use]
    pub fn expected_count(&self) -> usize {
        self.hash_summary()
            .map_or(self.expected.len(), |summary| summary.count)
    }

    /// Whether this record applies to the engine with the given identifier.
    #[must_use]
    pub fn is_eligible(&self, engine: &str) -> bool {
        conditions::eligible(&self.conditions, engine)
    }
}

#[cfg(test)]
pub(crate) fn query_record(
    schema: &str,
    sort_mode: SortMode,
    expected: &[&str],
    hash_threshold: usize,
) -> Record {
    Record {
        kind: RecordKind::Query,
        expects_error: false,
        conditions: Vec::new(),
        result_schema: schema.to_owned(),
        sort_mode,
        text: "SELECT 1".to_owned(),
        canonical_line: 2,
        expected: expected.iter().map(|v| (*v).to_owned()).collect(),
        label: None,
        hash_threshold,
        span: SourceSpan {
            directive_line: 1,
            separator_line: Some(3),
            end_line: 3 + expected.len(),
        },
    }
}
