//! Directive parser for sqllogictest scripts.
//!
//! The parser is a small state machine driven one line at a time:
//!
//! ```text
//! Start ──statement──▶ StatementBody ──blank──▶ emit
//!   │
//!   └────query──────▶ QueryBody ──"----"──▶ Results ──blank──▶ emit
//!                         └──────blank─────────────────────────▶ emit
//! ```
//!
//! `skipif`/`onlyif` accumulate conditions for the next record,
//! `hash-threshold` updates the threshold carried into every later record,
//! and `halt` is emitted immediately as a record of its own.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::mem;
use std::path::Path;

use slt_error::{Result, SltError};
use tracing::debug;

use crate::lines::LineSource;
use crate::record::{Condition, Record, RecordKind, SortMode, SourceSpan};

/// Line that separates a query body from its expected results.
pub const SEPARATOR: &str = "----";

/// Threshold used until a script sets its own.
pub const DEFAULT_HASH_THRESHOLD: usize = 8;

const HALT: &str = "halt";
const HASH_THRESHOLD: &str = "hash-threshold";
const SKIPIF: &str = "skipif";
const ONLYIF: &str = "onlyif";
const STATEMENT: &str = "statement";
const QUERY: &str = "query";

/// Result of one call to [`Parser::next_step`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseStep {
    /// A complete record, including `halt` records.
    Record(Record),
    /// A directive was consumed that produces no record (`hash-threshold`).
    Directive,
    /// No more records.
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    StatementBody,
    QueryBody,
    Results,
}

/// Fields collected for the record under construction.
#[derive(Debug, Default)]
struct Draft {
    kind: Option<RecordKind>,
    expects_error: bool,
    result_schema: String,
    sort_mode: SortMode,
    label: Option<String>,
    text: String,
    canonical_line: Option<usize>,
    expected: Vec<String>,
    directive_line: usize,
    separator_line: Option<usize>,
    end_line: usize,
}

impl Draft {
    fn push_body_line(&mut self, text: &str, line: usize) {
        self.canonical_line.get_or_insert(line);
        self.text.push_str(text);
        self.end_line = line;
    }

    fn directive_name(&self) -> &'static str {
        match self.kind {
            Some(RecordKind::Query) => QUERY,
            Some(RecordKind::Halt) => HALT,
            Some(RecordKind::Statement) | None => STATEMENT,
        }
    }
}

/// Streaming parser producing one record per call.
///
/// The hash threshold and any pending conditions live on the parser, so
/// they carry over from one call to the next within a script.
#[derive(Debug)]
pub struct Parser<R> {
    lines: LineSource<R>,
    hash_threshold: usize,
    pending_conditions: Vec<Condition>,
    finished: bool,
}

impl<'a> Parser<&'a [u8]> {
    /// Parser over an in-memory script.
    #[must_use]
    pub const fn from_text(text: &'a str) -> Self {
        Self::new(text.as_bytes())
    }
}

impl<R: BufRead> Parser<R> {
    #[must_use]
    pub const fn new(reader: R) -> Self {
        Self {
            lines: LineSource::new(reader),
            hash_threshold: DEFAULT_HASH_THRESHOLD,
            pending_conditions: Vec::new(),
            finished: false,
        }
    }

    /// Threshold that the next record will carry.
    #[must_use]
    pub const fn hash_threshold(&self) -> usize {
        self.hash_threshold
    }

    /// Consume lines until a record is complete, a record-less directive
    /// has been applied, or input ends.
    #[allow(clippy::too_many_lines)]
    pub fn next_step(&mut self) -> Result<ParseStep> {
        let mut state = State::Start;
        let mut draft = Draft::default();

        while let Some(raw) = self.lines.next_line()? {
            let line = self.lines.line_number();
            if is_comment_line(&raw) {
                continue;
            }
            let blank = raw.trim().is_empty();
            let stripped = strip_comment(&raw);

            match state {
                State::Start => {
                    if blank {
                        continue;
                    }
                    let mut fields = stripped.split_whitespace();
                    let Some(directive) = fields.next() else {
                        continue;
                    };
                    match directive {
                        HALT => {
                            debug!(line, "halt directive");
                            return Ok(ParseStep::Record(Record {
                                kind: RecordKind::Halt,
                                expects_error: false,
                                conditions: mem::take(&mut self.pending_conditions),
                                result_schema: String::new(),
                                sort_mode: SortMode::NoSort,
                                text: String::new(),
                                canonical_line: line,
                                expected: Vec::new(),
                                label: None,
                                hash_threshold: self.hash_threshold,
                                span: SourceSpan {
                                    directive_line: line,
                                    separator_line: None,
                                    end_line: line,
                                },
                            }));
                        }
                        SKIPIF | ONLYIF => {
                            let engine = fields
                                .next()
                                .ok_or_else(|| SltError::missing_argument(directive, line))?;
                            self.pending_conditions.push(if directive == SKIPIF {
                                Condition::skip(engine)
                            } else {
                                Condition::only(engine)
                            });
                        }
                        HASH_THRESHOLD => {
                            let value = fields
                                .next()
                                .ok_or_else(|| SltError::missing_argument(directive, line))?;
                            self.hash_threshold = value.parse().map_err(|_| {
                                SltError::InvalidHashThreshold {
                                    value: value.to_owned(),
                                    line,
                                }
                            })?;
                            debug!(line, threshold = self.hash_threshold, "hash threshold set");
                            return Ok(ParseStep::Directive);
                        }
                        STATEMENT => {
                            let token = fields
                                .next()
                                .ok_or_else(|| SltError::missing_argument(directive, line))?;
                            draft.expects_error = match token {
                                "ok" => false,
                                "error" => true,
                                other => {
                                    return Err(SltError::UnexpectedToken {
                                        directive: STATEMENT.to_owned(),
                                        token: other.to_owned(),
                                        line,
                                    });
                                }
                            };
                            draft.kind = Some(RecordKind::Statement);
                            draft.directive_line = line;
                            state = State::StatementBody;
                        }
                        QUERY => {
                            let schema = fields
                                .next()
                                .ok_or_else(|| SltError::missing_argument(directive, line))?;
                            draft.result_schema = schema.to_owned();
                            if let Some(mode) = fields.next() {
                                draft.sort_mode = SortMode::from_token(mode).ok_or_else(|| {
                                    SltError::UnknownSortMode {
                                        mode: mode.to_owned(),
                                        line,
                                    }
                                })?;
                            }
                            draft.label = fields.next().map(str::to_owned);
                            draft.kind = Some(RecordKind::Query);
                            draft.directive_line = line;
                            state = State::QueryBody;
                        }
                        other => return Err(SltError::unknown_directive(other, line)),
                    }
                }
                State::StatementBody => {
                    if blank {
                        return self.finish(draft).map(ParseStep::Record);
                    }
                    draft.push_body_line(stripped, line);
                }
                State::QueryBody => {
                    if blank {
                        return self.finish(draft).map(ParseStep::Record);
                    }
                    if stripped.trim() == SEPARATOR {
                        if draft.canonical_line.is_none() {
                            return Err(SltError::empty_body(QUERY, draft.directive_line));
                        }
                        draft.separator_line = Some(line);
                        draft.end_line = line;
                        state = State::Results;
                        continue;
                    }
                    draft.push_body_line(stripped, line);
                }
                State::Results => {
                    if blank {
                        return self.finish(draft).map(ParseStep::Record);
                    }
                    draft.expected.push(stripped.to_owned());
                    draft.end_line = line;
                }
            }
        }

        if state == State::Start {
            return Ok(ParseStep::End);
        }
        self.finish(draft).map(ParseStep::Record)
    }

    /// Next record, applying record-less directives along the way.
    pub fn next_record(&mut self) -> Result<Option<Record>> {
        loop {
            match self.next_step()? {
                ParseStep::Record(record) => return Ok(Some(record)),
                ParseStep::Directive => {}
                ParseStep::End => return Ok(None),
            }
        }
    }

    fn finish(&mut self, draft: Draft) -> Result<Record> {
        let Some(canonical_line) = draft.canonical_line else {
            return Err(SltError::empty_body(
                draft.directive_name(),
                draft.directive_line,
            ));
        };
        let kind = draft
            .kind
            .ok_or_else(|| SltError::internal("record body without a directive"))?;

        Ok(Record {
            kind,
            expects_error: draft.expects_error,
            conditions: mem::take(&mut self.pending_conditions),
            result_schema: draft.result_schema,
            sort_mode: draft.sort_mode,
            text: draft.text,
            canonical_line,
            expected: draft.expected,
            label: draft.label,
            hash_threshold: self.hash_threshold,
            span: SourceSpan {
                directive_line: draft.directive_line,
                separator_line: draft.separator_line,
                end_line: draft.end_line,
            },
        })
    }
}

impl<R: BufRead> Iterator for Parser<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(err) => {
                self.finished = true;
                Some(Err(err))
            }
        }
    }
}

/// Parse a whole script, including records that follow a `halt`.
pub fn parse_script(text: &str) -> Result<Vec<Record>> {
    Parser::from_text(text).collect()
}

/// Parse a script file from disk.
pub fn parse_file(path: &Path) -> Result<Vec<Record>> {
    let file = File::open(path)?;
    Parser::new(BufReader::new(file)).collect()
}

/// Lines whose first non-whitespace character is `#` are invisible.
fn is_comment_line(line: &str) -> bool {
    line.trim_start().starts_with('#')
}

/// Truncate at the first `#` that is not preceded by a backslash.
pub(crate) fn strip_comment(line: &str) -> &str {
    let bytes = line.as_bytes();
    for (idx, _) in line.match_indices('#') {
        if idx == 0 || bytes[idx - 1] != b'\\' {
            return &line[..idx];
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_comment_cases() {
        assert_eq!(strip_comment("SELECT 1 # trailing"), "SELECT 1 ");
        assert_eq!(strip_comment("no comment"), "no comment");
        assert_eq!(strip_comment(r"SELECT '\#' # c"), r"SELECT '\#' ");
        assert_eq!(strip_comment("#"), "");
    }

    #[test]
    fn comment_lines_detected_after_indentation() {
        assert!(is_comment_line("# top"));
        assert!(is_comment_line("   # indented"));
        assert!(!is_comment_line("SELECT 1 # tail"));
        assert!(!is_comment_line(""));
    }

    #[test]
    fn statement_record() {
        let records = parse_script("statement ok\nCREATE TABLE t1(a INTEGER, b INTEGER)\n\n")
            .expect("parse");
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.kind(), RecordKind::Statement);
        assert!(!record.expects_error());
        assert_eq!(record.text(), "CREATE TABLE t1(a INTEGER, b INTEGER)");
        assert_eq!(record.canonical_line(), 2);
        assert_eq!(record.hash_threshold(), DEFAULT_HASH_THRESHOLD);
    }

    #[test]
    fn multi_line_body_is_concatenated_without_separator() {
        let records =
            parse_script("statement error\nINSERT INTO t1\n  VALUES(1) # note\n").expect("parse");
        assert!(records[0].expects_error());
        assert_eq!(records[0].text(), "INSERT INTO t1  VALUES(1) ");
    }

    #[test]
    fn query_record_with_results_and_label() {
        let script = "query II rowsort label-1\nSELECT a, b\nFROM t1\n----\n1\n2\n3\n4\n";
        let records = parse_script(script).expect("parse");
        let record = &records[0];
        assert_eq!(record.kind(), RecordKind::Query);
        assert_eq!(record.result_schema(), "II");
        assert_eq!(record.sort_mode(), SortMode::RowSort);
        assert_eq!(record.label(), Some("label-1"));
        assert_eq!(record.text(), "SELECT a, bFROM t1");
        assert_eq!(record.expected(), ["1", "2", "3", "4"]);
        assert_eq!(
            record.span(),
            SourceSpan {
                directive_line: 1,
                separator_line: Some(4),
                end_line: 8,
            }
        );
    }

    #[test]
    fn canonical_line_skips_comments_and_conditions() {
        let script = "# header\n\nskipif mysql # reason\nquery I\n# inner\nSELECT 1\n----\n1\n";
        let records = parse_script(script).expect("parse");
        assert_eq!(records[0].canonical_line(), 6);
        assert_eq!(records[0].conditions(), [Condition::skip("mysql")]);
    }

    #[test]
    fn comment_lines_inside_results_are_dropped() {
        let script = "query I\nSELECT 1\n----\n1\n# not a value\n2\n";
        let records = parse_script(script).expect("parse");
        assert_eq!(records[0].expected(), ["1", "2"]);
    }

    #[test]
    fn query_without_separator_has_no_expected_results() {
        let records = parse_script("query I nosort\nSELECT 1 FROM t1 WHERE 0\n\n").expect("parse");
        assert!(records[0].expected().is_empty());
        assert_eq!(records[0].span().separator_line, None);
    }

    #[test]
    fn hash_threshold_is_not_a_record_and_carries_forward() {
        let script = "statement ok\nA\n\nhash-threshold 16\n\nstatement ok\nB\n\nstatement ok\nC\n";
        let mut parser = Parser::from_text(script);
        let first = parser.next_step().expect("first");
        assert!(matches!(first, ParseStep::Record(ref r) if r.hash_threshold() == 8));
        assert_eq!(parser.next_step().expect("directive"), ParseStep::Directive);
        assert_eq!(parser.hash_threshold(), 16);
        let ParseStep::Record(second) = parser.next_step().expect("second") else {
            panic!("expected record");
        };
        assert_eq!(second.hash_threshold(), 16);
        let ParseStep::Record(third) = parser.next_step().expect("third") else {
            panic!("expected record");
        };
        assert_eq!(third.hash_threshold(), 16);
        assert_eq!(parser.next_step().expect("end"), ParseStep::End);
    }

    #[test]
    fn conditions_survive_hash_threshold_directive() {
        let script = "onlyif mysql\nhash-threshold 4\nstatement ok\nSELECT 1\n";
        let records = parse_script(script).expect("parse");
        assert_eq!(records[0].conditions(), [Condition::only("mysql")]);
        assert_eq!(records[0].hash_threshold(), 4);
    }

    #[test]
    fn halt_is_emitted_with_conditions() {
        let script = "onlyif mysql\nhalt\n\nstatement ok\nSELECT 1\n";
        let records = parse_script(script).expect("parse");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].kind(), RecordKind::Halt);
        assert_eq!(records[0].canonical_line(), 2);
        assert_eq!(records[0].conditions(), [Condition::only("mysql")]);
        assert!(records[0].text().is_empty());
        assert!(records[1].conditions().is_empty());
    }

    #[test]
    fn end_of_input_finalizes_open_records() {
        let records = parse_script("statement ok\nSELECT 1").expect("parse");
        assert_eq!(records[0].text(), "SELECT 1");

        let records = parse_script("query I\nSELECT 1").expect("parse");
        assert_eq!(records[0].text(), "SELECT 1");

        let records = parse_script("query I\nSELECT 1\n----\n1").expect("parse");
        assert_eq!(records[0].expected(), ["1"]);
    }

    #[test]
    fn empty_input_has_no_records() {
        assert!(parse_script("").expect("parse").is_empty());
        assert!(parse_script("\n\n# only comments\n").expect("parse").is_empty());
    }

    #[test]
    fn unknown_directive_reports_token_and_line() {
        let err = parse_script("statement ok\nSELECT 1\n\nselekt 1\n").expect_err("must fail");
        assert!(matches!(
            err,
            SltError::UnknownDirective { ref token, line: 4 } if token == "selekt"
        ));
    }

    #[test]
    fn statement_requires_ok_or_error() {
        let err = parse_script("statement maybe\nSELECT 1\n").expect_err("must fail");
        assert!(matches!(
            err,
            SltError::UnexpectedToken { ref token, line: 1, .. } if token == "maybe"
        ));
        let err = parse_script("statement\nSELECT 1\n").expect_err("must fail");
        assert!(matches!(err, SltError::MissingArgument { line: 1, .. }));
    }

    #[test]
    fn condition_without_engine_is_rejected() {
        let err = parse_script("skipif\nstatement ok\nSELECT 1\n").expect_err("must fail");
        assert!(matches!(
            err,
            SltError::MissingArgument { ref directive, line: 1 } if directive == "skipif"
        ));
        let err = parse_script("onlyif # who?\nstatement ok\nSELECT 1\n").expect_err("must fail");
        assert!(matches!(err, SltError::MissingArgument { .. }));
    }

    #[test]
    fn empty_bodies_are_rejected() {
        let err = parse_script("query I\n----\n1\n").expect_err("must fail");
        assert!(matches!(err, SltError::EmptyBody { ref directive, line: 1 } if directive == "query"));

        let err = parse_script("statement ok\n\n").expect_err("must fail");
        assert!(matches!(err, SltError::EmptyBody { line: 1, .. }));

        let err = parse_script("query I\n").expect_err("must fail");
        assert!(matches!(err, SltError::EmptyBody { .. }));
    }

    #[test]
    fn bad_hash_threshold_and_sort_mode() {
        let err = parse_script("hash-threshold lots\n").expect_err("must fail");
        assert!(matches!(err, SltError::InvalidHashThreshold { line: 1, .. }));
        let err = parse_script("hash-threshold\n").expect_err("must fail");
        assert!(matches!(err, SltError::MissingArgument { .. }));
        let err = parse_script("query I shuffled\nSELECT 1\n").expect_err("must fail");
        assert!(matches!(err, SltError::UnknownSortMode { ref mode, .. } if mode == "shuffled"));
        let err = parse_script("query\nSELECT 1\n").expect_err("must fail");
        assert!(matches!(err, SltError::MissingArgument { .. }));
    }

    #[test]
    fn iterator_stops_after_error() {
        let mut parser = Parser::from_text("bogus\nstatement ok\nSELECT 1\n");
        assert!(matches!(parser.next(), Some(Err(_))));
        assert!(parser.next().is_none());
    }

    #[test]
    fn separator_with_surrounding_whitespace() {
        let records = parse_script("query T\nSELECT 'x'\n  ----  \nx\n").expect("parse");
        assert_eq!(records[0].expected(), ["x"]);
        assert_eq!(records[0].text(), "SELECT 'x'");
    }

    #[test]
    fn parse_file_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("basic.test");
        std::fs::write(&path, "statement ok\nSELECT 1\n\nhalt\n").unwrap();
        let records = parse_file(&path).expect("parse");
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].kind(), RecordKind::Halt);
        assert_eq!(records[1].canonical_line(), 4);
    }
}
