//! Rewrite a script's expected results from what a backend actually returns.
//!
//! Every source line is copied verbatim except, for each eligible query
//! that executed without error, the directive line (rewritten with the
//! observed schema) and the lines after `----` (replaced with the observed
//! values in sorted order, or a hash summary when there are more values
//! than the record's hash threshold).

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use slt_error::{Result, SltError};
use tracing::{debug, info, warn};

use crate::lines::read_script;
use crate::parser::{SEPARATOR, parse_script};
use crate::record::{HashSummary, Record, RecordKind};
use crate::runner::{Backend, execute_record};
use crate::verify::{hash_values, sort_values};

/// Suffix appended to a script's file name for the regenerated copy.
pub const GENERATED_SUFFIX: &str = ".generated";

#[derive(Debug)]
pub struct Generator<B> {
    backend: B,
}

impl<B: Backend> Generator<B> {
    #[must_use]
    pub const fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Regenerate `path` and write the result next to it with the
    /// [`GENERATED_SUFFIX`]. Returns the path written.
    pub fn generate_file(&mut self, path: &Path) -> Result<PathBuf> {
        let text = read_script(path)?;
        let generated = self.regenerate(&text)?;

        let mut target = OsString::from(path.as_os_str());
        target.push(GENERATED_SUFFIX);
        let target = PathBuf::from(target);
        fs::write(&target, generated)?;
        info!(source = %path.display(), target = %target.display(), "wrote regenerated script");
        Ok(target)
    }

    /// Execute `text` and return it with query results replaced.
    ///
    /// # Errors
    ///
    /// Fails when the script does not parse or the backend does not
    /// initialize. Records that fail to execute keep their original text.
    pub fn regenerate(&mut self, text: &str) -> Result<String> {
        let records = parse_script(text)?;
        self.backend
            .init()
            .map_err(|detail| SltError::BackendInit {
                engine: self.backend.engine().to_owned(),
                detail,
            })?;

        let lines: Vec<&str> = text.lines().collect();
        let mut out = Vec::with_capacity(lines.len());
        let mut cursor = 0;

        for record in &records {
            if record.kind() == RecordKind::Halt {
                debug!(line = record.canonical_line(), "halt reached, copying remainder");
                break;
            }
            if !record.is_eligible(self.backend.engine()) {
                continue;
            }

            let execution = execute_record(&mut self.backend, record);
            let Some(observed) = execution.observed else {
                continue;
            };
            let column_count = observed.schema.chars().count();
            let sorted = match sort_values(record.sort_mode(), column_count, &observed.values) {
                Ok(sorted) => sorted,
                Err(err) => {
                    warn!(line = record.canonical_line(), error = %err, "keeping original results");
                    continue;
                }
            };

            let span = record.span();
            copy_lines(&lines, cursor, span.directive_line - 1, &mut out);
            out.push(directive_line(record, &observed.schema));
            match span.separator_line {
                Some(separator) => copy_lines(&lines, span.directive_line, separator, &mut out),
                None => {
                    copy_lines(&lines, span.directive_line, span.end_line, &mut out);
                    out.push(SEPARATOR.to_owned());
                }
            }
            out.extend(result_lines(record, sorted));
            cursor = span.end_line;
        }

        copy_lines(&lines, cursor, lines.len(), &mut out);
        let mut generated = out.join("\n");
        if text.ends_with('\n') {
            generated.push('\n');
        }
        Ok(generated)
    }

    pub fn into_backend(self) -> B {
        self.backend
    }
}

/// Append `lines[from..to]` (0-based, clamped) to `out`.
fn copy_lines(lines: &[&str], from: usize, to: usize, out: &mut Vec<String>) {
    let to = to.min(lines.len());
    if from < to {
        out.extend(lines[from..to].iter().map(|line| (*line).to_owned()));
    }
}

fn directive_line(record: &Record, schema: &str) -> String {
    let mut line = format!("query {schema} {}", record.sort_mode());
    if let Some(label) = record.label() {
        line.push(' ');
        line.push_str(label);
    }
    line
}

fn result_lines(record: &Record, sorted: Vec<String>) -> Vec<String> {
    if sorted.len() > record.hash_threshold() {
        let summary = HashSummary {
            count: sorted.len(),
            digest: hash_values(&sorted),
        };
        vec![summary.to_string()]
    } else {
        sorted
    }
}
