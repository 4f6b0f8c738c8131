//! Per-record result lines.
//!
//! Every executed or skipped record yields exactly one line on the sink:
//!
//! ```text
//! <path>:<line>: <query> ok
//! <path>:<line>: <query> not ok: <reason>
//! <path>:<line>: <query> skipped
//! ```
//!
//! The same outcome is also emitted as a `tracing` event so callers with a
//! subscriber get structured fields without parsing the text.

use std::borrow::Cow;
use std::io::Write;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use slt_error::Result;
use tracing::{debug, warn};

use crate::config::RunnerConfig;
use crate::record::Record;
use crate::report::RecordOutcome;

/// Queries longer than this many characters are shortened when truncation is on.
pub const MAX_QUERY_CHARS: usize = 50;
const TRUNCATED_QUERY_CHARS: usize = MAX_QUERY_CHARS - 3;

#[derive(Debug)]
pub struct ResultLog<W> {
    sink: W,
    config: RunnerConfig,
    current_path: String,
}

impl<W: Write> ResultLog<W> {
    #[must_use]
    pub const fn new(sink: W, config: RunnerConfig) -> Self {
        Self {
            sink,
            config,
            current_path: String::new(),
        }
    }

    /// Set the script whose records are logged next.
    pub fn begin_file(&mut self, path: &Path) {
        self.current_path = display_path(path, &self.config);
    }

    /// Write the result line for one record.
    pub fn record(&mut self, record: &Record, outcome: &RecordOutcome) -> Result<()> {
        let line = self.format_line(record, outcome);
        writeln!(self.sink, "{line}")?;

        match outcome {
            RecordOutcome::Passed => debug!(
                file = %self.current_path,
                line = record.canonical_line(),
                kind = %record.kind(),
                "record passed"
            ),
            RecordOutcome::Skipped => debug!(
                file = %self.current_path,
                line = record.canonical_line(),
                kind = %record.kind(),
                "record skipped"
            ),
            RecordOutcome::Failed { reason } => warn!(
                file = %self.current_path,
                line = record.canonical_line(),
                kind = %record.kind(),
                %reason,
                "record failed"
            ),
        }
        Ok(())
    }

    /// Render the result line without writing it.
    #[must_use]
    pub fn format_line(&self, record: &Record, outcome: &RecordOutcome) -> String {
        let mut line = String::new();
        if self.config.timestamps {
            line.push_str(&unix_millis().to_string());
            line.push(' ');
        }
        line.push_str(&self.current_path);
        line.push(':');
        line.push_str(&record.canonical_line().to_string());
        line.push_str(": ");
        line.push_str(&truncate_query(record.text(), self.config.truncate_queries));

        match outcome {
            RecordOutcome::Passed => line.push_str(" ok"),
            RecordOutcome::Skipped => line.push_str(" skipped"),
            RecordOutcome::Failed { reason } => {
                line.push_str(" not ok: ");
                line.push_str(&reason.to_string());
            }
        }
        single_line(&line).into_owned()
    }

    #[must_use]
    pub const fn config(&self) -> &RunnerConfig {
        &self.config
    }

    #[must_use]
    pub const fn sink(&self) -> &W {
        &self.sink
    }

    pub fn into_inner(self) -> W {
        self.sink
    }
}

/// Shorten a script path for display: at most `max_path_components`
/// trailing components, stopping before a directory named
/// `log_root_dir`. Both separators are accepted and `/` is emitted.
#[must_use]
pub fn display_path(path: &Path, config: &RunnerConfig) -> String {
    let text = path.to_string_lossy();
    let mut parts: Vec<&str> = Vec::new();
    for part in text
        .split(['/', '\\'])
        .rev()
        .filter(|part| !part.is_empty() && *part != ".")
    {
        if parts.len() >= config.max_path_components || part == config.log_root_dir {
            break;
        }
        parts.push(part);
    }
    parts.reverse();
    parts.join("/")
}

/// Cut long queries to their first characters followed by `...`.
#[must_use]
pub fn truncate_query(query: &str, enabled: bool) -> Cow<'_, str> {
    if !enabled || query.chars().count() <= MAX_QUERY_CHARS {
        return Cow::Borrowed(query);
    }
    let mut short: String = query.chars().take(TRUNCATED_QUERY_CHARS).collect();
    short.push_str("...");
    Cow::Owned(short)
}

fn single_line(text: &str) -> Cow<'_, str> {
    if text.contains(['\n', '\r']) {
        Cow::Owned(text.replace("\r\n", " ").replace(['\n', '\r'], " "))
    } else {
        Cow::Borrowed(text)
    }
}

fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis())
}
