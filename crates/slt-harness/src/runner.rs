//! The run loop: feed parsed records to a backend one at a time and log
//! one outcome per record.
//!
//! A backend failure, a backend panic, or a result set that cannot be
//! verified only fails the record that caused it. A parse error ends the
//! current script; with [`Runner::run_paths`] the next script still runs.

use std::any::Any;
use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use serde::{Deserialize, Serialize};
use slt_error::{Result, SltError};
use tracing::{error, info};

use crate::config::DiscoveryConfig;
use crate::discovery::discover_test_files;
use crate::lines::read_script;
use crate::log::ResultLog;
use crate::parser::Parser;
use crate::record::{Record, RecordKind};
use crate::report::{FailureReason, FileReport, RecordOutcome, RecordReport, RunReport};
use crate::verify::{Verdict, verify};

// ─── Backend ─────────────────────────────────────────────────────────────

/// Column type tags and flat values returned for a query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryOutput {
    pub schema: String,
    pub values: Vec<String>,
}

impl QueryOutput {
    pub fn new(schema: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            schema: schema.into(),
            values,
        }
    }
}

/// The database under test.
pub trait Backend {
    /// Identifier matched against `skipif`/`onlyif` engine names.
    fn engine(&self) -> &str;

    /// Prepare a fresh database before each script.
    ///
    /// # Errors
    ///
    /// Returns the error message as a string.
    fn init(&mut self) -> std::result::Result<(), String> {
        Ok(())
    }

    /// Execute a statement for its side effect.
    ///
    /// # Errors
    ///
    /// Returns the error message as a string.
    fn execute_statement(&mut self, sql: &str) -> std::result::Result<(), String>;

    /// Execute a query, returning its schema tags and values in row-major order.
    ///
    /// # Errors
    ///
    /// Returns the error message as a string.
    fn execute_query(&mut self, sql: &str) -> std::result::Result<QueryOutput, String>;
}

// ─── Single Record ───────────────────────────────────────────────────────

/// Outcome of running one eligible record, plus what the backend returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordExecution {
    pub outcome: RecordOutcome,
    /// Present when a query returned successfully.
    pub observed: Option<QueryOutput>,
}

impl RecordExecution {
    const fn done(outcome: RecordOutcome) -> Self {
        Self {
            outcome,
            observed: None,
        }
    }
}

/// Execute and verify a single statement or query record.
///
/// Eligibility is the caller's concern. Panics raised by the backend or
/// while verifying its output are caught and reported as a failed outcome.
/// Halt records pass trivially.
pub fn execute_record<B: Backend + ?Sized>(backend: &mut B, record: &Record) -> RecordExecution {
    match record.kind() {
        RecordKind::Halt => RecordExecution::done(RecordOutcome::Passed),
        RecordKind::Statement => {
            let result = guarded(|| backend.execute_statement(record.text()));
            let outcome = match result {
                Err(reason) => RecordOutcome::failed(reason),
                Ok(Ok(())) if record.expects_error() => {
                    RecordOutcome::failed(FailureReason::ExpectedError)
                }
                Ok(Err(message)) if !record.expects_error() => {
                    RecordOutcome::failed(FailureReason::UnexpectedError { message })
                }
                Ok(_) => RecordOutcome::Passed,
            };
            RecordExecution::done(outcome)
        }
        RecordKind::Query => {
            let output = match guarded(|| backend.execute_query(record.text())) {
                Err(reason) => return RecordExecution::done(RecordOutcome::failed(reason)),
                Ok(Err(message)) => {
                    return RecordExecution::done(RecordOutcome::failed(
                        FailureReason::UnexpectedError { message },
                    ));
                }
                Ok(Ok(output)) => output,
            };
            let outcome = match guarded(|| verify(record, &output.schema, &output.values)) {
                Err(reason) => RecordOutcome::failed(reason),
                Ok(Ok(Verdict::Pass)) => RecordOutcome::Passed,
                Ok(Ok(Verdict::Mismatch(mismatch))) => {
                    RecordOutcome::failed(FailureReason::Mismatch(mismatch))
                }
                Ok(Err(err)) => RecordOutcome::failed(FailureReason::Fault {
                    message: err.to_string(),
                }),
            };
            RecordExecution {
                outcome,
                observed: Some(output),
            }
        }
    }
}

fn guarded<T>(call: impl FnOnce() -> T) -> std::result::Result<T, FailureReason> {
    panic::catch_unwind(AssertUnwindSafe(call)).map_err(|payload| FailureReason::Panic {
        message: panic_message(&*payload),
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

// ─── Runner ──────────────────────────────────────────────────────────────

/// Drives scripts against a backend, writing result lines to a [`ResultLog`].
#[derive(Debug)]
pub struct Runner<B, W> {
    backend: B,
    log: ResultLog<W>,
}

impl<B: Backend, W: Write> Runner<B, W> {
    #[must_use]
    pub const fn new(backend: B, log: ResultLog<W>) -> Self {
        Self { backend, log }
    }

    /// Run every script found under `paths`, in discovery order.
    ///
    /// # Errors
    ///
    /// Fails on a missing path, an unreadable script, a backend that does
    /// not initialize, or a log write error. Parse errors are recorded in
    /// the affected [`FileReport`] instead.
    pub fn run_paths<P: AsRef<Path>>(
        &mut self,
        paths: &[P],
        config: &DiscoveryConfig,
    ) -> Result<RunReport> {
        let files = discover_test_files(paths, config)?;
        let mut run = RunReport::default();
        for file in &files {
            run.push(self.run_file(file)?);
        }
        info!(
            files = run.files.len(),
            passed = run.passed,
            failed = run.failed,
            skipped = run.skipped,
            abandoned = run.abandoned,
            "run complete"
        );
        Ok(run)
    }

    /// Read and run one script. Invalid UTF-8 is replaced, not rejected.
    pub fn run_file(&mut self, path: &Path) -> Result<FileReport> {
        let text = read_script(path)?;
        self.run_script(path, &text)
    }

    /// Run one script's text. `path` is used for reporting only.
    pub fn run_script(&mut self, path: &Path, text: &str) -> Result<FileReport> {
        self.backend
            .init()
            .map_err(|detail| SltError::BackendInit {
                engine: self.backend.engine().to_owned(),
                detail,
            })?;
        self.log.begin_file(path);
        let mut report = FileReport::new(path, text);
        info!(file = %path.display(), engine = self.backend.engine(), "running script");

        for item in Parser::from_text(text) {
            let record = match item {
                Ok(record) => record,
                Err(err) if err.is_parse_error() => {
                    error!(file = %path.display(), error = %err, "script abandoned");
                    report.abandon(&err);
                    break;
                }
                Err(err) => return Err(err),
            };

            // Conditions on a halt do not gate it.
            if record.kind() == RecordKind::Halt {
                info!(file = %path.display(), line = record.canonical_line(), "halt");
                report.halted = true;
                break;
            }

            let outcome = if record.is_eligible(self.backend.engine()) {
                execute_record(&mut self.backend, &record).outcome
            } else {
                RecordOutcome::Skipped
            };
            self.log.record(&record, &outcome)?;
            report.push(RecordReport::new(&record, outcome));
        }

        Ok(report)
    }

    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    pub const fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    #[must_use]
    pub const fn log(&self) -> &ResultLog<W> {
        &self.log
    }

    pub fn into_parts(self) -> (B, ResultLog<W>) {
        (self.backend, self.log)
    }
}
