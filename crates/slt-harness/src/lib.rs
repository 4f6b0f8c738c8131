//! sqllogictest harness.
//!
//! Parses sqllogictest scripts into [`Record`]s, runs them against any
//! [`Backend`], verifies query results (sorting, hashing, schema checks),
//! and reports one outcome per record. It can also regenerate a script's
//! expected results from a backend's actual output.
//!
//! ```no_run
//! use std::io;
//! use std::path::Path;
//!
//! use slt_harness::{Backend, QueryOutput, ResultLog, Runner, RunnerConfig};
//!
//! struct Echo;
//!
//! impl Backend for Echo {
//!     fn engine(&self) -> &str {
//!         "echo"
//!     }
//!     fn execute_statement(&mut self, _sql: &str) -> Result<(), String> {
//!         Ok(())
//!     }
//!     fn execute_query(&mut self, sql: &str) -> Result<QueryOutput, String> {
//!         Ok(QueryOutput::new("T", vec![sql.to_owned()]))
//!     }
//! }
//!
//! let log = ResultLog::new(io::stdout(), RunnerConfig::from_env());
//! let mut runner = Runner::new(Echo, log);
//! let report = runner.run_file(Path::new("test/select1.test"))?;
//! println!("{} passed, {} failed", report.passed, report.failed);
//! # Ok::<(), slt_error::SltError>(())
//! ```

pub mod conditions;
pub mod config;
pub mod discovery;
pub mod generate;
pub mod lines;
pub mod log;
pub mod parser;
pub mod record;
pub mod report;
pub mod runner;
pub mod verify;

pub use config::{DiscoveryConfig, RunnerConfig};
pub use discovery::discover_test_files;
pub use generate::Generator;
pub use log::ResultLog;
pub use parser::{ParseStep, Parser, parse_file, parse_script};
pub use record::{Condition, ConditionKind, HashSummary, Record, RecordKind, SortMode, SourceSpan};
pub use report::{
    FailureReason, FileReport, RecordOutcome, RecordReport, RunReport, ScriptStats,
    write_report_json,
};
pub use runner::{Backend, QueryOutput, RecordExecution, Runner, execute_record};
pub use verify::{Mismatch, Verdict, verify};
