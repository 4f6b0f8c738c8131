use std::env;
use std::path::PathBuf;
use std::process;

use serde::Serialize;
use slt_error::SltError;
use slt_harness::lines::read_script;
use slt_harness::{DiscoveryConfig, ScriptStats, discover_test_files, parse_script, write_report_json};

#[derive(Debug, Serialize)]
struct FileCheck {
    path: PathBuf,
    stats: Option<ScriptStats>,
    error: Option<String>,
    error_line: Option<usize>,
}

#[derive(Debug, Default, Serialize)]
struct CheckSummary {
    files: Vec<FileCheck>,
    records: usize,
    parse_errors: usize,
}

enum Failure {
    Usage(String),
    Harness(SltError),
}

impl From<SltError> for Failure {
    fn from(err: SltError) -> Self {
        Self::Harness(err)
    }
}

fn main() {
    match real_main() {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(Failure::Usage(message)) => {
            eprintln!("slt_check: {message}");
            print_usage();
            process::exit(2);
        }
        Err(Failure::Harness(err)) => {
            eprintln!("slt_check: {err}");
            process::exit(err.exit_code());
        }
    }
}

/// Returns whether every script parsed.
fn real_main() -> Result<bool, Failure> {
    let mut json_path: Option<PathBuf> = None;
    let mut paths: Vec<PathBuf> = Vec::new();

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--json" => {
                let value = args
                    .next()
                    .ok_or_else(|| Failure::Usage("--json requires a path argument".to_owned()))?;
                json_path = Some(PathBuf::from(value));
            }
            "--help" | "-h" => {
                print_usage();
                return Ok(true);
            }
            other if other.starts_with("--") => {
                return Err(Failure::Usage(format!("unknown argument: {other}")));
            }
            other => paths.push(PathBuf::from(other)),
        }
    }
    if paths.is_empty() {
        return Err(Failure::Usage("no test paths given".to_owned()));
    }

    let files = discover_test_files(&paths, &DiscoveryConfig::default())?;
    let mut summary = CheckSummary::default();

    for path in files {
        let text = read_script(&path)?;
        match parse_script(&text) {
            Ok(records) => {
                let stats = ScriptStats::from_records(&records);
                println!(
                    "{} statements={} queries={} halts={} conditional={} hashed={}",
                    path.display(),
                    stats.statements,
                    stats.queries,
                    stats.halts,
                    stats.conditional,
                    stats.hashed,
                );
                summary.records += records.len();
                summary.files.push(FileCheck {
                    path,
                    stats: Some(stats),
                    error: None,
                    error_line: None,
                });
            }
            Err(err) if err.is_parse_error() => {
                println!("{}: {err}", path.display());
                summary.parse_errors += 1;
                summary.files.push(FileCheck {
                    path,
                    stats: None,
                    error: Some(err.to_string()),
                    error_line: err.line(),
                });
            }
            Err(err) => return Err(err.into()),
        }
    }

    println!(
        "slt_check files={} records={} parse_errors={}",
        summary.files.len(),
        summary.records,
        summary.parse_errors
    );

    if let Some(json_path) = json_path {
        write_report_json(&json_path, &summary)?;
    }

    Ok(summary.parse_errors == 0)
}

fn print_usage() {
    println!("Usage: slt_check [--json PATH] <path>...");
}
