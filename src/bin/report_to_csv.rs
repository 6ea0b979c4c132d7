//! Flatten a persisted run report into a CSV table.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use browser_matrix::report::{EmptyResultPolicy, flatten_report, write_csv};

#[derive(Parser, Debug)]
#[command(name = "report-to-csv", about = "Flatten a browser-matrix JSON report into CSV")]
struct Args {
    /// Report produced by `browser-matrix run`
    #[arg(short, long, env = "BROWSER_MATRIX_REPORT")]
    input: PathBuf,

    /// CSV output path
    #[arg(short, long)]
    output: PathBuf,

    /// What to do with records whose result is empty: skip, include or fail
    #[arg(long, default_value_t = EmptyResultPolicy::Skip)]
    empty_results: EmptyResultPolicy,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let flattened = match flatten_report(&args.input, args.empty_results) {
        Ok(flattened) => flattened,
        Err(e) => {
            eprintln!("Flatten failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    println!("length {}", flattened.summary.total);
    println!("invalid test outputs {}", flattened.summary.invalid);
    println!("valid test output with empty `result` {}", flattened.summary.empty);

    if let Err(e) = write_csv(&args.output, &flattened) {
        eprintln!("Could not write {}: {}", args.output.display(), e);
        return ExitCode::FAILURE;
    }
    println!("Wrote {} rows to {}", flattened.summary.rows, args.output.display());
    ExitCode::SUCCESS
}
