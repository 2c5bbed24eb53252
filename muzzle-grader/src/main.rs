//! Grades a submitted puzzle solution.
//!
//! Reads one grading request as JSON (`{"test", "content", "client_result"}`)
//! from a file or stdin and prints the grading response as JSON on stdout.

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use clap::Parser;
use muzzle_core::{GradingRequest, GradingResponse, grade};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "muzzle-grader")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Grading request file. Reads stdin when omitted or `-`.
    input: Option<PathBuf>,
    /// Pretty-print the response.
    #[arg(long)]
    pretty: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing();

    let raw = read_input(cli.input.as_ref())?;
    let response = grade_str(&raw)?;
    tracing::info!(status = response.status.as_str(), "graded submission");

    let out = if cli.pretty {
        serde_json::to_string_pretty(&response)?
    } else {
        serde_json::to_string(&response)?
    };
    println!("{out}");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("MUZZLE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn read_input(path: Option<&PathBuf>) -> io::Result<String> {
    match path {
        Some(path) if path.as_os_str() != "-" => fs::read_to_string(path),
        _ => {
            let mut raw = String::new();
            io::stdin().read_to_string(&mut raw)?;
            Ok(raw)
        }
    }
}

/// Parses a request and grades it. Only a malformed request is an error;
/// grading itself always produces a response.
fn grade_str(raw: &str) -> Result<GradingResponse, serde_json::Error> {
    let request: GradingRequest = serde_json::from_str(raw)?;
    Ok(grade(&request))
}
