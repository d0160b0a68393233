//! aiedit: multi-agent review, aggregate and implement pipeline.
//!
//! This is the main entry point for the `aiedit` CLI. It parses arguments,
//! sets up logging and the environment, dispatches to the review command,
//! and maps errors to exit codes.

mod agent;
mod cli;
mod commands;
pub mod config;
pub mod error;
pub mod exit_codes;
pub mod files;
pub mod fs;
pub mod git;
mod pipeline;
pub mod publish;
pub mod telemetry;

#[cfg(test)]
mod test_support;

use cli::Cli;
use std::process::ExitCode;
use tracing::{Level, debug};

fn main() -> ExitCode {
    let cli = Cli::parse_args();
    telemetry::init_tracing(cli.log_json, Level::INFO);

    // A missing .env is fine; the variables may come from the environment.
    if let Ok(path) = dotenvy::dotenv() {
        debug!(path = %path.display(), "loaded environment file");
    }

    match commands::dispatch(cli) {
        Ok(code) => ExitCode::from(code as u8),
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::from(err.exit_code() as u8)
        }
    }
}
