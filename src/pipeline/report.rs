//! Console and JSON reporting of file runs.

use crate::error::{AieditError, Result};
use crate::exit_codes;
use crate::fs::atomic_write_file;
use crate::pipeline::types::{FileRun, ReviewResult, RunOutcome, SummaryResult, SummarySource};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::Path;

const RULE_WIDTH: usize = 100;

/// Verbose output of one review of `file` as soon as it completes.
///
/// Each block goes out in a single write and names its file, so blocks from
/// concurrent runs stay readable.
pub fn print_review(file: &str, result: &ReviewResult) {
    print!("{}", format_review(file, result));
}

/// Verbose output of the consolidated feedback for `file`.
pub fn print_consolidated(file: &str, summary: &SummaryResult) {
    print!("{}", format_consolidated(file, summary));
}

fn format_review(file: &str, result: &ReviewResult) -> String {
    let body = match (&result.feedback, &result.error) {
        (Some(feedback), _) => feedback.clone(),
        (None, Some(cause)) => format!("(no response: {})", cause),
        (None, None) => "(no response)".to_string(),
    };
    format!("[{}] {}:\n{}\n{}\n", result.agent, file, body, "-".repeat(RULE_WIDTH))
}

fn format_consolidated(file: &str, summary: &SummaryResult) -> String {
    let label = match &summary.source {
        SummarySource::Agent(name) => name.as_str(),
        SummarySource::Builtin => "consolidated",
    };
    format!("[{}] {}:\n{}\n{}\n", label, file, summary.text, "-".repeat(RULE_WIDTH))
}

/// Per-file lines followed by totals.
pub fn format_summary(runs: &[FileRun]) -> String {
    let mut out = String::new();
    let mut counts = [0usize; 4];

    for run in runs {
        let _ = write!(out, "{}: {}", run.path.display(), run.outcome.label());
        match &run.outcome {
            RunOutcome::NoFeedback { reviews } => {
                counts[0] += 1;
                out.push('\n');
                for (agent, cause) in reviews.failures() {
                    let _ = writeln!(out, "  {}: {}", agent, cause);
                }
                if reviews.is_empty() {
                    out.push_str("  no reviewers configured\n");
                }
            }
            RunOutcome::ReviewedOnly { .. } => {
                counts[1] += 1;
                out.push('\n');
            }
            RunOutcome::Implemented { changed, backup, .. } => {
                counts[2] += 1;
                if !changed {
                    out.push_str(" (unchanged)");
                }
                if let Some(backup) = backup {
                    let _ = write!(out, " (backup: {})", backup.display());
                }
                out.push('\n');
            }
            RunOutcome::Failed { failure, reviews, .. } => {
                counts[3] += 1;
                let _ = writeln!(out, "\n  {}", failure);
                for (agent, cause) in reviews.failures() {
                    let _ = writeln!(out, "  {}: {}", agent, cause);
                }
            }
        }
    }

    let _ = writeln!(
        out,
        "\n{} file(s): {} implemented, {} reviewed only, {} no feedback, {} failed",
        runs.len(),
        counts[2],
        counts[1],
        counts[0],
        counts[3]
    );
    out
}

pub fn print_summary(runs: &[FileRun]) {
    print!("{}", format_summary(runs));
}

/// Process exit code for a finished set of runs.
pub fn exit_code(runs: &[FileRun]) -> i32 {
    if runs.iter().any(|run| run.outcome.is_failed()) {
        exit_codes::RUN_FAILURE
    } else {
        exit_codes::SUCCESS
    }
}

#[derive(Serialize)]
struct Report<'a> {
    generated_at: DateTime<Utc>,
    runs: &'a [FileRun],
}

/// Write every run as JSON to `path`, atomically.
pub fn write_json_report(path: &Path, runs: &[FileRun]) -> Result<()> {
    let report = Report {
        generated_at: Utc::now(),
        runs,
    };
    let json = serde_json::to_string_pretty(&report)
        .map_err(|e| AieditError::IoError(format!("failed to serialize report: {}", e)))?;
    atomic_write_file(path, &format!("{}\n", json))
}
