//! Publication of changed files: branch, commit, push, pull request.
//!
//! Runs once per invocation, after every file run finished, and only for
//! files whose run rewrote them. Any failure here is a GitError (exit 3); the
//! rewritten files stay on disk either way.

use crate::config::PublishSettings;
use crate::error::{AieditError, Result};
use crate::git::{current_branch, get_repo_root, has_remote, is_valid_branch_name, run_gh, run_git};
use chrono::{DateTime, Utc};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::info;

pub const COMMIT_MESSAGE: &str = "Apply AI review feedback";

pub const PR_TITLE: &str = "AI review: apply reviewer feedback";

static UNSAFE_REF_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9._/-]+").expect("Invalid ref character regex"));

/// Agents credited in the pull request body.
#[derive(Debug, Clone, Default)]
pub struct PublishCredits {
    pub reviewers: Vec<String>,
    pub summarizer: Option<String>,
    pub implementer: Option<String>,
}

/// What was published.
#[derive(Debug, Clone)]
pub struct Publication {
    pub branch: String,
    pub commit: String,
    /// URL printed by `gh pr create`.
    pub pull_request: String,
}

/// Check, before any agent is called, that publication can work from `cwd`.
pub fn preflight(cwd: &Path, settings: &PublishSettings) -> Result<()> {
    get_repo_root(cwd)?;
    if !has_remote(cwd, &settings.remote).map_err(|e| AieditError::ConfigError(e.to_string()))? {
        return Err(AieditError::ConfigError(format!(
            "--publish: remote '{}' is not configured",
            settings.remote
        )));
    }
    let sample = branch_name(&settings.branch_prefix, Utc::now());
    if !is_valid_branch_name(cwd, &sample) {
        return Err(AieditError::ConfigError(format!(
            "--branch-prefix '{}' does not produce a valid branch name",
            settings.branch_prefix
        )));
    }
    Ok(())
}

/// `<prefix>/<UTC timestamp>`, with characters git rejects replaced.
pub fn branch_name(prefix: &str, now: DateTime<Utc>) -> String {
    let prefix = UNSAFE_REF_CHARS.replace_all(prefix.trim(), "-");
    format!("{}/{}", prefix.trim_matches('/'), now.format("%Y%m%d-%H%M%S"))
}

pub fn pr_body(files: &[PathBuf], credits: &PublishCredits) -> String {
    let mut body = String::from("Files edited from consolidated agent review feedback.\n\n## Files\n\n");
    for file in files {
        body.push_str(&format!("- `{}`\n", file.display()));
    }
    body.push_str("\n## Agents\n\n");
    if credits.reviewers.is_empty() {
        body.push_str("- Reviewers: (none)\n");
    } else {
        body.push_str(&format!("- Reviewers: {}\n", credits.reviewers.join(", ")));
    }
    body.push_str(&format!(
        "- Summarizer: {}\n",
        credits.summarizer.as_deref().unwrap_or("(built-in consolidation)")
    ));
    if let Some(implementer) = &credits.implementer {
        body.push_str(&format!("- Implementer: {}\n", implementer));
    }
    body
}

/// Create `branch` from HEAD and commit exactly `files` on it.
///
/// Returns the new commit id.
pub fn commit_on_branch(cwd: &Path, branch: &str, files: &[PathBuf]) -> Result<String> {
    if files.is_empty() {
        return Err(AieditError::GitError("no files to commit".to_string()));
    }
    let paths: Vec<String> = files.iter().map(|p| p.to_string_lossy().to_string()).collect();

    run_git(cwd, &["checkout", "-b", branch])?;

    let mut add: Vec<&str> = vec!["add", "--"];
    add.extend(paths.iter().map(String::as_str));
    run_git(cwd, &add)?;

    let mut commit: Vec<&str> = vec!["commit", "-m", COMMIT_MESSAGE, "--"];
    commit.extend(paths.iter().map(String::as_str));
    run_git(cwd, &commit)?;

    Ok(run_git(cwd, &["rev-parse", "HEAD"])?.stdout)
}

pub fn push_branch(cwd: &Path, remote: &str, branch: &str) -> Result<()> {
    run_git(cwd, &["push", "-u", remote, branch])?;
    Ok(())
}

pub fn open_pull_request(cwd: &Path, branch: &str, body: &str) -> Result<String> {
    let output = run_gh(
        cwd,
        &["pr", "create", "--head", branch, "--title", PR_TITLE, "--body", body],
    )?;
    Ok(output.stdout)
}

/// Branch, commit, push and open a pull request for `files`.
pub fn publish(
    cwd: &Path,
    settings: &PublishSettings,
    files: &[PathBuf],
    credits: &PublishCredits,
) -> Result<Publication> {
    let base = current_branch(cwd)?;
    let branch = branch_name(&settings.branch_prefix, Utc::now());
    info!(branch = %branch, base = %base, files = files.len(), "publishing changes");

    let commit = commit_on_branch(cwd, &branch, files)?;
    info!(branch = %branch, commit = %commit, "committed");

    push_branch(cwd, &settings.remote, &branch)?;
    info!(branch = %branch, remote = %settings.remote, "pushed");

    let pull_request = open_pull_request(cwd, &branch, &pr_body(files, credits))?;
    info!(url = %pull_request, "pull request opened");

    Ok(Publication {
        branch,
        commit,
        pull_request,
    })
}
