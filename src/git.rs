//! Git command runner for aiedit.
//!
//! Provides a safe wrapper around git commands with captured stdout/stderr
//! and structured error handling. All git operations should go through this module.

use crate::error::{AieditError, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Result of a successful git command execution.
#[derive(Debug, Clone)]
pub struct GitOutput {
    /// Standard output from the command (trimmed).
    pub stdout: String,
    /// Standard error from the command (trimmed).
    pub stderr: String,
}

impl GitOutput {
    fn from_output(output: &Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
    }

    /// Returns true if stdout is empty.
    pub fn is_empty(&self) -> bool {
        self.stdout.is_empty()
    }
}

/// Run a git command in `cwd`.
///
/// A non-zero exit is a [`AieditError::GitError`] carrying stderr (or stdout
/// when stderr is empty).
pub fn run_git<P: AsRef<Path>>(cwd: P, args: &[&str]) -> Result<GitOutput> {
    run_tool("git", cwd.as_ref(), args)
}

/// Run the GitHub CLI in `cwd`, with the same error mapping as [`run_git`].
pub fn run_gh<P: AsRef<Path>>(cwd: P, args: &[&str]) -> Result<GitOutput> {
    run_tool("gh", cwd.as_ref(), args)
}

fn run_tool(program: &str, cwd: &Path, args: &[&str]) -> Result<GitOutput> {
    let output = Command::new(program)
        .current_dir(cwd)
        .args(args)
        .output()
        .map_err(|e| {
            AieditError::GitError(format!(
                "failed to execute {} {}: {}",
                program,
                args.first().unwrap_or(&""),
                e
            ))
        })?;

    let tool_output = GitOutput::from_output(&output);

    if output.status.success() {
        Ok(tool_output)
    } else {
        let exit_code = output.status.code().unwrap_or(-1);
        let error_msg = if tool_output.stderr.is_empty() {
            tool_output.stdout.clone()
        } else {
            tool_output.stderr.clone()
        };

        Err(AieditError::GitError(format!(
            "{} {} failed (exit code {}): {}",
            program,
            args.first().unwrap_or(&""),
            exit_code,
            error_msg
        )))
    }
}

/// Get the repository root directory using `git rev-parse --show-toplevel`.
///
/// Being outside a repository is a configuration problem (exit 1), so it is
/// reported as a ConfigError rather than a GitError.
pub fn get_repo_root<P: AsRef<Path>>(cwd: P) -> Result<PathBuf> {
    let cwd = cwd.as_ref();

    let output = Command::new("git")
        .current_dir(cwd)
        .args(["rev-parse", "--show-toplevel"])
        .output()
        .map_err(|e| {
            AieditError::ConfigError(format!("failed to execute git: {} (is git installed?)", e))
        })?;

    let git_output = GitOutput::from_output(&output);

    if output.status.success() {
        Ok(PathBuf::from(&git_output.stdout))
    } else if git_output.stderr.contains("not a git repository") {
        Err(AieditError::ConfigError(
            "--publish requires running inside a git repository".to_string(),
        ))
    } else {
        Err(AieditError::ConfigError(format!(
            "git rev-parse failed: {}",
            git_output.stderr
        )))
    }
}

/// Name of the currently checked out branch.
pub fn current_branch<P: AsRef<Path>>(cwd: P) -> Result<String> {
    let output = run_git(cwd, &["rev-parse", "--abbrev-ref", "HEAD"])?;
    Ok(output.stdout)
}

/// Whether `name` is an acceptable branch name (`git check-ref-format --branch`).
pub fn is_valid_branch_name<P: AsRef<Path>>(cwd: P, name: &str) -> bool {
    run_git(cwd, &["check-ref-format", "--branch", name]).is_ok()
}

/// Whether a remote called `name` is configured.
pub fn has_remote<P: AsRef<Path>>(cwd: P, name: &str) -> Result<bool> {
    let output = run_git(cwd, &["remote"])?;
    Ok(output.stdout.lines().any(|line| line.trim() == name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{create_test_repo, create_test_repo_with_remote};
    use tempfile::TempDir;

    #[test]
    fn test_run_git_captures_stdout() {
        let temp_dir = create_test_repo();
        let output = run_git(temp_dir.path(), &["rev-parse", "--show-toplevel"]).unwrap();
        assert!(!output.is_empty());
    }

    #[test]
    fn test_run_git_failure_returns_git_error() {
        let temp_dir = create_test_repo();
        let err = run_git(temp_dir.path(), &["checkout", "nonexistent-branch"]).unwrap_err();
        assert!(matches!(err, AieditError::GitError(_)));
        assert!(err.to_string().contains("git checkout failed"));
    }

    #[test]
    fn test_missing_program_is_git_error() {
        let temp_dir = TempDir::new().unwrap();
        let err = run_tool("aiedit-no-such-tool", temp_dir.path(), &["--version"]).unwrap_err();
        assert!(matches!(err, AieditError::GitError(_)));
    }

    #[test]
    fn test_get_repo_root_from_subdirectory() {
        let temp_dir = create_test_repo();
        let subdir = temp_dir.path().join("docs").join("nested");
        std::fs::create_dir_all(&subdir).unwrap();

        let root = get_repo_root(&subdir).unwrap();
        assert_eq!(
            root.canonicalize().unwrap(),
            temp_dir.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn test_get_repo_root_outside_repo_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let err = get_repo_root(temp_dir.path()).unwrap_err();
        assert!(matches!(err, AieditError::ConfigError(_)));
    }

    #[test]
    fn test_current_branch() {
        let temp_dir = create_test_repo();
        assert_eq!(current_branch(temp_dir.path()).unwrap(), "main");
    }

    #[test]
    fn test_branch_name_validation() {
        let temp_dir = create_test_repo();
        assert!(is_valid_branch_name(temp_dir.path(), "aiedit/20260101-120000"));
        assert!(!is_valid_branch_name(temp_dir.path(), "bad..name"));
        assert!(!is_valid_branch_name(temp_dir.path(), "has space"));
    }

    #[test]
    fn test_has_remote() {
        let plain = create_test_repo();
        assert!(!has_remote(plain.path(), "origin").unwrap());

        let with_remote = create_test_repo_with_remote();
        assert!(has_remote(with_remote.path(), "origin").unwrap());
    }
}
