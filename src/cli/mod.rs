//! CLI argument parsing for aiedit.
//!
//! Uses clap derive macros for declarative argument definitions. Values are
//! only parsed here; cross-field checks and environment lookups happen when
//! [`crate::config::Settings`] is resolved.

use clap::Parser;
use std::path::PathBuf;

/// aiedit: review files with a panel of AI agents, consolidate the feedback,
/// and optionally apply it.
///
/// Reviewers run concurrently on every file. Their feedback goes to the
/// summarizer (if any), and the consolidated result to the implementer (if
/// any), whose output replaces the file.
#[derive(Parser, Debug)]
#[command(name = "aiedit")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Comma-separated reviewer agent names (may be empty).
    #[arg(long)]
    pub agents: String,

    /// Agent that consolidates reviewer feedback.
    #[arg(long)]
    pub summarizer: Option<String>,

    /// Agent that rewrites the file from the consolidated feedback.
    #[arg(long)]
    pub implementer: Option<String>,

    /// Print every agent's full output (Y or N).
    #[arg(long, default_value = "N", value_parser = parse_yes_no, action = clap::ArgAction::Set)]
    pub verbose: bool,

    /// Files to process. Glob patterns are expanded.
    #[arg(required = true, value_name = "FILENAMES")]
    pub filenames: Vec<String>,

    /// Directory holding `<name>.yml` agent documents.
    #[arg(long, default_value = "agents")]
    pub agents_dir: PathBuf,

    /// Default time budget per agent call, in seconds.
    #[arg(long, default_value_t = 600)]
    pub timeout_seconds: u64,

    /// Number of files processed concurrently.
    #[arg(long, default_value_t = 1)]
    pub jobs: usize,

    /// Keep the original content in `<file>.orig` before replacing it.
    #[arg(long)]
    pub backup: bool,

    /// Commit changed files on a new branch, push it and open a pull request.
    #[arg(long)]
    pub publish: bool,

    /// Prefix of the branch created by --publish.
    #[arg(long, default_value = "aiedit")]
    pub branch_prefix: String,

    /// Remote pushed to by --publish.
    #[arg(long, default_value = "origin")]
    pub remote: String,

    /// Write a JSON report of every run to this path.
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Emit log lines as JSON.
    #[arg(long)]
    pub log_json: bool,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

fn parse_yes_no(value: &str) -> Result<bool, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" | "true" => Ok(true),
        "n" | "no" | "false" => Ok(false),
        other => Err(format!("expected Y or N, got '{}'", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_debug_assert() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_minimal() {
        let cli = Cli::try_parse_from(["aiedit", "--agents=typo,security", "README.md"]).unwrap();
        assert_eq!(cli.agents, "typo,security");
        assert_eq!(cli.filenames, vec!["README.md"]);
        assert!(!cli.verbose);
        assert_eq!(cli.timeout_seconds, 600);
        assert_eq!(cli.jobs, 1);
        assert_eq!(cli.agents_dir, PathBuf::from("agents"));
        assert_eq!(cli.branch_prefix, "aiedit");
        assert_eq!(cli.remote, "origin");
    }

    #[test]
    fn test_parse_full() {
        let cli = Cli::try_parse_from([
            "aiedit",
            "--agents=typo",
            "--summarizer=lead",
            "--implementer=editor",
            "--verbose=Y",
            "--backup",
            "--jobs",
            "4",
            "--report",
            "out.json",
            "a.py",
            "src/*.rs",
        ])
        .unwrap();
        assert_eq!(cli.summarizer.as_deref(), Some("lead"));
        assert_eq!(cli.implementer.as_deref(), Some("editor"));
        assert!(cli.verbose);
        assert!(cli.backup);
        assert_eq!(cli.jobs, 4);
        assert_eq!(cli.report, Some(PathBuf::from("out.json")));
        assert_eq!(cli.filenames, vec!["a.py", "src/*.rs"]);
    }

    #[test]
    fn test_empty_agents_is_accepted() {
        let cli = Cli::try_parse_from(["aiedit", "--agents=", "a.py"]).unwrap();
        assert_eq!(cli.agents, "");
    }

    #[test]
    fn test_agents_is_required() {
        assert!(Cli::try_parse_from(["aiedit", "a.py"]).is_err());
    }

    #[test]
    fn test_filenames_are_required() {
        assert!(Cli::try_parse_from(["aiedit", "--agents=typo"]).is_err());
    }

    #[test]
    fn test_verbose_flag_takes_a_value() {
        let on = Cli::try_parse_from(["aiedit", "--agents=a", "--verbose=Y", "f"]).unwrap();
        assert!(on.verbose);
        let off = Cli::try_parse_from(["aiedit", "--agents=a", "--verbose=n", "f"]).unwrap();
        assert!(!off.verbose);
        let spaced = Cli::try_parse_from(["aiedit", "--agents=a", "--verbose", "yes", "f"]).unwrap();
        assert!(spaced.verbose);
        assert_eq!(spaced.filenames, vec!["f"]);
        assert!(Cli::try_parse_from(["aiedit", "--agents=a", "--verbose=maybe", "f"]).is_err());
    }

    #[test]
    fn test_verbose_values() {
        assert_eq!(parse_yes_no("y"), Ok(true));
        assert_eq!(parse_yes_no("N"), Ok(false));
        assert!(parse_yes_no("maybe").is_err());
    }
}
