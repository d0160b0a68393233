//! Invocation settings for aiedit.
//!
//! [`Settings`] is resolved once from the command line and the environment,
//! validated as a whole, and then passed by reference to every component.
//! Nothing reads the environment after this point.

use crate::agent::RosterRequest;
use crate::cli::Cli;
use crate::error::{AieditError, Result};
use reqwest::Url;
use std::path::PathBuf;
use std::time::Duration;

/// Base URL of the agent service.
pub const ENDPOINT_ENV: &str = "AIEDIT_ENDPOINT";

/// Optional bearer token for the agent service.
pub const API_KEY_ENV: &str = "AIEDIT_API_KEY";

/// Where and how changed files are published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishSettings {
    pub branch_prefix: String,
    pub remote: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub agents_dir: PathBuf,
    pub roster: RosterRequest,
    /// Raw file arguments, before glob expansion.
    pub patterns: Vec<String>,
    pub default_timeout: Duration,
    pub verbose: bool,
    pub backup: bool,
    pub jobs: usize,
    /// Set when `--publish` was given.
    pub publish: Option<PublishSettings>,
    pub report: Option<PathBuf>,
}

impl Settings {
    /// Resolve settings from `cli` and the process environment.
    pub fn from_env(cli: &Cli) -> Result<Self> {
        Self::resolve(cli, |key| std::env::var(key).ok())
    }

    /// Resolve settings from `cli` and an environment lookup.
    ///
    /// Every problem is collected and reported in a single ConfigError.
    pub fn resolve<F>(cli: &Cli, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut problems: Vec<String> = Vec::new();

        let endpoint = match env(ENDPOINT_ENV).map(|v| v.trim().to_string()) {
            Some(value) if !value.is_empty() => match validate_endpoint(&value) {
                Ok(()) => value,
                Err(problem) => {
                    problems.push(problem);
                    String::new()
                }
            },
            _ => {
                problems.push(format!("{} is not set", ENDPOINT_ENV));
                String::new()
            }
        };
        let api_key = env(API_KEY_ENV)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        if cli.timeout_seconds == 0 {
            problems.push("--timeout-seconds must be greater than 0".to_string());
        }
        if cli.jobs == 0 {
            problems.push("--jobs must be greater than 0".to_string());
        }

        let publish = if cli.publish {
            if cli.branch_prefix.trim().is_empty() {
                problems.push("--branch-prefix must not be empty".to_string());
            }
            if cli.remote.trim().is_empty() {
                problems.push("--remote must not be empty".to_string());
            }
            Some(PublishSettings {
                branch_prefix: cli.branch_prefix.trim().trim_end_matches('/').to_string(),
                remote: cli.remote.trim().to_string(),
            })
        } else {
            None
        };

        if !problems.is_empty() {
            return Err(AieditError::ConfigError(problems.join("\n")));
        }

        Ok(Settings {
            endpoint,
            api_key,
            agents_dir: cli.agents_dir.clone(),
            roster: RosterRequest {
                reviewers: split_names(&cli.agents),
                summarizer: optional_name(cli.summarizer.as_deref()),
                implementer: optional_name(cli.implementer.as_deref()),
            },
            patterns: cli.filenames.clone(),
            default_timeout: Duration::from_secs(cli.timeout_seconds),
            verbose: cli.verbose,
            backup: cli.backup,
            jobs: cli.jobs,
            publish,
            report: cli.report.clone(),
        })
    }
}

fn validate_endpoint(value: &str) -> std::result::Result<(), String> {
    let url = Url::parse(value)
        .map_err(|e| format!("{} is not a valid URL ('{}'): {}", ENDPOINT_ENV, value, e))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!(
            "{} must be an http:// or https:// URL, got scheme '{}'",
            ENDPOINT_ENV,
            url.scheme()
        ));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(format!("{} has no host: '{}'", ENDPOINT_ENV, value));
    }
    Ok(())
}

fn split_names(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

fn optional_name(name: Option<&str>) -> Option<String> {
    name.map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}
