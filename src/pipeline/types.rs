//! Results produced by each stage of a file run.

use crate::agent::{AgentError, AgentOutcome};
use serde::{Serialize, Serializer};
use std::fmt::Display;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// How a single reviewer call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Ok,
    Failed,
    TimedOut,
}

/// One reviewer's contribution to a run.
///
/// `feedback` is set iff the status is `ok`, `error` iff it is not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewResult {
    pub agent: String,
    pub status: ReviewStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

impl ReviewResult {
    pub fn from_outcome(agent: &str, outcome: AgentOutcome, elapsed: Duration) -> Self {
        let elapsed_ms = elapsed.as_millis() as u64;
        match outcome {
            Ok(feedback) => Self {
                agent: agent.to_string(),
                status: ReviewStatus::Ok,
                feedback: Some(feedback),
                error: None,
                elapsed_ms,
            },
            Err(err) => Self {
                agent: agent.to_string(),
                status: if err.is_timeout() {
                    ReviewStatus::TimedOut
                } else {
                    ReviewStatus::Failed
                },
                feedback: None,
                error: Some(err.to_string()),
                elapsed_ms,
            },
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == ReviewStatus::Ok
    }
}

/// Every reviewer's result for one run, in configuration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ReviewSet {
    pub results: Vec<ReviewResult>,
}

impl ReviewSet {
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ReviewResult> {
        self.results.iter()
    }

    pub fn ok_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_ok()).count()
    }

    /// True when at least one reviewer produced feedback.
    pub fn has_feedback(&self) -> bool {
        self.ok_count() > 0
    }

    /// `(agent, cause)` for every reviewer that did not respond.
    pub fn failures(&self) -> Vec<(&str, &str)> {
        self.results
            .iter()
            .filter_map(|r| r.error.as_deref().map(|cause| (r.agent.as_str(), cause)))
            .collect()
    }
}

/// Where the consolidated feedback came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "agent", rename_all = "snake_case")]
pub enum SummarySource {
    /// The configured summarizer agent.
    Agent(String),
    /// Built-in consolidation, used when no summarizer is configured.
    Builtin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryResult {
    pub source: SummarySource,
    pub text: String,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImplementationResult {
    pub agent: String,
    /// Normalized replacement content.
    #[serde(skip)]
    pub content: String,
    pub elapsed_ms: u64,
}

/// Why a run ended in `failed`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RunFailure {
    #[error("cannot read input file: {0}")]
    Unreadable(String),

    #[error("summarizer failed: {0}")]
    Aggregation(AgentError),

    #[error("implementer failed: {0}")]
    Implementation(AgentError),

    #[error("failed to write result: {0}")]
    Write(String),

    #[error("run aborted: {0}")]
    Aborted(String),
}

/// Terminal record of one file run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    /// No reviewer produced feedback; nothing downstream ran.
    NoFeedback { reviews: ReviewSet },

    /// Feedback was consolidated but no implementer is configured.
    ReviewedOnly {
        reviews: ReviewSet,
        summary: SummaryResult,
    },

    Implemented {
        reviews: ReviewSet,
        summary: SummaryResult,
        implementation: ImplementationResult,
        /// False when the implementer returned the original content.
        changed: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        backup: Option<PathBuf>,
    },

    Failed {
        #[serde(serialize_with = "as_display")]
        failure: RunFailure,
        reviews: ReviewSet,
        #[serde(skip_serializing_if = "Option::is_none")]
        summary: Option<SummaryResult>,
    },
}

impl RunOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            RunOutcome::NoFeedback { .. } => "no_feedback",
            RunOutcome::ReviewedOnly { .. } => "reviewed_only",
            RunOutcome::Implemented { .. } => "implemented",
            RunOutcome::Failed { .. } => "failed",
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, RunOutcome::Failed { .. })
    }

    /// True when the run rewrote the file with different content.
    pub fn changed(&self) -> bool {
        matches!(self, RunOutcome::Implemented { changed: true, .. })
    }
}

/// A run's outcome together with the file it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRun {
    pub path: PathBuf,
    #[serde(flatten)]
    pub outcome: RunOutcome,
}

fn as_display<T: Display, S: Serializer>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}
