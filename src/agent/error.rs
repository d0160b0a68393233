//! Typed failures of a single agent call.

use std::time::Duration;
use thiserror::Error;

/// Why an agent call did not produce usable text.
///
/// Every failure of the remote service ends up as one of these variants. They
/// are recorded in review results and run outcomes rather than propagated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AgentError {
    /// Credentials were rejected by the agent service.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The service could not be reached or refused the request (network, quota, 5xx).
    #[error("agent service unavailable: {0}")]
    Unavailable(String),

    /// No response within the agent's time budget.
    #[error("timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// The service answered, but with empty, truncated or malformed output.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl AgentError {
    /// Whether this failure was a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, AgentError::Timeout(_))
    }
}

/// Result of one agent call: the agent's text, or why there is none.
pub type AgentOutcome = std::result::Result<String, AgentError>;
