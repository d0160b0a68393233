//! Error types for the aiedit CLI.
//!
//! Process-level failures live here. Failures of individual agent calls are
//! [`crate::agent::AgentError`] and never escape a run; they are recorded in the
//! run's outcome instead.

use crate::exit_codes;
use thiserror::Error;

/// Main error type for aiedit operations.
#[derive(Error, Debug)]
pub enum AieditError {
    /// Invalid arguments, agent documents or environment. Raised before any
    /// agent is contacted.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Local I/O failure outside of a file run (report writing, runtime setup).
    #[error("{0}")]
    IoError(String),

    /// Git or GitHub CLI operation failed during publication.
    #[error("Git operation failed: {0}")]
    GitError(String),
}

impl AieditError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            AieditError::ConfigError(_) => exit_codes::CONFIG_ERROR,
            AieditError::IoError(_) => exit_codes::CONFIG_ERROR,
            AieditError::GitError(_) => exit_codes::PUBLISH_FAILURE,
        }
    }
}

/// Result type alias for aiedit operations.
pub type Result<T> = std::result::Result<T, AieditError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_has_correct_exit_code() {
        let err = AieditError::ConfigError("missing agents/typo.yml".to_string());
        assert_eq!(err.exit_code(), exit_codes::CONFIG_ERROR);
    }

    #[test]
    fn git_error_has_correct_exit_code() {
        let err = AieditError::GitError("push rejected".to_string());
        assert_eq!(err.exit_code(), exit_codes::PUBLISH_FAILURE);
    }

    #[test]
    fn error_messages_are_descriptive() {
        let err = AieditError::ConfigError("AIEDIT_ENDPOINT is not set".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: AIEDIT_ENDPOINT is not set"
        );

        let err = AieditError::GitError("branch exists".to_string());
        assert_eq!(err.to_string(), "Git operation failed: branch exists");
    }
}
