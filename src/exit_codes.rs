//! Exit code constants for the aiedit CLI.
//!
//! - 0: Every file run finished without reaching `failed`
//! - 1: Configuration error (bad args, missing agent documents, environment)
//! - 2: At least one file run reached `failed`, or the report could not be written
//! - 3: Publication (git / pull request) failure

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// Configuration error detected before any agent was invoked.
pub const CONFIG_ERROR: i32 = 1;

/// One or more file runs reached the `failed` outcome, or the JSON report
/// could not be written after the runs finished.
pub const RUN_FAILURE: i32 = 2;

/// Branch, commit, push or pull request creation failed.
pub const PUBLISH_FAILURE: i32 = 3;
