//! Command implementations for aiedit.
//!
//! aiedit has a single command; the dispatcher keeps `main` free of any
//! orchestration.

mod review;

use crate::cli::Cli;
use crate::error::Result;

/// Dispatch the parsed command line and return the process exit code.
pub fn dispatch(cli: Cli) -> Result<i32> {
    review::cmd_review(cli)
}
