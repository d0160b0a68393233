//! Expansion of file arguments into the list of runs.

use crate::error::{AieditError, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::warn;

fn is_pattern(arg: &str) -> bool {
    arg.contains(['*', '?', '['])
}

/// Expand glob patterns and de-duplicate the resulting paths.
///
/// Directories are skipped with a warning, patterns matching nothing are
/// warned about. Literal paths are kept even if missing; their run reports
/// the problem. An empty result is a ConfigError.
pub fn expand_inputs(args: &[String]) -> Result<Vec<PathBuf>> {
    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut files: Vec<PathBuf> = Vec::new();

    for arg in args {
        let candidates: Vec<PathBuf> = if is_pattern(arg) {
            let entries = glob::glob(arg).map_err(|e| {
                AieditError::ConfigError(format!("invalid file pattern '{}': {}", arg, e))
            })?;
            let mut matched = Vec::new();
            for entry in entries {
                match entry {
                    Ok(path) => matched.push(path),
                    Err(e) => warn!(pattern = %arg, error = %e, "cannot read pattern match"),
                }
            }
            if matched.is_empty() {
                warn!(pattern = %arg, "pattern matched no files");
            }
            matched
        } else {
            vec![PathBuf::from(arg)]
        };

        for path in candidates {
            if path.is_dir() {
                warn!(path = %path.display(), "skipping directory");
                continue;
            }
            if seen.insert(identity(&path)) {
                files.push(path);
            }
        }
    }

    if files.is_empty() {
        return Err(AieditError::ConfigError(format!(
            "no input files matched: {}",
            args.join(" ")
        )));
    }
    Ok(files)
}

/// Key under which two spellings of the same file compare equal.
fn identity(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
