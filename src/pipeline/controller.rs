//! End-to-end run of one file, and of many files side by side.
//!
//! A run moves through `init -> reviewing -> (no_feedback | summarizing) ->
//! (failed | reviewed_only | implementing) -> (failed | implemented)`. The
//! target file is read once at init and written at most once, atomically, by
//! the run that owns it.

use crate::agent::{AgentInvoker, Roster};
use crate::config::Settings;
use crate::fs::{atomic_write_file, write_backup};
use crate::pipeline::fanout::run_reviewers;
use crate::pipeline::implement::implement;
use crate::pipeline::report::print_consolidated;
use crate::pipeline::summarize::summarize;
use crate::pipeline::types::{FileRun, ReviewSet, RunFailure, RunOutcome, SummaryResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

pub struct PipelineController {
    settings: Settings,
    roster: Roster,
    invoker: AgentInvoker,
}

impl PipelineController {
    pub fn new(settings: Settings, roster: Roster, invoker: AgentInvoker) -> Self {
        Self {
            settings,
            roster,
            invoker,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Run the pipeline on one file.
    pub async fn run_file(&self, path: &Path) -> RunOutcome {
        let file = path.display().to_string();
        info!(file = %file, stage = "init", "starting run");

        let original = match read_target(path) {
            Ok(content) => content,
            Err(failure) => {
                warn!(file = %file, error = %failure, "skipping unreadable file");
                return RunOutcome::Failed {
                    failure,
                    reviews: ReviewSet::default(),
                    summary: None,
                };
            }
        };

        info!(
            file = %file,
            stage = "reviewing",
            reviewers = self.roster.reviewers.len(),
            "dispatching reviewers"
        );
        let reviews = run_reviewers(
            &self.invoker,
            &self.roster.reviewers,
            &file,
            &original,
            self.settings.verbose,
        )
        .await;

        if !reviews.has_feedback() {
            info!(file = %file, stage = "no_feedback", "no reviewer produced feedback");
            return RunOutcome::NoFeedback { reviews };
        }

        info!(
            file = %file,
            stage = "summarizing",
            ok = reviews.ok_count(),
            failed = reviews.len() - reviews.ok_count(),
            "consolidating feedback"
        );
        let summary =
            match summarize(&self.invoker, self.roster.summarizer.as_ref(), &file, &reviews).await
            {
                Ok(summary) => summary,
                Err(err) => {
                    warn!(file = %file, stage = "failed", error = %err, "summarizer failed");
                    return RunOutcome::Failed {
                        failure: RunFailure::Aggregation(err),
                        reviews,
                        summary: None,
                    };
                }
            };
        if self.settings.verbose {
            print_consolidated(&file, &summary);
        }

        let Some(implementer) = self.roster.implementer.as_ref() else {
            info!(file = %file, stage = "reviewed_only", "no implementer configured");
            return RunOutcome::ReviewedOnly { reviews, summary };
        };

        info!(file = %file, stage = "implementing", agent = implementer.name(), "applying feedback");
        let implementation =
            match implement(&self.invoker, implementer, &file, &original, &summary).await {
                Ok(result) => result,
                Err(err) => {
                    warn!(file = %file, stage = "failed", error = %err, "implementer failed");
                    return RunOutcome::Failed {
                        failure: RunFailure::Implementation(err),
                        reviews,
                        summary: Some(summary),
                    };
                }
            };

        if implementation.content == original {
            info!(file = %file, stage = "implemented", "content unchanged; nothing written");
            return RunOutcome::Implemented {
                reviews,
                summary,
                implementation,
                changed: false,
                backup: None,
            };
        }

        let backup = if self.settings.backup {
            match write_backup(path, &original) {
                Ok(backup) => Some(backup),
                Err(err) => {
                    return write_failed(&file, err.to_string(), reviews, summary);
                }
            }
        } else {
            None
        };

        if let Err(err) = atomic_write_file(path, &implementation.content) {
            return write_failed(&file, err.to_string(), reviews, summary);
        }

        info!(
            file = %file,
            stage = "implemented",
            bytes = implementation.content.len(),
            "file rewritten"
        );
        RunOutcome::Implemented {
            reviews,
            summary,
            implementation,
            changed: true,
            backup,
        }
    }

    /// Run every file, at most `jobs` at a time.
    ///
    /// Outcomes are returned in input order. One file's failure never affects
    /// another file's run.
    pub async fn run_all(self: Arc<Self>, paths: Vec<PathBuf>) -> Vec<FileRun> {
        let semaphore = Arc::new(Semaphore::new(self.settings.jobs.max(1)));
        let mut join_set = JoinSet::new();

        for (idx, path) in paths.iter().cloned().enumerate() {
            let controller = Arc::clone(&self);
            let semaphore = Arc::clone(&semaphore);
            join_set.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let outcome = controller.run_file(&path).await;
                (idx, outcome)
            });
        }

        let mut slots: Vec<Option<RunOutcome>> = vec![None; paths.len()];
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((idx, outcome)) => slots[idx] = Some(outcome),
                Err(e) => warn!(error = %e, "file run did not complete"),
            }
        }

        paths
            .into_iter()
            .zip(slots)
            .map(|(path, slot)| FileRun {
                path,
                outcome: slot.unwrap_or_else(|| RunOutcome::Failed {
                    failure: RunFailure::Aborted("file run panicked".to_string()),
                    reviews: ReviewSet::default(),
                    summary: None,
                }),
            })
            .collect()
    }
}

fn read_target(path: &Path) -> Result<String, RunFailure> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| RunFailure::Unreadable(format!("{}: {}", path.display(), e)))?;
    if !metadata.is_file() {
        return Err(RunFailure::Unreadable(format!(
            "{}: not a regular file",
            path.display()
        )));
    }
    let bytes = std::fs::read(path)
        .map_err(|e| RunFailure::Unreadable(format!("{}: {}", path.display(), e)))?;
    String::from_utf8(bytes)
        .map_err(|_| RunFailure::Unreadable(format!("{}: not valid UTF-8 text", path.display())))
}

fn write_failed(
    file: &str,
    cause: String,
    reviews: ReviewSet,
    summary: SummaryResult,
) -> RunOutcome {
    warn!(file = %file, stage = "failed", error = %cause, "could not write result");
    RunOutcome::Failed {
        failure: RunFailure::Write(cause),
        reviews,
        summary: Some(summary),
    }
}
