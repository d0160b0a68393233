//! Implementation of the review command.
//!
//! # What a review invocation does
//!
//! 1. Resolves settings from the command line and environment
//! 2. Checks that publication can work (only with `--publish`)
//! 3. Expands file arguments
//! 4. Loads every named agent document and assigns roles
//! 5. Runs the pipeline on every file, `--jobs` at a time
//! 6. Prints the summary and writes the JSON report (with `--report`); a
//!    report that cannot be written turns the exit code into a run failure
//! 7. Publishes changed files (with `--publish`)
//!
//! Steps 1 to 4 fail before any agent is contacted.

use crate::agent::{AgentCatalog, AgentInvoker, AgentService, ResponsesService, Roster};
use crate::cli::Cli;
use crate::config::Settings;
use crate::error::{AieditError, Result};
use crate::exit_codes;
use crate::files::expand_inputs;
use crate::pipeline::PipelineController;
use crate::pipeline::report::{exit_code, print_summary, write_json_report};
use crate::publish::{PublishCredits, preflight, publish};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

/// Execute a review invocation against the HTTP agent service.
///
/// Returns the exit code derived from the run outcomes.
pub fn cmd_review(cli: Cli) -> Result<i32> {
    let settings = Settings::from_env(&cli)?;
    let cwd = std::env::current_dir()
        .map_err(|e| AieditError::IoError(format!("cannot determine current directory: {}", e)))?;
    let service = ResponsesService::new(&settings.endpoint, settings.api_key.clone())?;
    execute(settings, Arc::new(service), &cwd)
}

/// Run the whole invocation with `service` as the agent backend.
pub fn execute(settings: Settings, service: Arc<dyn AgentService>, cwd: &Path) -> Result<i32> {
    if let Some(publish_settings) = &settings.publish {
        preflight(cwd, publish_settings)?;
    }

    let files = expand_inputs(&settings.patterns)?;
    let catalog = AgentCatalog::load(&settings.agents_dir, &settings.roster.all_names())?;
    let roster = Roster::resolve(&settings.roster, &catalog)?;
    info!(
        files = files.len(),
        reviewers = roster.reviewers.len(),
        summarizer = roster.summarizer.as_ref().map(|a| a.name()).unwrap_or("-"),
        implementer = roster.implementer.as_ref().map(|a| a.name()).unwrap_or("-"),
        "configuration loaded"
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| AieditError::IoError(format!("failed to start async runtime: {}", e)))?;

    let invoker = AgentInvoker::new(service, settings.default_timeout);
    let controller = Arc::new(PipelineController::new(settings, roster, invoker));
    let runs = runtime.block_on(Arc::clone(&controller).run_all(files));

    print_summary(&runs);

    let settings = controller.settings();
    let mut code = exit_code(&runs);
    if let Some(path) = &settings.report {
        match write_json_report(path, &runs) {
            Ok(()) => info!(path = %path.display(), "report written"),
            Err(e) => {
                error!(path = %path.display(), error = %e, "could not write report");
                eprintln!("Error: could not write report: {}", e);
                code = exit_codes::RUN_FAILURE;
            }
        }
    }

    if let Some(publish_settings) = &settings.publish {
        let changed: Vec<PathBuf> = runs
            .iter()
            .filter(|run| run.outcome.changed())
            .map(|run| run.path.clone())
            .collect();

        if changed.is_empty() {
            info!("no file changed; nothing to publish");
        } else {
            let roster = controller.roster();
            let credits = PublishCredits {
                reviewers: roster.reviewer_names().into_iter().map(str::to_string).collect(),
                summarizer: roster.summarizer.as_ref().map(|a| a.name().to_string()),
                implementer: roster.implementer.as_ref().map(|a| a.name().to_string()),
            };
            let publication = publish(cwd, publish_settings, &changed, &credits)?;
            println!(
                "Published {} file(s) on branch '{}': {}",
                changed.len(),
                publication.branch,
                publication.pull_request
            );
        }
    }

    Ok(code)
}
