//! Concurrent reviewer dispatch.
//!
//! Every reviewer gets its own task; the stage returns only after all of them
//! reached a terminal state. Results are slotted by configuration index, so
//! the ReviewSet order never depends on completion order.

use crate::agent::prompt::{PromptInputs, build_prompt};
use crate::agent::{AgentError, AgentHandle, AgentInvoker};
use crate::pipeline::report::print_review;
use crate::pipeline::types::{ReviewResult, ReviewSet};
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Run every reviewer against `content` and collect one result each.
pub async fn run_reviewers(
    invoker: &AgentInvoker,
    reviewers: &[AgentHandle],
    filename: &str,
    content: &str,
    verbose: bool,
) -> ReviewSet {
    if reviewers.is_empty() {
        return ReviewSet::default();
    }

    let mut slots: Vec<Option<ReviewResult>> = vec![None; reviewers.len()];
    let mut join_set = JoinSet::new();

    for (idx, reviewer) in reviewers.iter().enumerate() {
        let inputs = PromptInputs {
            filename,
            content: Some(content),
            feedback: None,
        };
        let prompt = match build_prompt(reviewer, &inputs) {
            Ok(prompt) => prompt,
            Err(e) => {
                slots[idx] = Some(ReviewResult::from_outcome(
                    reviewer.name(),
                    Err(AgentError::InvalidResponse(format!("prompt rendering failed: {}", e))),
                    Duration::ZERO,
                ));
                continue;
            }
        };

        let invoker = invoker.clone();
        let reviewer = reviewer.clone();
        join_set.spawn(async move {
            let started = Instant::now();
            let outcome = invoker.invoke(&reviewer, prompt).await;
            (
                idx,
                ReviewResult::from_outcome(reviewer.name(), outcome, started.elapsed()),
            )
        });
    }

    debug!(file = filename, reviewers = reviewers.len(), "reviewers dispatched");

    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok((idx, result)) => {
                if verbose {
                    print_review(filename, &result);
                }
                slots[idx] = Some(result);
            }
            // The slot stays empty and is filled in below.
            Err(e) => warn!(file = filename, error = %e, "reviewer task did not complete"),
        }
    }

    let results = reviewers
        .iter()
        .zip(slots)
        .map(|(reviewer, slot)| {
            slot.unwrap_or_else(|| {
                let result = ReviewResult::from_outcome(
                    reviewer.name(),
                    Err(AgentError::Unavailable("reviewer task panicked".to_string())),
                    Duration::ZERO,
                );
                if verbose {
                    print_review(filename, &result);
                }
                result
            })
        })
        .collect();

    ReviewSet { results }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentRole;
    use crate::pipeline::types::ReviewStatus;
    use crate::test_support::{Script, ScriptedService, handle};
    use std::sync::Arc;

    fn reviewers(names: &[&str]) -> Vec<AgentHandle> {
        names
            .iter()
            .map(|name| handle(name, AgentRole::Reviewer))
            .collect()
    }

    fn invoker(service: &Arc<ScriptedService>) -> AgentInvoker {
        AgentInvoker::new(service.clone(), Duration::from_secs(60))
    }

    #[tokio::test(start_paused = true)]
    async fn test_results_follow_configuration_order() {
        // Completion order is c, b, a.
        let service = Arc::new(
            ScriptedService::new()
                .with("a", Script::delayed(Duration::from_secs(3), Script::reply("from a")))
                .with("b", Script::delayed(Duration::from_secs(2), Script::reply("from b")))
                .with("c", Script::delayed(Duration::from_secs(1), Script::reply("from c"))),
        );

        let set = run_reviewers(&invoker(&service), &reviewers(&["a", "b", "c"]), "f.md", "x", false)
            .await;

        let agents: Vec<&str> = set.iter().map(|r| r.agent.as_str()).collect();
        assert_eq!(agents, vec!["a", "b", "c"]);
        assert_eq!(set.results[1].feedback.as_deref(), Some("from b"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reviewers_run_concurrently() {
        let service = Arc::new(
            ScriptedService::new()
                .with("a", Script::delayed(Duration::from_secs(10), Script::reply("a")))
                .with("b", Script::delayed(Duration::from_secs(10), Script::reply("b"))),
        );

        let started = tokio::time::Instant::now();
        run_reviewers(&invoker(&service), &reviewers(&["a", "b"]), "f.md", "x", false).await;

        assert!(started.elapsed() < Duration::from_secs(20));
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_failure_does_not_affect_others() {
        let service = Arc::new(
            ScriptedService::new()
                .with("slow", Script::Hang)
                .with("broken", Script::fail(AgentError::Unavailable("HTTP 502".into())))
                .with("good", Script::reply("rename foo")),
        );

        let set = run_reviewers(
            &invoker(&service),
            &reviewers(&["slow", "broken", "good"]),
            "f.md",
            "x",
            false,
        )
        .await;

        assert_eq!(set.len(), 3);
        assert_eq!(set.results[0].status, ReviewStatus::TimedOut);
        assert_eq!(set.results[1].status, ReviewStatus::Failed);
        assert_eq!(set.results[2].status, ReviewStatus::Ok);
        assert_eq!(set.ok_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_reviewer_is_recorded_as_failed() {
        let service = Arc::new(
            ScriptedService::new()
                .with("boom", Script::Panic)
                .with("fine", Script::reply("ok")),
        );

        let set = run_reviewers(&invoker(&service), &reviewers(&["boom", "fine"]), "f.md", "x", false)
            .await;

        assert_eq!(set.results[0].agent, "boom");
        assert_eq!(set.results[0].status, ReviewStatus::Failed);
        assert!(set.results[0].error.as_deref().unwrap().contains("panicked"));
        assert!(set.results[1].is_ok());
    }

    #[tokio::test]
    async fn test_no_reviewers_returns_empty_set() {
        let service = Arc::new(ScriptedService::new());
        let set = run_reviewers(&invoker(&service), &[], "f.md", "x", false).await;
        assert!(set.is_empty());
        assert_eq!(service.total_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_reviewer_sees_the_content() {
        let service = Arc::new(
            ScriptedService::new()
                .with("a", Script::reply("ok"))
                .with("b", Script::reply("ok")),
        );

        run_reviewers(&invoker(&service), &reviewers(&["a", "b"]), "app.py", "print(1)", false).await;

        for name in ["a", "b"] {
            let requests = service.requests(name);
            assert_eq!(requests.len(), 1);
            assert!(requests[0].input.contains("CONTENT START\nprint(1)\nCONTENT END"));
            assert!(requests[0].input.contains("FILE: app.py"));
        }
    }
}
