//! Consolidation of reviewer feedback.

use crate::agent::prompt::{PromptInputs, build_prompt};
use crate::agent::{AgentError, AgentHandle, AgentInvoker};
use crate::pipeline::types::{ReviewSet, SummaryResult, SummarySource};
use std::time::Instant;

/// Render every review as one feedback document.
///
/// Reviewers that did not respond are kept as explicit entries so the reader
/// knows which coverage is missing.
pub fn render_feedback(reviews: &ReviewSet) -> String {
    let mut out = String::new();
    for result in reviews.iter() {
        out.push_str(&format!("[{}]:\n", result.agent));
        match (&result.feedback, &result.error) {
            (Some(feedback), _) => out.push_str(feedback.trim_end()),
            (None, Some(cause)) => {
                out.push_str(&format!("this reviewer did not respond: {}", cause))
            }
            (None, None) => out.push_str("this reviewer did not respond"),
        }
        out.push_str("\n\n");
    }
    out
}

/// Produce the consolidated feedback for a run.
///
/// Callers only get here with at least one successful review. With no
/// summarizer configured the rendered feedback itself is the summary.
pub async fn summarize(
    invoker: &AgentInvoker,
    summarizer: Option<&AgentHandle>,
    filename: &str,
    reviews: &ReviewSet,
) -> Result<SummaryResult, AgentError> {
    let feedback = render_feedback(reviews);

    let Some(summarizer) = summarizer else {
        return Ok(SummaryResult {
            source: SummarySource::Builtin,
            text: feedback,
            elapsed_ms: 0,
        });
    };

    let inputs = PromptInputs {
        filename,
        content: None,
        feedback: Some(&feedback),
    };
    let prompt = build_prompt(summarizer, &inputs)
        .map_err(|e| AgentError::InvalidResponse(format!("prompt rendering failed: {}", e)))?;

    let started = Instant::now();
    let text = invoker.invoke(summarizer, prompt).await?;
    Ok(SummaryResult {
        source: SummarySource::Agent(summarizer.name().to_string()),
        text,
        elapsed_ms: started.elapsed().as_millis() as u64,
    })
}
