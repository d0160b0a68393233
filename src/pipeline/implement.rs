//! Implementer stage: consolidated feedback in, replacement content out.
//!
//! No filesystem access happens here; the controller owns the write.

use crate::agent::prompt::{PromptInputs, build_prompt};
use crate::agent::{AgentError, AgentHandle, AgentInvoker};
use crate::pipeline::types::{ImplementationResult, SummaryResult};
use regex::Regex;
use std::sync::LazyLock;
use std::time::Instant;

const CONTENT_START: &str = "CONTENT START";
const CONTENT_END: &str = "CONTENT END";

static FENCED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\A\s*```[^\n`]*\n(.*?)(?:\r?\n)?```\s*\z").expect("Invalid code fence regex")
});

/// Ask the implementer for the revised content of `filename`.
pub async fn implement(
    invoker: &AgentInvoker,
    implementer: &AgentHandle,
    filename: &str,
    original: &str,
    summary: &SummaryResult,
) -> Result<ImplementationResult, AgentError> {
    let inputs = PromptInputs {
        filename,
        content: Some(original),
        feedback: Some(&summary.text),
    };
    let prompt = build_prompt(implementer, &inputs)
        .map_err(|e| AgentError::InvalidResponse(format!("prompt rendering failed: {}", e)))?;

    let started = Instant::now();
    let raw = invoker.invoke(implementer, prompt).await?;
    let content = normalize_content(&raw, original)?;

    Ok(ImplementationResult {
        agent: implementer.name().to_string(),
        content,
        elapsed_ms: started.elapsed().as_millis() as u64,
    })
}

/// Strip echoed content markers or a single wrapping code fence.
///
/// Anything before a `CONTENT START` line is chatter and is dropped. A start
/// marker without an end marker means the reply was cut off. Only the line
/// break next to a removed marker or fence goes with it; the rest of the body
/// is kept byte for byte, apart from the final line ending, which follows
/// `original`.
pub fn normalize_content(raw: &str, original: &str) -> Result<String, AgentError> {
    let starts = marker_lines(raw, CONTENT_START);
    let ends = marker_lines(raw, CONTENT_END);

    let body = match starts.first() {
        Some(&(_, body_start)) => {
            let Some(&(body_end, _)) = ends.iter().rev().find(|(at, _)| *at >= body_start) else {
                return Err(AgentError::InvalidResponse(
                    "truncated output: CONTENT START without CONTENT END".to_string(),
                ));
            };
            strip_line_break(&raw[body_start..body_end])
        }
        None if !ends.is_empty() => {
            return Err(AgentError::InvalidResponse(
                "malformed output: CONTENT END without CONTENT START".to_string(),
            ));
        }
        None => match FENCED.captures(raw) {
            // More than one fenced block is content, not a wrapper.
            Some(caps) if !caps[1].contains("\n```") => caps.get(1).map_or(raw, |m| m.as_str()),
            _ => raw,
        },
    };

    if body.trim().is_empty() {
        return Err(AgentError::InvalidResponse(
            "implementer returned no content".to_string(),
        ));
    }

    Ok(match_line_ending(body, original))
}

/// `(line start, next line start)` of every line that holds only `marker`.
fn marker_lines(raw: &str, marker: &str) -> Vec<(usize, usize)> {
    let mut found = Vec::new();
    let mut offset = 0;
    for line in raw.split_inclusive('\n') {
        if line.trim() == marker {
            found.push((offset, offset + line.len()));
        }
        offset += line.len();
    }
    found
}

fn strip_line_break(body: &str) -> &str {
    body.strip_suffix("\r\n")
        .or_else(|| body.strip_suffix('\n'))
        .unwrap_or(body)
}

fn match_line_ending(body: &str, original: &str) -> String {
    let ending = if original.ends_with("\r\n") {
        "\r\n"
    } else if original.ends_with('\n') {
        "\n"
    } else {
        ""
    };

    if ending.is_empty() {
        body.trim_end_matches(['\n', '\r']).to_string()
    } else if body.ends_with('\n') {
        body.to_string()
    } else {
        format!("{}{}", body, ending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentRole;
    use crate::pipeline::types::SummarySource;
    use crate::test_support::{Script, ScriptedService, handle};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_plain_reply_is_kept() {
        assert_eq!(normalize_content("x = 2\n", "x = 1\n").unwrap(), "x = 2\n");
    }

    #[test]
    fn test_trailing_newline_follows_original() {
        assert_eq!(normalize_content("x = 2", "x = 1\n").unwrap(), "x = 2\n");
        assert_eq!(normalize_content("x = 2\n\n", "x = 1").unwrap(), "x = 2");
    }

    #[test]
    fn test_echoed_markers_are_stripped() {
        let raw = "CONTENT START\nfn main() {}\nCONTENT END\n";
        assert_eq!(normalize_content(raw, "old\n").unwrap(), "fn main() {}\n");
    }

    #[test]
    fn test_start_marker_without_end_is_truncated() {
        let err = normalize_content("CONTENT START\nfn main() {", "old\n").unwrap_err();
        assert!(matches!(err, AgentError::InvalidResponse(_)));
        assert!(err.to_string().contains("truncated"));
    }

    #[test]
    fn test_chatter_before_markers_is_dropped() {
        let raw = "Sure, here it is:\nCONTENT START\nx = 2\nCONTENT END\nLet me know!\n";
        assert_eq!(normalize_content(raw, "x = 1\n").unwrap(), "x = 2\n");
    }

    #[test]
    fn test_chatter_before_cut_off_reply_is_truncated() {
        let raw = "Here is the revised file:\n\nCONTENT START\ndef handler(req):\n    db.exec";
        let err = normalize_content(raw, "old\n").unwrap_err();
        assert!(matches!(err, AgentError::InvalidResponse(_)));
        assert!(err.to_string().contains("truncated"));
    }

    #[test]
    fn test_end_marker_without_start_is_invalid() {
        let err = normalize_content("x = 2\nCONTENT END\n", "x = 1\n").unwrap_err();
        assert!(matches!(err, AgentError::InvalidResponse(_)));
        assert!(err.to_string().contains("CONTENT END without CONTENT START"));
    }

    #[test]
    fn test_echoed_original_is_a_fixed_point() {
        for original in ["\n\n# Title\n", "# Title\n\n\n", "a\r\nb\r\n", "no newline"] {
            assert_eq!(normalize_content(original, original).unwrap(), original);
            let echoed = format!("CONTENT START\n{}\nCONTENT END", original);
            assert_eq!(normalize_content(&echoed, original).unwrap(), original);
        }
    }

    #[test]
    fn test_crlf_fence_keeps_line_endings() {
        let raw = "```\r\na = 1\r\nb = 2\r\n```\r\n";
        assert_eq!(normalize_content(raw, "a = 0\r\n").unwrap(), "a = 1\r\nb = 2\r\n");
    }

    #[test]
    fn test_wrapping_fence_is_stripped() {
        let raw = "```python\nquery(\"SELECT * FROM t WHERE id = ?\", (id,))\n```";
        assert_eq!(
            normalize_content(raw, "old\n").unwrap(),
            "query(\"SELECT * FROM t WHERE id = ?\", (id,))\n"
        );
    }

    #[test]
    fn test_inner_fences_are_left_alone() {
        let raw = "# Usage\n\n```sh\ncargo run\n```\n\nDone.\n";
        assert_eq!(normalize_content(raw, "old\n").unwrap(), raw);
    }

    #[test]
    fn test_empty_markers_are_invalid() {
        let err = normalize_content("CONTENT START\n\nCONTENT END", "old").unwrap_err();
        assert!(err.to_string().contains("no content"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_implementer_receives_feedback_and_content() {
        let service = Arc::new(
            ScriptedService::new().with("editor", Script::reply("CONTENT START\nnew\nCONTENT END")),
        );
        let invoker = AgentInvoker::new(service.clone(), Duration::from_secs(60));
        let editor = handle("editor", AgentRole::Implementer);
        let summary = SummaryResult {
            source: SummarySource::Builtin,
            text: "rename old to new".into(),
            elapsed_ms: 0,
        };

        let result = implement(&invoker, &editor, "a.txt", "old\n", &summary)
            .await
            .unwrap();

        assert_eq!(result.content, "new\n");
        let prompt = &service.requests("editor")[0].input;
        assert!(prompt.contains("rename old to new"));
        assert!(prompt.contains("CONTENT START\nold\n\nCONTENT END"));
    }
}
