//! Prompt rendering for each pipeline role.
//!
//! Every role has a built-in template. An agent document may replace it with
//! its own `prompt_template`, which is checked when the roster is resolved:
//! it may only reference the variables its role provides.
//!
//! | role        | variables                                       |
//! |-------------|-------------------------------------------------|
//! | reviewer    | `instructions`, `filename`, `content`           |
//! | summarizer  | `instructions`, `filename`, `feedback`          |
//! | implementer | `instructions`, `filename`, `feedback`, `content` |
//!
//! The agent's `instructions` are also sent separately as the system
//! instructions of every call.

mod template;

pub use template::{TemplateError, render_template, template_variables};

use crate::agent::roster::{AgentHandle, AgentRole};
use std::collections::HashMap;

pub const REVIEWER_TEMPLATE: &str = "Review the following content and provide feedback.

FILE: {filename}

CONTENT START
{content}
CONTENT END";

pub const SUMMARIZER_TEMPLATE: &str = "Consolidate the reviewer feedback below into one list of changes for {filename}. \
Reconcile contradicting reviewers and flag claims the content does not support. \
Some reviewers may not have responded; account for the missing coverage.

AGENT FEEDBACK START

{feedback}
AGENT FEEDBACK END";

pub const IMPLEMENTER_TEMPLATE: &str = "Edit the content (between CONTENT START and CONTENT END) based on the agent feedback. \
Reply with the complete revised content only, without the markers.

FILE: {filename}

AGENT FEEDBACK START

{feedback}
AGENT FEEDBACK END

CONTENT START
{content}
CONTENT END";

/// Values available to a prompt. Which ones are set depends on the role.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptInputs<'a> {
    pub filename: &'a str,
    pub content: Option<&'a str>,
    pub feedback: Option<&'a str>,
}

/// Built-in template for `role`.
pub fn default_template(role: AgentRole) -> &'static str {
    match role {
        AgentRole::Reviewer => REVIEWER_TEMPLATE,
        AgentRole::Summarizer => SUMMARIZER_TEMPLATE,
        AgentRole::Implementer => IMPLEMENTER_TEMPLATE,
    }
}

/// Variables a template for `role` may reference.
pub fn allowed_variables(role: AgentRole) -> &'static [&'static str] {
    match role {
        AgentRole::Reviewer => &["instructions", "filename", "content"],
        AgentRole::Summarizer => &["instructions", "filename", "feedback"],
        AgentRole::Implementer => &["instructions", "filename", "feedback", "content"],
    }
}

/// Check a custom template against the variables `role` provides.
pub fn validate_template(role: AgentRole, template: &str) -> Result<(), String> {
    let allowed = allowed_variables(role);
    let unknown: Vec<String> = template_variables(template)
        .map_err(|e| e.to_string())?
        .into_iter()
        .filter(|name| !allowed.contains(&name.as_str()))
        .collect();

    if unknown.is_empty() {
        Ok(())
    } else {
        Err(format!(
            "prompt_template uses variable(s) not available to a {}: {} (available: {})",
            role,
            unknown.join(", "),
            allowed.join(", ")
        ))
    }
}

/// Render the prompt `agent` receives for its role.
pub fn build_prompt(agent: &AgentHandle, inputs: &PromptInputs<'_>) -> Result<String, TemplateError> {
    let template = agent
        .spec
        .prompt_template
        .as_deref()
        .unwrap_or_else(|| default_template(agent.role));

    let mut variables: HashMap<&str, &str> = HashMap::new();
    variables.insert("instructions", agent.spec.instructions.as_str());
    variables.insert("filename", inputs.filename);
    if let Some(content) = inputs.content {
        variables.insert("content", content);
    }
    if let Some(feedback) = inputs.feedback {
        variables.insert("feedback", feedback);
    }

    render_template(template, &variables)
}
