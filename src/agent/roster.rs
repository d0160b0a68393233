//! Role assignment for one invocation.
//!
//! Agent names from the command line are resolved exactly once, before any
//! file is processed, into typed handles grouped by role. A name that does not
//! resolve is a configuration error.

use crate::agent::config::{AgentCatalog, AgentSpec};
use crate::agent::prompt::validate_template;
use crate::error::{AieditError, Result};
use std::sync::Arc;
use tracing::warn;

/// What an agent is asked to do in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentRole {
    Reviewer,
    Summarizer,
    Implementer,
}

impl AgentRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRole::Reviewer => "reviewer",
            AgentRole::Summarizer => "summarizer",
            AgentRole::Implementer => "implementer",
        }
    }
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved agent bound to a role.
#[derive(Debug, Clone)]
pub struct AgentHandle {
    pub spec: Arc<AgentSpec>,
    pub role: AgentRole,
}

impl AgentHandle {
    pub fn name(&self) -> &str {
        &self.spec.name
    }
}

/// Agent names as requested on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RosterRequest {
    pub reviewers: Vec<String>,
    pub summarizer: Option<String>,
    pub implementer: Option<String>,
}

impl RosterRequest {
    /// Every distinct agent name, reviewers first, in request order.
    pub fn all_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        let candidates = self
            .reviewers
            .iter()
            .chain(self.summarizer.iter())
            .chain(self.implementer.iter());
        for name in candidates {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        names
    }
}

/// The agents taking part in every file run of this invocation.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    /// Reviewers in configuration order, without duplicates.
    pub reviewers: Vec<AgentHandle>,
    pub summarizer: Option<AgentHandle>,
    pub implementer: Option<AgentHandle>,
}

impl Roster {
    /// Resolve a request against the loaded catalog.
    ///
    /// Duplicate reviewer names are dropped (with a warning) so every reviewer
    /// contributes exactly one result per run.
    pub fn resolve(request: &RosterRequest, catalog: &AgentCatalog) -> Result<Self> {
        let mut reviewers: Vec<AgentHandle> = Vec::with_capacity(request.reviewers.len());
        for name in &request.reviewers {
            if reviewers.iter().any(|r| r.name() == name) {
                warn!(agent = %name, "reviewer listed more than once; running it once");
                continue;
            }
            reviewers.push(bind(catalog, name, AgentRole::Reviewer)?);
        }

        let summarizer = request
            .summarizer
            .as_deref()
            .map(|name| bind(catalog, name, AgentRole::Summarizer))
            .transpose()?;
        let implementer = request
            .implementer
            .as_deref()
            .map(|name| bind(catalog, name, AgentRole::Implementer))
            .transpose()?;

        Ok(Roster {
            reviewers,
            summarizer,
            implementer,
        })
    }

    pub fn reviewer_names(&self) -> Vec<&str> {
        self.reviewers.iter().map(AgentHandle::name).collect()
    }
}

fn bind(catalog: &AgentCatalog, name: &str, role: AgentRole) -> Result<AgentHandle> {
    match catalog.get(name) {
        Some(spec) => {
            if let Some(template) = spec.prompt_template.as_deref() {
                validate_template(role, template).map_err(|e| {
                    AieditError::ConfigError(format!("agent '{}': {}", name, e))
                })?;
            }
            Ok(AgentHandle { spec, role })
        }
        None => Err(AieditError::ConfigError(format!(
            "{} agent '{}' is not loaded.\nAvailable agents: {}",
            role,
            name,
            available_agents(catalog)
        ))),
    }
}

/// Formatted list of loaded agents for error messages.
fn available_agents(catalog: &AgentCatalog) -> String {
    if catalog.is_empty() {
        "(none)".to_string()
    } else {
        catalog.names().join(", ")
    }
}
