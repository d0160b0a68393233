//! Single agent calls with a bounded time budget.
//!
//! [`AgentService`] is the seam to the remote agent execution service. The
//! [`AgentInvoker`] wraps it: it applies the agent's timeout, rejects empty
//! output and turns every failure into an [`AgentError`], so callers always
//! get an [`AgentOutcome`] back.

use crate::agent::config::{AgentSpec, McpTool};
use crate::agent::error::{AgentError, AgentOutcome};
use crate::agent::roster::AgentHandle;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// One request to the agent service.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentRequest {
    /// Agent name, for logging and routing in test doubles.
    pub agent: String,
    pub model: String,
    pub instructions: String,
    pub input: String,
    pub temperature: f64,
    pub top_p: f64,
    pub tools: Vec<McpTool>,
    /// Budget the invoker enforces for this call.
    pub timeout: Duration,
}

impl AgentRequest {
    pub fn new(spec: &AgentSpec, input: String, timeout: Duration) -> Self {
        Self {
            agent: spec.name.clone(),
            model: spec.model_id.clone(),
            instructions: spec.instructions.clone(),
            input,
            temperature: spec.temperature,
            top_p: spec.top_p,
            tools: spec.tools.clone(),
            timeout,
        }
    }
}

/// Remote capability that runs an agent on a prompt.
///
/// Implementations report failures as [`AgentError`] and may take as long as
/// they like; the invoker enforces timeouts.
#[async_trait]
pub trait AgentService: Send + Sync {
    async fn run(&self, request: AgentRequest) -> AgentOutcome;
}

/// Invokes agents through an [`AgentService`].
#[derive(Clone)]
pub struct AgentInvoker {
    service: Arc<dyn AgentService>,
    default_timeout: Duration,
}

impl AgentInvoker {
    pub fn new(service: Arc<dyn AgentService>, default_timeout: Duration) -> Self {
        Self {
            service,
            default_timeout,
        }
    }

    /// Run `agent` on `prompt`.
    ///
    /// Returns within the agent's timeout. Whitespace-only output counts as
    /// an invalid response.
    pub async fn invoke(&self, agent: &AgentHandle, prompt: String) -> AgentOutcome {
        let timeout = agent.spec.effective_timeout(self.default_timeout);
        let request = AgentRequest::new(&agent.spec, prompt, timeout);
        let started = Instant::now();

        debug!(
            agent = agent.name(),
            role = %agent.role,
            model = %agent.spec.model_id,
            timeout_secs = timeout.as_secs(),
            "invoking agent"
        );

        let outcome = match tokio::time::timeout(timeout, self.service.run(request)).await {
            Err(_) => Err(AgentError::Timeout(timeout)),
            Ok(Err(err)) => Err(err),
            Ok(Ok(text)) if text.trim().is_empty() => Err(AgentError::InvalidResponse(
                "agent returned empty output".to_string(),
            )),
            Ok(Ok(text)) => Ok(text),
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &outcome {
            Ok(text) => debug!(
                agent = agent.name(),
                role = %agent.role,
                elapsed_ms,
                chars = text.len(),
                "agent finished"
            ),
            Err(err) => warn!(
                agent = agent.name(),
                role = %agent.role,
                elapsed_ms,
                error = %err,
                "agent failed"
            ),
        }

        outcome
    }
}
