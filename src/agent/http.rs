//! HTTP client for the remote agent execution service.
//!
//! Speaks the Responses API shape: `POST {endpoint}/responses` with the
//! model, sampling options, instructions, prompt and MCP tool descriptors.
//! Every transport, status and payload problem is classified into an
//! [`AgentError`]; nothing here panics or retries.

use crate::agent::error::{AgentError, AgentOutcome};
use crate::agent::invoker::{AgentRequest, AgentService};
use crate::error::{AieditError, Result};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Longest slice of an error body quoted in messages.
const BODY_EXCERPT_CHARS: usize = 300;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Serialize)]
struct ResponsesBody<'a> {
    model: &'a str,
    instructions: &'a str,
    input: &'a str,
    temperature: f64,
    top_p: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<McpToolBody<'a>>,
}

#[derive(Debug, Serialize)]
struct McpToolBody<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    server_label: &'a str,
    server_url: &'a str,
    allowed_tools: Vec<&'a str>,
}

impl<'a> ResponsesBody<'a> {
    fn from_request(request: &'a AgentRequest) -> Self {
        Self {
            model: &request.model,
            instructions: &request.instructions,
            input: &request.input,
            temperature: request.temperature,
            top_p: request.top_p,
            tools: request
                .tools
                .iter()
                .map(|tool| McpToolBody {
                    kind: "mcp",
                    server_label: &tool.server_label,
                    server_url: &tool.server_url,
                    allowed_tools: vec![tool.id.as_str()],
                })
                .collect(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ResponsesReply {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    error: Option<ReplyError>,
    #[serde(default)]
    output_text: Option<String>,
    #[serde(default)]
    output: Vec<OutputItem>,
}

#[derive(Debug, Deserialize)]
struct ReplyError {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct OutputItem {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    content: Vec<ContentPart>,
}

#[derive(Debug, Deserialize)]
struct ContentPart {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// [`AgentService`] backed by an HTTP endpoint.
pub struct ResponsesService {
    http: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl ResponsesService {
    /// Build a client for `endpoint` (the base URL, without `/responses`).
    pub fn new(endpoint: &str, api_key: Option<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("aiedit/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| AieditError::ConfigError(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            url: responses_url(endpoint),
            api_key,
        })
    }

    async fn send(&self, request: &AgentRequest) -> anyhow::Result<reqwest::Response> {
        let mut builder = self
            .http
            .post(&self.url)
            .timeout(request.timeout)
            .json(&ResponsesBody::from_request(request));
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        builder
            .send()
            .await
            .with_context(|| format!("POST {} for agent '{}'", self.url, request.agent))
    }
}

#[async_trait]
impl AgentService for ResponsesService {
    async fn run(&self, request: AgentRequest) -> AgentOutcome {
        debug!(agent = %request.agent, url = %self.url, "sending agent request");

        let response = self
            .send(&request)
            .await
            .map_err(|e| classify_transport(e, request.timeout))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AgentError::Unavailable(format!("failed to read response body: {}", e)))?;

        if !status.is_success() {
            return Err(classify_status(status, &body, request.timeout));
        }
        extract_text(&body)
    }
}

fn responses_url(endpoint: &str) -> String {
    format!("{}/responses", endpoint.trim_end_matches('/'))
}

fn classify_transport(err: anyhow::Error, budget: Duration) -> AgentError {
    match err.downcast_ref::<reqwest::Error>() {
        Some(e) if e.is_timeout() => AgentError::Timeout(budget),
        Some(e) if e.is_connect() => {
            AgentError::Unavailable(format!("connection failed: {:#}", err))
        }
        _ => AgentError::Unavailable(format!("{:#}", err)),
    }
}

fn classify_status(status: StatusCode, body: &str, budget: Duration) -> AgentError {
    let detail = format!("HTTP {}: {}", status.as_u16(), excerpt(body));
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AgentError::Auth(detail),
        StatusCode::REQUEST_TIMEOUT => AgentError::Timeout(budget),
        _ => AgentError::Unavailable(detail),
    }
}

fn extract_text(body: &str) -> AgentOutcome {
    let reply: ResponsesReply = serde_json::from_str(body).map_err(|e| {
        AgentError::InvalidResponse(format!("malformed JSON ({}): {}", e, excerpt(body)))
    })?;

    if let Some(error) = reply.error {
        return Err(AgentError::InvalidResponse(format!(
            "service reported an error: {}",
            error.message
        )));
    }
    if let Some(status) = reply.status.as_deref()
        && matches!(status, "failed" | "incomplete" | "cancelled")
    {
        return Err(AgentError::InvalidResponse(format!("run ended as '{}'", status)));
    }

    if let Some(text) = reply.output_text {
        return Ok(text);
    }

    reply
        .output
        .iter()
        .rev()
        .find(|item| item.kind == "message")
        .map(|message| {
            message
                .content
                .iter()
                .filter(|part| part.kind == "output_text")
                .filter_map(|part| part.text.as_deref())
                .collect::<Vec<_>>()
                .join("")
        })
        .ok_or_else(|| AgentError::InvalidResponse("response has no message output".to_string()))
}

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= BODY_EXCERPT_CHARS {
        trimmed.to_string()
    } else {
        let cut: String = trimmed.chars().take(BODY_EXCERPT_CHARS).collect();
        format!("{}…", cut)
    }
}
