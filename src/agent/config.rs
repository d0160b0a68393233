//! Agent document schema and loading.
//!
//! Each agent lives in its own YAML document, `<agents-dir>/<name>.yml`
//! (`.yaml` is accepted too).
//!
//! # File Format
//!
//! ```yaml
//! model:
//!   id: gpt-4.1
//!   options:
//!     temperature: 0.2
//!     top_p: 0.9
//! instructions: |
//!   You are a security reviewer. Point out injection risks.
//! timeout_seconds: 300        # optional, overrides --timeout-seconds
//! prompt_template: |          # optional, see `agent::prompt`
//!   Review {filename} for injection risks:
//!   {content}
//! tools:                      # optional; omitted or [] means no tool use
//!   - type: mcp
//!     id: search_docs
//!     options:
//!       server_url: https://learn.example.com/mcp
//!       server_label: docs
//! ```
//!
//! Documents are validated as a whole: every problem in a document is
//! reported at once, and every missing document is reported at once.

use crate::error::{AieditError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use std::time::Duration;

/// Label used for MCP tools that do not declare one.
const DEFAULT_SERVER_LABEL: &str = "Unknown";

static AGENT_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]*$").expect("Invalid agent name regex"));

/// Raw agent document as written on disk. Every field is optional here so
/// validation can report all missing fields together.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentDocument {
    #[serde(default)]
    pub model: Option<ModelSection>,

    #[serde(default)]
    pub instructions: Option<String>,

    #[serde(default)]
    pub tools: Option<Vec<ToolDocument>>,

    #[serde(default)]
    pub timeout_seconds: Option<u64>,

    /// Replaces the built-in prompt for this agent's role.
    #[serde(default)]
    pub prompt_template: Option<String>,

    /// Unknown fields preserved for forward compatibility.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelSection {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub options: Option<ModelOptions>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelOptions {
    #[serde(default)]
    pub temperature: Option<f64>,

    #[serde(default)]
    pub top_p: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolDocument {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,

    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub options: Option<ToolOptions>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolOptions {
    #[serde(default)]
    pub server_url: Option<String>,

    #[serde(default)]
    pub server_label: Option<String>,
}

/// MCP tool an agent may call through the agent service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct McpTool {
    pub id: String,
    pub server_url: String,
    pub server_label: String,
}

/// Fully validated agent configuration. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentSpec {
    pub name: String,
    pub model_id: String,
    pub temperature: f64,
    pub top_p: f64,
    pub instructions: String,
    pub tools: Vec<McpTool>,
    /// Per-agent override of the global timeout.
    pub timeout: Option<Duration>,
    pub prompt_template: Option<String>,
}

impl AgentSpec {
    /// Parse and validate an agent document.
    pub fn from_yaml(name: &str, yaml: &str) -> Result<Self> {
        let document: AgentDocument = serde_yaml::from_str(yaml).map_err(|e| {
            AieditError::ConfigError(format!("YAML parsing error in agent '{}': {}", name, e))
        })?;
        Self::from_document(name, document)
    }

    /// Validate a parsed document, collecting every problem.
    pub fn from_document(name: &str, document: AgentDocument) -> Result<Self> {
        let mut errors = Vec::new();

        let model = document.model.unwrap_or_default();
        let model_id = model.id.unwrap_or_default().trim().to_string();
        if model_id.is_empty() {
            errors.push("missing 'model.id'".to_string());
        }

        let mut temperature = 0.0;
        let mut top_p = 0.0;
        match model.options {
            None => errors.push("missing 'model.options'".to_string()),
            Some(options) => {
                match options.temperature {
                    None => errors.push("missing 'model.options.temperature'".to_string()),
                    Some(t) if !(0.0..=2.0).contains(&t) => errors.push(format!(
                        "'model.options.temperature' must be between 0 and 2 (got {})",
                        t
                    )),
                    Some(t) => temperature = t,
                }
                match options.top_p {
                    None => errors.push("missing 'model.options.top_p'".to_string()),
                    Some(p) if !(0.0..=1.0).contains(&p) => errors.push(format!(
                        "'model.options.top_p' must be between 0 and 1 (got {})",
                        p
                    )),
                    Some(p) => top_p = p,
                }
            }
        }

        let instructions = document.instructions.unwrap_or_default();
        if instructions.trim().is_empty() {
            errors.push("missing 'instructions'".to_string());
        }

        if document.timeout_seconds == Some(0) {
            errors.push("'timeout_seconds' must be greater than 0".to_string());
        }

        // Omitted and empty both mean no tool use.
        let mut tools = Vec::new();
        for (index, tool) in document.tools.unwrap_or_default().into_iter().enumerate() {
            match validate_tool(tool) {
                Ok(tool) => tools.push(tool),
                Err(problem) => errors.push(format!("tools[{}]: {}", index, problem)),
            }
        }

        if !errors.is_empty() {
            return Err(AieditError::ConfigError(format!(
                "agent '{}' is invalid: {}",
                name,
                errors.join(", ")
            )));
        }

        Ok(AgentSpec {
            name: name.to_string(),
            model_id,
            temperature,
            top_p,
            instructions,
            tools,
            timeout: document.timeout_seconds.map(Duration::from_secs),
            prompt_template: document.prompt_template.filter(|t| !t.trim().is_empty()),
        })
    }

    /// Effective timeout given the global default.
    pub fn effective_timeout(&self, default: Duration) -> Duration {
        self.timeout.unwrap_or(default)
    }
}

fn validate_tool(tool: ToolDocument) -> std::result::Result<McpTool, String> {
    if tool.kind.as_deref() != Some("mcp") {
        return Err(format!(
            "unsupported tool type '{}' (only 'mcp' is supported)",
            tool.kind.unwrap_or_default()
        ));
    }
    let id = tool
        .id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| "missing 'id'".to_string())?;
    let options = tool.options.unwrap_or_default();
    let server_url = options
        .server_url
        .filter(|url| !url.trim().is_empty())
        .ok_or_else(|| "missing 'options.server_url'".to_string())?;

    Ok(McpTool {
        id,
        server_url,
        server_label: options
            .server_label
            .unwrap_or_else(|| DEFAULT_SERVER_LABEL.to_string()),
    })
}

/// All agent documents needed for one invocation, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct AgentCatalog {
    agents: BTreeMap<String, Arc<AgentSpec>>,
}

impl AgentCatalog {
    /// Load the named agents from `dir`.
    ///
    /// Names are de-duplicated. Missing documents are collected and reported
    /// in a single error; the first invalid document aborts the load.
    pub fn load<P: AsRef<Path>>(dir: P, names: &[String]) -> Result<Self> {
        let dir = dir.as_ref();
        let mut catalog = AgentCatalog::default();
        let mut missing = Vec::new();

        for name in names {
            if catalog.agents.contains_key(name) {
                continue;
            }
            if !AGENT_NAME.is_match(name) {
                return Err(AieditError::ConfigError(format!(
                    "invalid agent name '{}': use letters, digits, '-', '_' or '.'",
                    name
                )));
            }

            let Some(path) = document_path(dir, name) else {
                missing.push(name.clone());
                continue;
            };

            let yaml = std::fs::read_to_string(&path).map_err(|e| {
                AieditError::ConfigError(format!(
                    "failed to read agent document '{}': {}",
                    path.display(),
                    e
                ))
            })?;
            let spec = AgentSpec::from_yaml(name, &yaml)?;
            catalog.insert(spec);
        }

        if !missing.is_empty() {
            return Err(AieditError::ConfigError(format!(
                "missing agent document(s) in '{}': {}",
                dir.display(),
                missing.join(", ")
            )));
        }

        Ok(catalog)
    }

    /// Add an already validated agent.
    pub fn insert(&mut self, spec: AgentSpec) {
        self.agents.insert(spec.name.clone(), Arc::new(spec));
    }

    /// Get an agent by name.
    pub fn get(&self, name: &str) -> Option<Arc<AgentSpec>> {
        self.agents.get(name).cloned()
    }

    /// Names of all loaded agents, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.agents.keys().map(String::as_str).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

fn document_path(dir: &Path, name: &str) -> Option<PathBuf> {
    ["yml", "yaml"]
        .iter()
        .map(|ext| dir.join(format!("{}.{}", name, ext)))
        .find(|path| path.is_file())
}
