//! Agent subsystem for aiedit.
//!
//! - **Config**: per-agent YAML documents (`agents/<name>.yml`)
//! - **Roster**: role assignment of loaded agents for one invocation
//! - **Prompt**: role templates rendered with file content and feedback
//! - **Invoker**: one bounded call to the agent service
//! - **Http**: the agent service spoken over HTTP
//!
//! Agents never see each other's raw output except through the pipeline:
//! reviewers see the file, the summarizer sees the feedback, the implementer
//! sees both.

pub mod config;
mod error;
pub mod http;
mod invoker;
pub mod prompt;
mod roster;

pub use config::AgentCatalog;
pub use error::{AgentError, AgentOutcome};
pub use http::ResponsesService;
pub use invoker::{AgentInvoker, AgentService};
pub use roster::{AgentHandle, Roster, RosterRequest};

#[cfg(test)]
pub use config::AgentSpec;
#[cfg(test)]
pub use invoker::AgentRequest;
#[cfg(test)]
pub use roster::AgentRole;
