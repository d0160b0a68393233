use crate::agent::{
    AgentError, AgentHandle, AgentOutcome, AgentRequest, AgentRole, AgentService, AgentSpec,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, LazyLock, Mutex, MutexGuard};
use std::time::Duration;
use tempfile::TempDir;

static CWD_LOCK: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

pub(crate) struct DirGuard {
    original: PathBuf,
    _lock: MutexGuard<'static, ()>,
}

impl DirGuard {
    pub(crate) fn new(new_dir: &Path) -> Self {
        // The current directory is process-wide; hold the lock even under #[serial].
        let lock = CWD_LOCK.lock().unwrap_or_else(|poison| poison.into_inner());
        let original = std::env::current_dir().unwrap();
        std::env::set_current_dir(new_dir).unwrap();
        Self {
            original,
            _lock: lock,
        }
    }
}

impl Drop for DirGuard {
    fn drop(&mut self) {
        let _ = std::env::set_current_dir(&self.original);
    }
}

/// A fully resolved agent with plausible settings.
pub(crate) fn agent_spec(name: &str) -> AgentSpec {
    AgentSpec {
        name: name.to_string(),
        model_id: "gpt-4.1".to_string(),
        temperature: 0.2,
        top_p: 1.0,
        instructions: format!("You are the {} agent.", name),
        tools: Vec::new(),
        timeout: None,
        prompt_template: None,
    }
}

pub(crate) fn handle(name: &str, role: AgentRole) -> AgentHandle {
    AgentHandle {
        spec: Arc::new(agent_spec(name)),
        role,
    }
}

/// What a scripted agent does when called.
#[derive(Debug, Clone)]
pub(crate) enum Script {
    Reply(String),
    Fail(AgentError),
    /// Wait, then behave like the inner script.
    Delayed(Duration, Box<Script>),
    /// Never answer.
    Hang,
    Panic,
    /// Pick a script by whether the prompt mentions `needle`.
    When {
        needle: String,
        then: Box<Script>,
        otherwise: Box<Script>,
    },
}

impl Script {
    pub(crate) fn reply(text: &str) -> Self {
        Script::Reply(text.to_string())
    }

    pub(crate) fn fail(err: AgentError) -> Self {
        Script::Fail(err)
    }

    pub(crate) fn delayed(delay: Duration, then: Script) -> Self {
        Script::Delayed(delay, Box::new(then))
    }

    pub(crate) fn when(needle: &str, then: Script, otherwise: Script) -> Self {
        Script::When {
            needle: needle.to_string(),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        }
    }
}

/// In-memory [`AgentService`] that answers from per-agent scripts and
/// records every request it receives.
#[derive(Default)]
pub(crate) struct ScriptedService {
    scripts: HashMap<String, Script>,
    requests: Mutex<Vec<AgentRequest>>,
}

impl ScriptedService {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with(mut self, agent: &str, script: Script) -> Self {
        self.scripts.insert(agent.to_string(), script);
        self
    }

    /// Requests sent to `agent`, in call order.
    pub(crate) fn requests(&self, agent: &str) -> Vec<AgentRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.agent == agent)
            .cloned()
            .collect()
    }

    pub(crate) fn calls(&self, agent: &str) -> usize {
        self.requests(agent).len()
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl AgentService for ScriptedService {
    async fn run(&self, request: AgentRequest) -> AgentOutcome {
        self.requests.lock().unwrap().push(request.clone());

        let mut current = match self.scripts.get(&request.agent) {
            Some(script) => script,
            None => {
                return Err(AgentError::Unavailable(format!(
                    "no script for agent '{}'",
                    request.agent
                )));
            }
        };

        loop {
            match current {
                Script::Reply(text) => return Ok(text.clone()),
                Script::Fail(err) => return Err(err.clone()),
                Script::Delayed(delay, next) => {
                    tokio::time::sleep(*delay).await;
                    current = next.as_ref();
                }
                Script::Hang => std::future::pending::<()>().await,
                Script::Panic => panic!("scripted panic in agent '{}'", request.agent),
                Script::When {
                    needle,
                    then,
                    otherwise,
                } => {
                    current = if request.input.contains(needle.as_str()) {
                        then.as_ref()
                    } else {
                        otherwise.as_ref()
                    };
                }
            }
        }
    }
}

pub(crate) fn create_test_repo() -> TempDir {
    create_repo(CreateRepoOptions {
        add_origin_remote: false,
    })
}

pub(crate) fn create_test_repo_with_remote() -> TempDir {
    create_repo(CreateRepoOptions {
        add_origin_remote: true,
    })
}

struct CreateRepoOptions {
    add_origin_remote: bool,
}

fn create_repo(opts: CreateRepoOptions) -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path();

    git(path, &["init"]);
    // Deterministic default branch name across environments.
    git(path, &["symbolic-ref", "HEAD", "refs/heads/main"]);

    git(path, &["config", "user.email", "test@example.com"]);
    git(path, &["config", "user.name", "Test User"]);

    std::fs::write(path.join("README.md"), "# Test\n").unwrap();
    git(path, &["add", "."]);
    git(path, &["commit", "-m", "Initial commit"]);

    if opts.add_origin_remote {
        // A bare clone stands in for the remote so pushes are accepted.
        let remote_dir = path.join(".remote.git");
        let remote = remote_dir.to_string_lossy().to_string();
        let source = path.to_string_lossy().to_string();
        git(path, &["clone", "--bare", "--quiet", &source, &remote]);
        git(path, &["remote", "add", "origin", &remote]);
        std::fs::write(path.join(".git").join("info").join("exclude"), ".remote.git\n").unwrap();
    }

    temp_dir
}

pub(crate) fn git(repo_dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .current_dir(repo_dir)
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("failed to execute git {}: {}", args.join(" "), e));

    if !output.status.success() {
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        panic!(
            "git {} failed (exit code {:?})\nstdout:\n{}\nstderr:\n{}",
            args.join(" "),
            output.status.code(),
            stdout,
            stderr
        );
    }

    String::from_utf8_lossy(&output.stdout).trim().to_string()
}
