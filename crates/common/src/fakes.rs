//! Recording fakes for the external collaborators

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;

use crate::error::{ExecError, SecretError};
use crate::exec::{CommandExecutor, CommandOutput, Invocation};
use crate::secret::SecretStore;

/// Scripted answer for one tailscale subcommand
#[derive(Debug, Clone)]
pub enum Reply {
    Exit {
        code: i32,
        stdout: String,
        stderr: String,
        delay: Option<Duration>,
    },
    LaunchFailure,
}

impl Reply {
    pub fn ok(stdout: &str) -> Self {
        Reply::Exit {
            code: 0,
            stdout: stdout.to_string(),
            stderr: String::new(),
            delay: None,
        }
    }

    pub fn fail(code: i32, stderr: &str) -> Self {
        Reply::Exit {
            code,
            stdout: String::new(),
            stderr: stderr.to_string(),
            delay: None,
        }
    }

    pub fn delayed(self, by: Duration) -> Self {
        match self {
            Reply::Exit { code, stdout, stderr, .. } => Reply::Exit {
                code,
                stdout,
                stderr,
                delay: Some(by),
            },
            other => other,
        }
    }
}

/// Executor answering by subcommand (first argument); unscripted ones succeed silently
#[derive(Default)]
pub struct ScriptedExecutor {
    replies: HashMap<String, Reply>,
    log: Mutex<Vec<Invocation>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, subcommand: &str, reply: Reply) -> Self {
        self.replies.insert(subcommand.to_string(), reply);
        self
    }

    /// Displayed (redacted) command lines, in call order
    pub fn commands(&self) -> Vec<String> {
        self.log.lock().iter().map(|i| i.to_string()).collect()
    }

    /// Raw invocations, in call order
    pub fn invocations(&self) -> Vec<Invocation> {
        self.log.lock().clone()
    }

    pub fn count(&self, subcommand: &str) -> usize {
        self.log
            .lock()
            .iter()
            .filter(|i| i.args.first().map(String::as_str) == Some(subcommand))
            .count()
    }
}

#[async_trait]
impl CommandExecutor for ScriptedExecutor {
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput, ExecError> {
        self.log.lock().push(invocation.clone());

        let subcommand = invocation.args.first().cloned().unwrap_or_default();
        match self.replies.get(&subcommand).cloned().unwrap_or_else(|| Reply::ok("")) {
            Reply::Exit { code, stdout, stderr, delay } => {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                Ok(CommandOutput {
                    stdout,
                    stderr,
                    code: Some(code),
                })
            }
            Reply::LaunchFailure => Err(ExecError::Launch {
                program: invocation.program.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not installed"),
            }),
        }
    }
}

/// In-memory secret store
#[derive(Default)]
pub struct MemorySecretStore {
    secrets: HashMap<String, String>,
    raw_response: Option<HashMap<String, String>>,
    failure: Option<String>,
    requests: Mutex<Vec<String>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.secrets.insert(name.to_string(), value.to_string());
        self
    }

    /// Answer every lookup with `response`, whatever was asked for
    pub fn answering_with(mut self, response: HashMap<String, String>) -> Self {
        self.raw_response = Some(response);
        self
    }

    pub fn failing(mut self, reason: &str) -> Self {
        self.failure = Some(reason.to_string());
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    async fn get_secret(&self, name: &str) -> Result<HashMap<String, String>, SecretError> {
        self.requests.lock().push(name.to_string());

        if let Some(reason) = &self.failure {
            return Err(SecretError::TransportFailure {
                name: name.to_string(),
                reason: reason.clone(),
            });
        }
        if let Some(response) = &self.raw_response {
            return Ok(response.clone());
        }
        self.secrets
            .get(name)
            .map(|value| HashMap::from([(name.to_string(), value.clone())]))
            .ok_or_else(|| SecretError::NotFound {
                name: name.to_string(),
            })
    }
}
