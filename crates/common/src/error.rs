//! Error types for Tailgate

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Result type alias using Tailgate Error
pub type Result<T> = std::result::Result<T, Error>;

/// Tailgate error types
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Secret(#[from] SecretError),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Execution(#[from] ExecError),

    #[error("Interrupted before the lifecycle completed")]
    Interrupted,
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No hostname configured: set TS_HOSTNAME or OPS_OP_NAME")]
    MissingHostname,

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Secret store errors
#[derive(Error, Debug)]
pub enum SecretError {
    #[error("Secret not found: {name}")]
    NotFound { name: String },

    #[error("Secret store request for {name} failed: {reason}")]
    TransportFailure { name: String, reason: String },
}

/// Overlay network errors
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Failed to join tailnet as {hostname}: {diagnostic}")]
    JoinFailed { hostname: String, diagnostic: String },

    #[error("Joining tailnet as {hostname} timed out after {seconds}s")]
    JoinTimedOut { hostname: String, seconds: u64 },
}

/// Action selection and dispatch errors
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Prompt failed: {0}")]
    Prompt(String),
}

/// External command errors
#[derive(Error, Debug)]
pub enum ExecError {
    #[error("Failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} exited with {code}: {stderr}")]
    NonZeroExit {
        command: String,
        code: i32,
        stderr: String,
    },

    #[error("{command} produced unusable output: {reason}")]
    InvalidOutput { command: String, reason: String },
}

/// Lifecycle stages, in the order the orchestrator walks them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Start,
    IdentityResolved,
    CredentialFetched,
    Connected,
    ActionDone,
    Disconnected,
    Failed,
}

impl Stage {
    /// Human-readable name of the step that runs while in this stage
    pub fn step(&self) -> &'static str {
        match self {
            Stage::Start => "identity",
            Stage::IdentityResolved => "secret",
            Stage::CredentialFetched => "join",
            Stage::Connected => "action",
            Stage::ActionDone => "leave",
            Stage::Disconnected => "done",
            Stage::Failed => "failed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.step())
    }
}

/// An error together with the stage that was running when it occurred
#[derive(Error, Debug)]
#[error("{stage} step failed: {error}")]
pub struct StageFailure {
    pub stage: Stage,
    #[source]
    pub error: Error,
}
