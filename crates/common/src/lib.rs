//! Tailgate Common Library
//!
//! Connection lifecycle for short-lived tailnet nodes: resolve the node's
//! hostname, fetch its auth key, join the tailnet, run one operator-chosen
//! action, and leave again on every exit path.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod exec;
pub mod identity;
pub mod orchestrator;
pub mod secret;
pub mod session;

#[cfg(test)]
mod fakes;

// Re-export commonly used types
pub use config::{ConfigSource, EnvConfig, LayeredConfig, MapConfig, Settings};
pub use dispatch::{Action, ActionPrompt, ActionReport, FixedChoice};
pub use error::{Error, Result, Stage, StageFailure};
pub use exec::{CommandExecutor, ProcessExecutor};
pub use identity::{resolve_hostname, resolve_secret_name, NodeIdentity, SecretReference};
pub use orchestrator::{ExitOutcome, Orchestrator};
pub use secret::{fetch_secret, store_from_settings, Credential, SecretStore};
pub use session::{LeaveReport, NetworkSession, SessionState};

/// Tailgate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
