//! Post-join actions
//!
//! The operator picks exactly one action once the node is on the tailnet.
//! Selection goes through [`ActionPrompt`], which hands back the raw choice;
//! anything outside [`Action::ALL`] is rejected rather than ignored.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::info;

use crate::error::{DispatchError, ExecError, Result};
use crate::session::{LeaveReport, NetworkSession};

pub const PROMPT_QUESTION: &str = "Which tailscale command would you like to execute?";

/// Post-join action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Leave the tailnet and stop
    Logout,
    /// Status of this node, without peers
    Status,
    /// Local network diagnostics
    Netcheck,
    /// Whois lookup of this node's own tailnet address
    Whois,
}

impl Action {
    pub const ALL: [Action; 4] = [Action::Logout, Action::Status, Action::Netcheck, Action::Whois];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Logout => "logout",
            Action::Status => "status",
            Action::Netcheck => "netcheck",
            Action::Whois => "whois",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = DispatchError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| DispatchError::UnknownAction(s.to_string()))
    }
}

/// Blocking list prompt presented to the operator
#[async_trait]
pub trait ActionPrompt: Send + Sync {
    async fn choose(
        &self,
        question: &str,
        choices: &[&str],
        default: &str,
    ) -> std::result::Result<String, DispatchError>;
}

/// Prompt that always answers with a preselected choice
#[derive(Debug, Clone)]
pub struct FixedChoice(String);

impl FixedChoice {
    pub fn new(choice: impl Into<String>) -> Self {
        Self(choice.into())
    }
}

impl From<Action> for FixedChoice {
    fn from(action: Action) -> Self {
        Self(action.as_str().to_string())
    }
}

#[async_trait]
impl ActionPrompt for FixedChoice {
    async fn choose(
        &self,
        _question: &str,
        _choices: &[&str],
        _default: &str,
    ) -> std::result::Result<String, DispatchError> {
        Ok(self.0.clone())
    }
}

/// Captured output of a diagnostic action
#[derive(Debug, Clone, Serialize)]
pub struct ActionReport {
    pub action: Action,
    /// Address the action was run against, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    pub output: String,
}

#[derive(Debug, Clone)]
pub enum ActionOutcome {
    /// The node already left the tailnet; the run ends here
    LoggedOut(LeaveReport),
    Reported(ActionReport),
}

pub struct ActionDispatcher<'a> {
    prompt: &'a dyn ActionPrompt,
    default: Action,
}

impl<'a> ActionDispatcher<'a> {
    pub fn new(prompt: &'a dyn ActionPrompt, default: Action) -> Self {
        Self { prompt, default }
    }

    /// Ask the operator for an action and run it against `session`.
    pub async fn select_and_run(&self, session: &mut NetworkSession) -> Result<ActionOutcome> {
        let choices = Action::ALL.map(|a| a.as_str());
        let answer = self
            .prompt
            .choose(PROMPT_QUESTION, &choices, self.default.as_str())
            .await?;
        let action: Action = answer.trim().parse()?;
        self.run(action, session).await
    }

    pub async fn run(&self, action: Action, session: &mut NetworkSession) -> Result<ActionOutcome> {
        let ts = session.tailscale().clone();
        let (target, output) = match action {
            Action::Logout => {
                let report = session.leave().await;
                info!("Logout requested, exiting...");
                return Ok(ActionOutcome::LoggedOut(report));
            }
            Action::Status => {
                info!("Fetching status of the current Tailscale node...");
                (None, session.executor().exec(&ts.status()).await?.stdout)
            }
            Action::Netcheck => {
                info!("Running diagnostics on the local network for the current Tailscale node...");
                (None, session.executor().exec(&ts.netcheck()).await?.stdout)
            }
            Action::Whois => {
                info!("Fetching whois information for the current Tailscale node...");
                let address = self_address(session).await?;
                let output = session.executor().exec(&ts.whois(&address)).await?.stdout;
                (Some(address), output)
            }
        };

        info!("{}", output.trim_end());
        Ok(ActionOutcome::Reported(ActionReport {
            action,
            target,
            output,
        }))
    }
}

/// First tailnet IPv4 address reported for this node
async fn self_address(session: &NetworkSession) -> Result<String> {
    let cmd = session.tailscale().self_ip();
    let output = session.executor().exec(&cmd).await?;
    output
        .stdout
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            ExecError::InvalidOutput {
                command: cmd.to_string(),
                reason: "no address reported".to_string(),
            }
            .into()
        })
}
