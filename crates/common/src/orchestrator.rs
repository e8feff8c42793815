//! Lifecycle orchestration
//!
//! Walks identity → secret → join → action → leave, one step at a time.
//! Whatever happens after the run starts, the session is handed back to
//! [`NetworkSession::leave`] before the outcome is returned; the only path
//! that skips the final leave is the `logout` action, which has already
//! left by the time it returns.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::{ConfigSource, Settings};
use crate::dispatch::{ActionDispatcher, ActionOutcome, ActionPrompt, ActionReport};
use crate::error::{Error, Result, Stage, StageFailure};
use crate::exec::CommandExecutor;
use crate::identity::{resolve_hostname, resolve_secret_name};
use crate::secret::{fetch_secret, SecretStore};
use crate::session::{LeaveReport, NetworkSession};

/// How a run ended
#[derive(Debug)]
pub enum ExitOutcome {
    /// A diagnostic action ran and the node left the tailnet
    Completed(ActionReport),
    /// The operator chose `logout`
    LoggedOut,
    Failed(StageFailure),
}

impl ExitOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            ExitOutcome::Completed(_) | ExitOutcome::LoggedOut => 0,
            ExitOutcome::Failed(_) => 1,
        }
    }

    /// Terminal lifecycle stage
    pub fn stage(&self) -> Stage {
        match self {
            ExitOutcome::Completed(_) | ExitOutcome::LoggedOut => Stage::Disconnected,
            ExitOutcome::Failed(_) => Stage::Failed,
        }
    }
}

pub struct Orchestrator<'a> {
    config: &'a dyn ConfigSource,
    secrets: &'a dyn SecretStore,
    prompt: &'a dyn ActionPrompt,
    session: NetworkSession,
    settings: Settings,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        config: &'a dyn ConfigSource,
        secrets: &'a dyn SecretStore,
        prompt: &'a dyn ActionPrompt,
        executor: Arc<dyn CommandExecutor>,
        settings: Settings,
    ) -> Self {
        Self {
            config,
            secrets,
            prompt,
            session: NetworkSession::new(executor, &settings.tailscale),
            settings,
        }
    }

    /// Run the lifecycle to completion
    pub async fn run(self) -> ExitOutcome {
        self.run_until(std::future::pending()).await
    }

    /// Run the lifecycle, abandoning the current step if `shutdown` resolves
    /// first. Teardown still runs after an interruption.
    pub async fn run_until<F>(mut self, shutdown: F) -> ExitOutcome
    where
        F: Future<Output = ()>,
    {
        let mut stage = Stage::Start;
        let result = tokio::select! {
            result = self.drive(&mut stage) => result,
            _ = shutdown => {
                warn!("Interrupted, cleaning up");
                Err(Error::Interrupted)
            }
        };

        match result {
            Ok(ActionOutcome::LoggedOut(_)) => ExitOutcome::LoggedOut,
            Ok(ActionOutcome::Reported(report)) => {
                self.teardown().await;
                info!("Tailscale disconnected. Exiting...");
                ExitOutcome::Completed(report)
            }
            Err(error) => {
                error!("{} step failed: {}", stage, error);
                self.teardown().await;
                ExitOutcome::Failed(StageFailure { stage, error })
            }
        }
    }

    async fn drive(&mut self, stage: &mut Stage) -> Result<ActionOutcome> {
        let identity = resolve_hostname(self.config)?;
        *stage = Stage::IdentityResolved;

        let secret_name = resolve_secret_name(self.config, &identity)?;
        info!("Fetching auth key from secret {}", secret_name);
        let credential = fetch_secret(self.secrets, &secret_name).await?;
        *stage = Stage::CredentialFetched;

        self.session
            .join(&identity, &credential, self.join_timeout())
            .await?;
        drop(credential);
        *stage = Stage::Connected;

        let outcome = ActionDispatcher::new(self.prompt, self.settings.prompt.default_action)
            .select_and_run(&mut self.session)
            .await?;
        *stage = Stage::ActionDone;
        Ok(outcome)
    }

    async fn teardown(&mut self) {
        if let LeaveReport::Failed(reason) = self.session.leave().await {
            warn!("Teardown left the node in an unknown state: {}", reason);
        }
    }

    fn join_timeout(&self) -> Duration {
        self.settings.tailscale.join_timeout()
    }
}
