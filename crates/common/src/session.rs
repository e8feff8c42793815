//! Tailnet session control
//!
//! Owns the join/leave pair. `join` is fallible and time-bounded; `leave`
//! is best-effort and never fails, because it runs on the cleanup paths.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::TailscaleSettings;
use crate::error::{ExecError, NetworkError};
use crate::exec::{CommandExecutor, TailscaleCommand};
use crate::identity::NodeIdentity;
use crate::secret::Credential;

/// Extra time granted on top of the client's own `--timeout`
const JOIN_GRACE: Duration = Duration::from_secs(5);

/// Membership state of this process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connected,
}

/// Informational output of a successful join
#[derive(Debug, Clone, Default)]
pub struct JoinResult {
    pub output: String,
}

/// What happened when leaving
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaveReport {
    /// No join was attempted, or it was already released
    NothingToRelease,
    Released,
    Failed(String),
}

pub struct NetworkSession {
    executor: Arc<dyn CommandExecutor>,
    tailscale: TailscaleCommand,
    accept_routes: bool,
    state: SessionState,
    /// Set once `tailscale up` has been issued, cleared by a successful logout
    needs_release: bool,
}

impl NetworkSession {
    pub fn new(executor: Arc<dyn CommandExecutor>, settings: &TailscaleSettings) -> Self {
        Self {
            executor,
            tailscale: TailscaleCommand::new(settings.binary.clone()),
            accept_routes: settings.accept_routes,
            state: SessionState::Disconnected,
            needs_release: false,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn tailscale(&self) -> &TailscaleCommand {
        &self.tailscale
    }

    pub fn executor(&self) -> &dyn CommandExecutor {
        self.executor.as_ref()
    }

    /// Join the tailnet as `identity`, authenticating with `credential`.
    pub async fn join(
        &mut self,
        identity: &NodeIdentity,
        credential: &Credential,
        timeout: Duration,
    ) -> Result<JoinResult, NetworkError> {
        let secs = timeout.as_secs().max(1);
        let cmd = self
            .tailscale
            .up(credential, identity, self.accept_routes, secs);

        info!(
            "Connecting to Tailscale network using auth key for hostname '{}'...",
            identity
        );

        self.needs_release = true;
        let attempt =
            tokio::time::timeout(timeout.saturating_add(JOIN_GRACE), self.executor.exec(&cmd))
                .await;
        let output = match attempt {
            Err(_) => {
                return Err(NetworkError::JoinTimedOut {
                    hostname: identity.to_string(),
                    seconds: secs,
                })
            }
            Ok(Err(e)) => {
                return Err(NetworkError::JoinFailed {
                    hostname: identity.to_string(),
                    diagnostic: join_diagnostic(e),
                })
            }
            Ok(Ok(output)) => output,
        };

        self.state = SessionState::Connected;
        let output = output.stdout.trim().to_string();
        if !output.is_empty() {
            info!("{}", output);
        }
        info!("Successfully connected to Tailscale network.");
        Ok(JoinResult { output })
    }

    /// Log out of the tailnet.
    ///
    /// Issues the logout whenever a join was attempted, including a failed
    /// one, since the client may have registered before reporting the
    /// failure. Without a prior join attempt this is a no-op. Failures are
    /// logged and reported, never returned as errors.
    pub async fn leave(&mut self) -> LeaveReport {
        let was = self.state;
        self.state = SessionState::Disconnected;

        if !self.needs_release {
            debug!("Not joined to a Tailscale network, nothing to release");
            return LeaveReport::NothingToRelease;
        }

        info!("Disconnecting from Tailscale network...");
        match self.executor.exec(&self.tailscale.logout()).await {
            Ok(_) => {
                self.needs_release = false;
                info!("Tailscale disconnected.");
                LeaveReport::Released
            }
            Err(e) => {
                if was == SessionState::Connected {
                    warn!("Tailscale logout failed: {}", e);
                } else {
                    info!("Tailscale logout after failed join did not succeed: {}", e);
                }
                LeaveReport::Failed(e.to_string())
            }
        }
    }
}

fn join_diagnostic(err: ExecError) -> String {
    match err {
        ExecError::NonZeroExit { stderr, code, .. } if !stderr.is_empty() => {
            format!("{} (exit {})", stderr, code)
        }
        other => other.to_string(),
    }
}
