//! External command execution

use async_trait::async_trait;
use std::fmt;
use std::process::Stdio;
use tracing::debug;

use crate::error::ExecError;
use crate::identity::NodeIdentity;
use crate::secret::Credential;

/// A command line to run. Arguments flagged secret are masked when displayed.
#[derive(Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    secret_args: Vec<usize>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            secret_args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add an argument that must never show up in logs
    pub fn secret_arg(mut self, arg: impl Into<String>) -> Self {
        self.secret_args.push(self.args.len());
        self.args.push(arg.into());
        self
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for (idx, arg) in self.args.iter().enumerate() {
            if self.secret_args.contains(&idx) {
                let flag = arg.split_once('=').map(|(flag, _)| flag);
                match flag {
                    Some(flag) => write!(f, " {}=<redacted>", flag)?,
                    None => f.write_str(" <redacted>")?,
                }
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invocation({})", self)
    }
}

/// Captured result of a finished command
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub code: Option<i32>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs external commands to completion
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run `invocation` and capture its output. Exit status is not checked.
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput, ExecError>;

    /// Run `invocation`, failing on non-zero exit
    async fn exec(&self, invocation: &Invocation) -> Result<CommandOutput, ExecError> {
        let output = self.run(invocation).await?;
        if output.success() {
            Ok(output)
        } else {
            Err(ExecError::NonZeroExit {
                command: invocation.to_string(),
                code: output.code.unwrap_or(-1),
                stderr: output.stderr.trim().to_string(),
            })
        }
    }
}

/// Executor backed by real child processes
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessExecutor;

#[async_trait]
impl CommandExecutor for ProcessExecutor {
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput, ExecError> {
        debug!("Running {}", invocation);

        let output = tokio::process::Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| ExecError::Launch {
                program: invocation.program.clone(),
                source,
            })?;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            code: output.status.code(),
        })
    }
}

/// Tailscale client command lines
#[derive(Debug, Clone)]
pub struct TailscaleCommand {
    binary: String,
}

impl TailscaleCommand {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn base(&self) -> Invocation {
        Invocation::new(self.binary.clone())
    }

    pub fn up(
        &self,
        credential: &Credential,
        hostname: &NodeIdentity,
        accept_routes: bool,
        timeout_secs: u64,
    ) -> Invocation {
        let mut cmd = self
            .base()
            .arg("up")
            .secret_arg(format!("--authkey={}", credential.expose()));
        if accept_routes {
            cmd = cmd.arg("--accept-routes");
        }
        cmd.arg("--timeout")
            .arg(format!("{}s", timeout_secs))
            .arg("--hostname")
            .arg(hostname.as_str())
    }

    pub fn logout(&self) -> Invocation {
        self.base().arg("logout")
    }

    /// Status of the local node only
    pub fn status(&self) -> Invocation {
        self.base().arg("status").arg("--peers=false")
    }

    pub fn netcheck(&self) -> Invocation {
        self.base().arg("netcheck")
    }

    /// This node's tailnet IPv4 address
    pub fn self_ip(&self) -> Invocation {
        self.base().arg("ip").arg("--4")
    }

    pub fn whois(&self, address: &str) -> Invocation {
        self.base().arg("whois").arg(address)
    }
}
