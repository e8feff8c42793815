//! Tailgate CLI - Main Entry Point
//!
//! Joins this machine to a Tailscale tailnet with an auth key from the
//! secret store, runs one diagnostic chosen by the operator, and logs out
//! again before exiting.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, Subscriber};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

use tailgate_common::config::{default_settings_path, HOSTNAME_KEY, SECRET_NAME_KEY};
use tailgate_common::{
    store_from_settings, Action, ActionPrompt, EnvConfig, FixedChoice, LayeredConfig, MapConfig,
    Orchestrator, ProcessExecutor, Settings,
};

mod output;
mod prompt;

use output::{print_error, print_outcome, OutputFormat};
use prompt::TerminalPrompt;

/// Tailgate - join a tailnet, run one diagnostic, leave
#[derive(Parser)]
#[command(name = "tailgate")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Settings file
    #[arg(short, long, env = "TAILGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Hostname to register as (overrides TS_HOSTNAME)
    #[arg(long)]
    hostname: Option<String>,

    /// Name of the secret holding the auth key (overrides AUTHKEY_SECRET_NAME)
    #[arg(long)]
    secret_name: Option<String>,

    /// Run this action instead of prompting
    #[arg(short, long, env = "TAILGATE_ACTION")]
    action: Option<Action>,

    /// Path to the tailscale binary
    #[arg(long)]
    tailscale_bin: Option<String>,

    /// Seconds to wait for the tailnet join
    #[arg(long)]
    join_timeout: Option<u64>,

    /// Output format
    #[arg(long, default_value = "plain")]
    format: OutputFormat,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

impl Cli {
    fn settings(&self) -> anyhow::Result<Settings> {
        let path = self.config.clone().unwrap_or_else(default_settings_path);
        let mut settings = Settings::load(&path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?;

        if let Some(binary) = &self.tailscale_bin {
            settings.tailscale.binary = binary.clone();
        }
        if let Some(secs) = self.join_timeout {
            settings.tailscale.join_timeout_secs = secs;
        }
        Ok(settings)
    }

    fn overrides(&self) -> MapConfig {
        let mut overrides = MapConfig::new();
        if let Some(hostname) = &self.hostname {
            overrides.set(HOSTNAME_KEY, hostname.clone());
        }
        if let Some(name) = &self.secret_name {
            overrides.set(SECRET_NAME_KEY, name.clone());
        }
        overrides
    }
}

/// Log subscriber writing to `writer`. The binary passes stderr so stdout
/// only carries the run summary.
fn build_subscriber<W>(verbose: bool, json: bool, writer: W) -> Box<dyn Subscriber + Send + Sync>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let log_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    if json {
        Box::new(
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .with_writer(writer)
                .finish(),
        )
    } else {
        Box::new(
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_target(false)
                .finish(),
        )
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing::subscriber::set_global_default(build_subscriber(
        cli.verbose,
        cli.log_json,
        std::io::stderr,
    ))
    .context("Failed to install logger")?;

    let settings = match cli.settings() {
        Ok(settings) => settings,
        Err(e) => {
            print_error(&format!("{:#}", e));
            std::process::exit(2);
        }
    };
    debug!("Using tailscale binary {}", settings.tailscale.binary);

    let config = LayeredConfig::new(cli.overrides(), EnvConfig);
    let secrets = store_from_settings(&settings.secrets);
    let prompt: Box<dyn ActionPrompt> = match cli.action {
        Some(action) => {
            info!("Action preselected: {}", action);
            Box::new(FixedChoice::from(action))
        }
        None => Box::new(TerminalPrompt),
    };

    let outcome = Orchestrator::new(
        &config,
        secrets.as_ref(),
        prompt.as_ref(),
        Arc::new(ProcessExecutor),
        settings,
    )
    .run_until(async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    })
    .await;

    print_outcome(&outcome, cli.format);
    std::process::exit(outcome.exit_code());
}
