//! Output formatting for CLI

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tailgate_common::{ActionReport, ExitOutcome, Stage};

/// Output format
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Plain,
    /// JSON format
    Json,
}

/// Machine-readable summary of a run
#[derive(Serialize)]
struct RunSummary<'a> {
    status: &'static str,
    exit_code: i32,
    stage: Stage,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<&'a ActionReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    failed_step: Option<Stage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<'a> RunSummary<'a> {
    fn from_outcome(outcome: &'a ExitOutcome) -> Self {
        let mut summary = Self {
            status: "completed",
            exit_code: outcome.exit_code(),
            stage: outcome.stage(),
            report: None,
            failed_step: None,
            error: None,
        };
        match outcome {
            ExitOutcome::Completed(report) => summary.report = Some(report),
            ExitOutcome::LoggedOut => summary.status = "logged_out",
            ExitOutcome::Failed(failure) => {
                summary.status = "failed";
                summary.failed_step = Some(failure.stage);
                summary.error = Some(failure.error.to_string());
            }
        }
        summary
    }
}

/// Print the outcome of a run
pub fn print_outcome(outcome: &ExitOutcome, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let summary = RunSummary::from_outcome(outcome);
            println!("{}", serde_json::to_string_pretty(&summary).unwrap_or_default());
        }
        OutputFormat::Plain => match outcome {
            ExitOutcome::Completed(report) => {
                match &report.target {
                    Some(target) => print_info(&format!("tailscale {} {} done", report.action, target)),
                    None => print_info(&format!("tailscale {} done", report.action)),
                }
                print_success("Tailscale disconnected");
            }
            ExitOutcome::LoggedOut => print_success("Tailscale disconnected"),
            ExitOutcome::Failed(failure) => print_error(&failure.to_string()),
        },
    }
}

/// Print success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

/// Print error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message.red());
}

/// Print info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".cyan(), message.bold());
}
