//! CLI for simili-triage.
//!
//! Routes GitHub issues to the right repository, reconciles delayed
//! transfers and closes, and reverts transfers users reject.

use clap::{Parser, Subcommand};
use simili_triage::{Command, RepoRef, RunSummary, Runner, RunnerConfig, RunnerError};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// simili-triage - Route GitHub issues with delayed, revertible transfers.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the triage configuration.
    #[arg(long, global = true, default_value = "simili.toml")]
    config: PathBuf,

    /// GitHub token of the bot identity.
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: String,

    /// GitHub token allowed to transfer issues (defaults to --token).
    #[arg(long, env = "TRANSFER_TOKEN", hide_env_values = true)]
    transfer_token: Option<String>,

    /// API key of the similarity index.
    #[arg(long, env = "QDRANT_API_KEY", hide_env_values = true)]
    index_api_key: Option<String>,

    /// Decide and log without writing anything.
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Subcommands,
}

#[derive(Subcommand, Debug)]
enum Subcommands {
    /// Route one issue: transfer it now or schedule the transfer.
    ProcessIssue {
        /// Repository holding the issue (`org/repo`).
        #[arg(value_parser = parse_repo)]
        repo: RepoRef,
        /// Issue number.
        number: u64,
    },

    /// Execute, cancel or keep waiting on pending actions.
    ProcessPending {
        /// Repository to reconcile (`org/repo`); all configured ones when omitted.
        #[arg(long, value_parser = parse_repo)]
        repo: Option<RepoRef>,
    },

    /// Move an issue back if its transfer notice got the revert reaction.
    CheckRevert {
        /// Repository holding the issue (`org/repo`).
        #[arg(value_parser = parse_repo)]
        repo: RepoRef,
        /// Issue number.
        number: u64,
    },

    /// Schedule closing an issue as a duplicate.
    ScheduleClose {
        /// Repository holding the issue (`org/repo`).
        #[arg(value_parser = parse_repo)]
        repo: RepoRef,
        /// Issue number.
        number: u64,
        /// URL of the original issue.
        original_url: String,
    },
}

impl From<Subcommands> for Command {
    fn from(command: Subcommands) -> Self {
        match command {
            Subcommands::ProcessIssue { repo, number } => Command::ProcessIssue {
                repository: repo,
                number,
            },
            Subcommands::ProcessPending { repo } => Command::ProcessPending { repository: repo },
            Subcommands::CheckRevert { repo, number } => Command::CheckRevert {
                repository: repo,
                number,
            },
            Subcommands::ScheduleClose {
                repo,
                number,
                original_url,
            } => Command::ScheduleClose {
                repository: repo,
                number,
                original_url,
            },
        }
    }
}

fn parse_repo(value: &str) -> Result<RepoRef, String> {
    RepoRef::parse(value).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    // octocrab and reqwest both use rustls; pick the provider once.
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let args = Args::parse();

    match run(args).await {
        Ok(summary) => {
            print_summary(&summary);

            if summary.has_failures() {
                ExitCode::from(1)
            } else {
                ExitCode::from(0)
            }
        }
        Err(e) => {
            error!(error = %e, "Critical failure");
            ExitCode::from(2)
        }
    }
}

/// Initializes tracing with environment filter support.
///
/// Sets up the global tracing subscriber with:
/// - Compact log formatting (single-line output)
/// - Log level filtering via `RUST_LOG` env var (defaults to "info")
fn init_tracing() {
    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

/// Main execution logic.
async fn run(args: Args) -> Result<RunSummary, RunnerError> {
    let config = RunnerConfig::new(args.config, args.token, args.dry_run)
        .with_transfer_token(args.transfer_token)
        .with_index_api_key(args.index_api_key);
    let runner = Runner::new(config)?;
    runner.run(&args.command.into()).await
}

/// Prints the final run summary.
fn print_summary(summary: &RunSummary) {
    println!("\nSummary:");
    println!(
        "  Mode: {}",
        if summary.dry_run { "Dry Run" } else { "Live" }
    );
    println!("  Issues processed: {}", summary.issues_processed);
    println!("  Transferred: {}", summary.transferred);
    println!("  Scheduled: {}", summary.scheduled);
    println!("  Closed: {}", summary.closed);
    println!("  Cancelled: {}", summary.cancelled);
    println!("  Reverted: {}", summary.reverted);
    println!("  Skipped: {}", summary.skipped);
    println!("  Failed: {}", summary.failed);
}
