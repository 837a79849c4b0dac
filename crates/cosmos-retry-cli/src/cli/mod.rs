//! CLI for inspecting and exercising the retry policy.

mod commands;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use cosmos_retry_core::config::{self, ClientConfig, RetryConfig};
use cosmos_retry_core::retry::{AbortReason, CoordinatorError, Failure, RetryPolicy, WriteType};
use std::path::PathBuf;

use commands::{run_config, run_decide, run_simulate};

/// Top-level CLI for the cosmos-retry policy.
#[derive(Debug, Parser)]
#[command(name = "cosmos-retry")]
#[command(about = "cosmos-retry: retry decisions with backoff for replicated store clients", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Show the config file path and the effective retry policy.
    Config {
        #[command(flatten)]
        policy: PolicyArgs,
    },

    /// Print the decision for one failure at a given retry number (no waiting).
    Decide {
        /// Failure category.
        #[arg(value_enum)]
        category: FailureCategory,
        /// Zero-based retry number.
        #[arg(long, default_value = "0", value_name = "N")]
        attempt: u32,
        #[command(flatten)]
        policy: PolicyArgs,
    },

    /// Drive a request that always fails with the given category through the retry loop.
    /// Backoff waits are real; Ctrl-C interrupts them.
    Simulate {
        /// Failure category.
        #[arg(value_enum)]
        category: FailureCategory,
        /// Stop failing after N attempts (bounds unbounded budgets).
        #[arg(long, default_value = "20", value_name = "N")]
        limit: u32,
        #[command(flatten)]
        policy: PolicyArgs,
    },
}

/// Policy overrides applied on top of the config file.
#[derive(Debug, Clone, Default, Args)]
pub struct PolicyArgs {
    /// Read this config file instead of the XDG default.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
    /// Maximum number of retries (-1 = unbounded).
    #[arg(long, allow_hyphen_values = true, value_name = "N")]
    pub max_retry_count: Option<i32>,
    /// Fixed backoff in ms (unbounded budget).
    #[arg(long, value_name = "MS")]
    pub fixed_ms: Option<u64>,
    /// Growing backoff increment in ms (bounded budget).
    #[arg(long, value_name = "MS")]
    pub growing_ms: Option<u64>,
    /// Jitter ceiling in ms (exclusive).
    #[arg(long, value_name = "MS")]
    pub jitter_ceiling_ms: Option<u64>,
}

impl PolicyArgs {
    fn load_config(&self) -> Result<ClientConfig> {
        match &self.config {
            Some(path) => config::load_from_path(path)
                .with_context(|| format!("reading config {}", path.display())),
            None => config::load_or_init(),
        }
    }

    /// Overlay the command-line overrides onto `base`.
    pub fn apply(&self, base: RetryConfig) -> RetryConfig {
        RetryConfig {
            max_retry_count: self.max_retry_count.unwrap_or(base.max_retry_count),
            fixed_back_off_time_millis: self.fixed_ms.unwrap_or(base.fixed_back_off_time_millis),
            growing_back_off_time_millis: self
                .growing_ms
                .unwrap_or(base.growing_back_off_time_millis),
        }
    }

    pub fn build_policy(&self, retry: &RetryConfig) -> Result<RetryPolicy> {
        let policy = RetryPolicy::from_config(retry)?;
        Ok(match self.jitter_ceiling_ms {
            Some(ceiling) => policy.with_jitter_ceiling(ceiling),
            None => policy,
        })
    }
}

/// Failure categories accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FailureCategory {
    ReadTimeout,
    WriteTimeout,
    Unavailable,
    Overloaded,
    WriteFailure,
    Syntax,
    ServerError,
    ClosedConnection,
    Heartbeat,
    AbortedOther,
}

impl FailureCategory {
    pub fn to_failure(self) -> Failure {
        match self {
            FailureCategory::ReadTimeout => Failure::ReadTimeout {
                required: 2,
                received: 1,
                data_present: false,
            },
            FailureCategory::WriteTimeout => Failure::WriteTimeout {
                write_type: WriteType::Simple,
                required: 2,
                received: 1,
            },
            FailureCategory::Unavailable => Failure::Unavailable {
                required: 2,
                alive: 1,
            },
            FailureCategory::Overloaded => Failure::Coordinator(CoordinatorError::Overloaded),
            FailureCategory::WriteFailure => Failure::Coordinator(CoordinatorError::WriteFailure),
            FailureCategory::Syntax => Failure::Coordinator(CoordinatorError::Syntax),
            FailureCategory::ServerError => Failure::Coordinator(CoordinatorError::Server),
            FailureCategory::ClosedConnection => Failure::Aborted(AbortReason::ConnectionClosed),
            FailureCategory::Heartbeat => Failure::Aborted(AbortReason::HeartbeatFailed),
            FailureCategory::AbortedOther => {
                Failure::Aborted(AbortReason::Other("request encoding failed".to_string()))
            }
        }
    }
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();

        match cli.command {
            CliCommand::Config { policy } => {
                let cfg = policy.load_config()?;
                tracing::debug!("loaded config: {:?}", cfg);
                let retry = policy.apply(cfg.retry());
                run_config(policy.config.as_deref(), &policy.build_policy(&retry)?)?;
            }
            CliCommand::Decide {
                category,
                attempt,
                policy,
            } => {
                let retry = policy.apply(policy.load_config()?.retry());
                run_decide(&policy.build_policy(&retry)?, category, attempt);
            }
            CliCommand::Simulate {
                category,
                limit,
                policy,
            } => {
                let retry = policy.apply(policy.load_config()?.retry());
                run_simulate(policy.build_policy(&retry)?, category, limit).await?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
