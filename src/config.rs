// src/config.rs
use crate::constants::{NOTION_MIN_CALL_INTERVAL, PLAN_RETRY_BACKOFF, PLAN_RETRY_CEILING};
use crate::error::AppError;
use crate::runner::RunnerConfig;
use crate::scan::DatabaseFailurePolicy;
use crate::types::{ApiKey, ValidatedUrl};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Parsed command-line input.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CommandLineInput {
    /// Use a SQLite file as the statistics store instead of Supabase
    #[arg(long, value_name = "PATH")]
    pub sqlite: Option<PathBuf>,

    /// Seconds to wait after a plan fails with a transient error
    #[arg(long, default_value_t = PLAN_RETRY_BACKOFF.as_secs())]
    pub backoff_secs: u64,

    /// How many times a plan is re-queued before its failure is recorded
    #[arg(long, default_value_t = PLAN_RETRY_CEILING)]
    pub max_retries: u32,

    /// Minimum spacing between two Notion API calls, in milliseconds
    #[arg(long, default_value_t = NOTION_MIN_CALL_INTERVAL.as_millis() as u64)]
    pub min_call_interval_ms: u64,

    /// Fail the whole plan when a child database cannot be walked
    #[arg(long, default_value_t = false)]
    pub strict_databases: bool,

    /// Enable verbose logging (debug level)
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

/// Where statistics are read from and written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreSelection {
    Sqlite(PathBuf),
    Supabase { url: ValidatedUrl, service_key: String },
}

/// Resolved configuration, validated and ready to drive a batch.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub store: StoreSelection,
    pub default_credential: Option<ApiKey>,
    pub min_call_interval: Duration,
    pub backoff: Duration,
    pub max_retries: u32,
    pub database_policy: DatabaseFailurePolicy,
    pub verbose: bool,
}

impl ScanConfig {
    /// Resolves a configuration from CLI input and the process environment.
    pub fn resolve(cli: CommandLineInput) -> Result<Self, AppError> {
        Self::resolve_with(cli, |name| std::env::var(name).ok())
    }

    /// Resolves a configuration, reading environment variables through `env`.
    pub fn resolve_with<F>(cli: CommandLineInput, env: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| env(name).filter(|value| !value.trim().is_empty());

        let default_credential = read("NOTION_API_KEY").map(ApiKey::new).transpose()?;
        if default_credential.is_none() {
            log::warn!("NOTION_API_KEY not set; plans without their own token will fail");
        }

        let store = match cli.sqlite {
            Some(path) => StoreSelection::Sqlite(path),
            None => {
                let url = read("SUPABASE_URL").ok_or_else(|| {
                    AppError::MissingConfiguration(
                        "SUPABASE_URL environment variable not set (or pass --sqlite)".to_string(),
                    )
                })?;
                let service_key = read("SUPABASE_KEY").ok_or_else(|| {
                    AppError::MissingConfiguration(
                        "SUPABASE_KEY environment variable not set (or pass --sqlite)".to_string(),
                    )
                })?;
                StoreSelection::Supabase {
                    url: ValidatedUrl::parse(&url)?,
                    service_key,
                }
            }
        };

        let database_policy = if cli.strict_databases {
            DatabaseFailurePolicy::Strict
        } else {
            DatabaseFailurePolicy::BestEffort
        };

        Ok(ScanConfig {
            store,
            default_credential,
            min_call_interval: Duration::from_millis(cli.min_call_interval_ms),
            backoff: Duration::from_secs(cli.backoff_secs),
            max_retries: cli.max_retries,
            database_policy,
            verbose: cli.verbose,
        })
    }

    /// The slice of the configuration the job runner needs.
    pub fn runner_config(&self) -> RunnerConfig {
        RunnerConfig {
            max_retries: self.max_retries,
            backoff: self.backoff,
            database_policy: self.database_policy,
            default_credential: self.default_credential.clone(),
        }
    }
}
