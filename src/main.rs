// src/main.rs

use anyhow::Context;
use clap::Parser;
use log::LevelFilter;
use log4rs::{
    append::console::ConsoleAppender,
    append::file::FileAppender,
    config::{Appender, Root},
    encode::pattern::PatternEncoder,
    filter::threshold::ThresholdFilter,
    Config,
};
use notion_stats::{
    BatchReport, CommandLineInput, HttpRepositoryFactory, JobRunner, PlanState, PostgrestStore,
    ScanConfig, SqliteStore, StatisticsStore, StoreSelection,
};
use std::fs;

/// Sets up logging configuration.
fn setup_logging(verbose: bool) -> anyhow::Result<()> {
    let log_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let log_file_path = std::env::temp_dir().join("notion_stats.log");
    if let Some(parent) = log_file_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let stdout_appender = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} [{l}] - {m}{n}",
        )))
        .build();

    let file_appender = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} [{l}] {t} - {m}{n}",
        )))
        .build(&log_file_path)?;

    let config = Config::builder()
        .appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(log_level)))
                .build("stdout", Box::new(stdout_appender)),
        )
        .appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(LevelFilter::Debug)))
                .build("file", Box::new(file_appender)),
        )
        .build(
            Root::builder()
                .appender("stdout")
                .appender("file")
                .build(LevelFilter::Debug),
        )?;

    log4rs::init_config(config)?;
    log::info!("Logging initialized. Log file: {}", log_file_path.display());
    Ok(())
}

/// Opens the statistics store the configuration points at.
fn open_store(selection: &StoreSelection) -> anyhow::Result<Box<dyn StatisticsStore>> {
    match selection {
        StoreSelection::Sqlite(path) => {
            log::info!("Using SQLite store at {}", path.display());
            let store = SqliteStore::open(path)
                .with_context(|| format!("opening SQLite store {}", path.display()))?;
            Ok(Box::new(store))
        }
        StoreSelection::Supabase { url, service_key } => {
            log::info!("Using Supabase store at {}", url.as_str());
            let store = PostgrestStore::new(url, service_key).context("creating Supabase client")?;
            Ok(Box::new(store))
        }
    }
}

/// Prints one line per plan and a closing tally.
fn report_completion(report: &BatchReport) {
    for (plan, summary) in &report.plans {
        match (summary.state, summary.counts) {
            (PlanState::Done, Some(counts)) => println!(
                "✓ plan {}: {} blocks, {} words{}",
                plan,
                counts.block_count,
                counts.word_count,
                if summary.recorded { "" } else { " (unchanged)" }
            ),
            _ => println!(
                "✗ plan {} after {} attempt(s): {}",
                plan,
                summary.attempts,
                summary.last_error.as_deref().unwrap_or("unknown error")
            ),
        }
        for skipped in &summary.skipped_databases {
            println!("  ⚠️  skipped database {}: {}", skipped.id, skipped.reason);
        }
    }

    println!(
        "📄 {} plan(s): {} done, {} failed, {} new record(s).",
        report.plans.len(),
        report.count_in(PlanState::Done),
        report.count_in(PlanState::Fatal),
        report.records_written()
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CommandLineInput::parse();

    setup_logging(cli.verbose)?;

    let config = ScanConfig::resolve(cli)?;
    let store = open_store(&config.store)?;
    let factory = HttpRepositoryFactory::throttled(config.min_call_interval);

    let report = JobRunner::new(store.as_ref(), &factory, config.runner_config())
        .run()
        .await
        .context("loading plans")?;

    report_completion(&report);
    Ok(())
}
