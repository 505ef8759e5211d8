// src/runner.rs
//! The batch job runner.
//!
//! Plans move through `pending → running → {done | retry-scheduled | fatal}`.
//! A retry-scheduled plan goes back to the end of the queue after a fixed
//! pause; the batch ends when the queue is empty. One plan failing never
//! stops the others.

use crate::api::RepositoryFactory;
use crate::constants::{PLAN_RETRY_BACKOFF, PLAN_RETRY_CEILING};
use crate::error::AppError;
use crate::model::{
    Plan, PlanErrorState, ScanReport, SkippedDatabase, StatisticsRecord, TraversalResult,
};
use crate::scan::{scan_root, DatabaseFailurePolicy};
use crate::store::StatisticsStore;
use crate::types::{ApiKey, NotionId, PlanId};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

/// Knobs of a batch run.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Re-queues allowed per plan before a transient failure becomes terminal.
    pub max_retries: u32,
    /// Pause after scheduling a retry.
    pub backoff: Duration,
    pub database_policy: DatabaseFailurePolicy,
    /// Credential for plans that do not name their own.
    pub default_credential: Option<ApiKey>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_retries: PLAN_RETRY_CEILING,
            backoff: PLAN_RETRY_BACKOFF,
            database_policy: DatabaseFailurePolicy::default(),
            default_credential: None,
        }
    }
}

/// Where a plan stands in the current batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanState {
    Pending,
    Running,
    Done,
    RetryScheduled,
    Fatal,
}

/// A successful attempt: what was counted and whether it was persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedScan {
    pub report: ScanReport,
    /// `false` when the counts matched the latest stored record.
    pub recorded: bool,
}

/// Typed result of one attempt at a plan.
#[derive(Debug)]
pub enum PlanOutcome {
    Success(CompletedScan),
    Retryable(AppError),
    Fatal(AppError),
}

impl PlanOutcome {
    fn from_result(result: Result<CompletedScan, AppError>) -> Self {
        match result {
            Ok(done) => Self::Success(done),
            Err(err) if err.is_fatal() => Self::Fatal(err),
            Err(err) => Self::Retryable(err),
        }
    }
}

/// How one plan fared over the whole batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanSummary {
    pub state: PlanState,
    pub attempts: u32,
    pub counts: Option<TraversalResult>,
    pub recorded: bool,
    pub last_error: Option<String>,
    pub skipped_databases: Vec<SkippedDatabase>,
}

impl Default for PlanSummary {
    fn default() -> Self {
        Self {
            state: PlanState::Pending,
            attempts: 0,
            counts: None,
            recorded: false,
            last_error: None,
            skipped_databases: Vec::new(),
        }
    }
}

/// Per-plan results of a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub plans: BTreeMap<PlanId, PlanSummary>,
}

impl BatchReport {
    pub fn plan(&self, id: &PlanId) -> Option<&PlanSummary> {
        self.plans.get(id)
    }

    pub fn count_in(&self, state: PlanState) -> usize {
        self.plans.values().filter(|p| p.state == state).count()
    }

    pub fn records_written(&self) -> usize {
        self.plans.values().filter(|p| p.recorded).count()
    }

    fn summary(&mut self, id: &PlanId) -> &mut PlanSummary {
        self.plans.entry(id.clone()).or_default()
    }
}

type EnvLookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Drains the plan queue of one batch.
pub struct JobRunner<'a> {
    store: &'a dyn StatisticsStore,
    factory: &'a dyn RepositoryFactory,
    config: RunnerConfig,
    env: EnvLookup,
}

impl<'a> JobRunner<'a> {
    pub fn new(
        store: &'a dyn StatisticsStore,
        factory: &'a dyn RepositoryFactory,
        config: RunnerConfig,
    ) -> Self {
        Self {
            store,
            factory,
            config,
            env: Box::new(|name: &str| std::env::var(name).ok()),
        }
    }

    /// Replaces how `env:` credential references are looked up.
    pub fn with_env_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.env = Box::new(lookup);
        self
    }

    /// Runs one batch in a freshly shuffled order.
    pub async fn run(&self) -> Result<BatchReport, AppError> {
        let mut rng = StdRng::from_rng(&mut rand::rng());
        self.run_with_rng(&mut rng).await
    }

    /// Runs one batch, shuffling plans with `rng`.
    ///
    /// Only failing to load the plan list is an error; everything that goes
    /// wrong with a single plan ends up in the returned report.
    pub async fn run_with_rng<G: Rng + ?Sized>(&self, rng: &mut G) -> Result<BatchReport, AppError> {
        let mut plans: Vec<Plan> = self
            .store
            .select_plans()
            .await?
            .into_iter()
            .map(Plan::from)
            .collect();
        plans.shuffle(rng);
        log::info!("Starting batch with {} plan(s)", plans.len());

        let mut report = BatchReport::default();
        for plan in &plans {
            report.summary(&plan.id);
        }
        let mut queue: VecDeque<Plan> = plans.into();

        while let Some(mut plan) = queue.pop_front() {
            {
                let summary = report.summary(&plan.id);
                summary.state = PlanState::Running;
                summary.attempts += 1;
            }
            log::info!("Running plan {} (retry {})", plan.id, plan.retries);

            match PlanOutcome::from_result(self.execute(&plan).await) {
                PlanOutcome::Success(done) => {
                    log::info!(
                        "Plan {} done, {} blocks and {} words.",
                        plan.id,
                        done.report.counts.block_count,
                        done.report.counts.word_count
                    );
                    let summary = report.summary(&plan.id);
                    summary.state = PlanState::Done;
                    summary.counts = Some(done.report.counts);
                    summary.recorded = done.recorded;
                    summary.last_error = None;
                    summary.skipped_databases = done.report.skipped_databases;
                }
                PlanOutcome::Retryable(err) if plan.retries < self.config.max_retries => {
                    plan.retries += 1;
                    log::warn!(
                        "Plan {} failed ({}); retry {}/{} in {:?}",
                        plan.id,
                        err,
                        plan.retries,
                        self.config.max_retries,
                        self.config.backoff
                    );
                    let summary = report.summary(&plan.id);
                    summary.state = PlanState::RetryScheduled;
                    summary.last_error = Some(err.to_string());
                    queue.push_back(plan);
                    tokio::time::sleep(self.config.backoff).await;
                }
                PlanOutcome::Retryable(err) | PlanOutcome::Fatal(err) => {
                    let message = err.to_string();
                    log::error!("Plan {} abandoned for this cycle: {}", plan.id, message);
                    self.record_failure(&plan.id, &message).await;
                    let summary = report.summary(&plan.id);
                    summary.state = PlanState::Fatal;
                    summary.last_error = Some(message);
                }
            }
        }

        log::info!(
            "Batch finished: {} done, {} fatal, {} new record(s)",
            report.count_in(PlanState::Done),
            report.count_in(PlanState::Fatal),
            report.records_written()
        );
        Ok(report)
    }

    /// One attempt: credentials, detection, traversal, persistence.
    async fn execute(&self, plan: &Plan) -> Result<CompletedScan, AppError> {
        let api_key = plan
            .credential
            .resolve(self.config.default_credential.as_ref(), |name| (self.env)(name))
            .map_err(|reason| AppError::CredentialUnavailable {
                plan: plan.id.to_string(),
                reason,
            })?;
        let root = NotionId::parse(&plan.root)?;

        log::debug!("Plan {} connects with key {}", plan.id, api_key);
        let repo = self.factory.connect(&api_key)?;
        let report = scan_root(repo.as_ref(), &root, self.config.database_policy).await?;

        let previous = self.store.latest_statistics(&plan.id).await?;
        let recorded = if previous == Some(report.counts) {
            log::debug!("Plan {} unchanged since last record", plan.id);
            false
        } else {
            let record = StatisticsRecord::new(plan.id.clone(), report.counts, chrono::Utc::now());
            self.store.insert_statistics(&record).await?;
            true
        };

        self.store
            .update_plan_error(&PlanErrorState::cleared(plan.id.clone()))
            .await?;

        Ok(CompletedScan { report, recorded })
    }

    async fn record_failure(&self, plan: &PlanId, message: &str) {
        let state = PlanErrorState::failed(plan.clone(), message);
        if let Err(err) = self.store.update_plan_error(&state).await {
            log::error!("Could not record error state for plan {}: {}", plan, err);
        }
    }
}
