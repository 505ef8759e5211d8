// src/store/mod.rs
//! Relational store access: plans in, statistics and error state out.

mod postgrest;
mod sqlite;

pub use postgrest::PostgrestStore;
pub use sqlite::SqliteStore;

use crate::error::StoreError;
use crate::model::{PlanErrorState, PlanRow, StatisticsRecord, TraversalResult};
use crate::types::PlanId;

/// The narrow surface of the relational store the job runner relies on.
#[async_trait::async_trait]
pub trait StatisticsStore: Send + Sync {
    /// Every configured plan, in the store's order.
    async fn select_plans(&self) -> Result<Vec<PlanRow>, StoreError>;

    /// Counts of the plan's most recent statistics record, if any.
    async fn latest_statistics(&self, plan: &PlanId) -> Result<Option<TraversalResult>, StoreError>;

    /// Appends a record to the plan's history.
    async fn insert_statistics(&self, record: &StatisticsRecord) -> Result<(), StoreError>;

    /// Overwrites the plan's last-error column.
    async fn update_plan_error(&self, state: &PlanErrorState) -> Result<(), StoreError>;
}
