// src/model/stats.rs
//! Plans, traversal counts and the records persisted for them.

use crate::types::{CredentialRef, NotionId, PlanId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign};

/// A plan row as the store returns it, before any validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanRow {
    pub id: PlanId,
    pub root_block: String,
    #[serde(default)]
    pub notion_token: Option<String>,
}

/// A configured scan job: a root document plus the credential to read it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub id: PlanId,
    /// Root identifier exactly as stored; parsed when the plan runs so a bad
    /// value fails that plan alone.
    pub root: String,
    pub credential: CredentialRef,
    /// Transient failures so far this cycle. Never persisted.
    pub retries: u32,
}

impl From<PlanRow> for Plan {
    fn from(row: PlanRow) -> Self {
        Self {
            credential: CredentialRef::parse(row.notion_token.as_deref()),
            id: row.id,
            root: row.root_block,
            retries: 0,
        }
    }
}

/// Aggregate counts for one traversal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraversalResult {
    pub block_count: u64,
    pub word_count: u64,
}

impl TraversalResult {
    pub fn new(block_count: u64, word_count: u64) -> Self {
        Self {
            block_count,
            word_count,
        }
    }
}

impl Add for TraversalResult {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            block_count: self.block_count + other.block_count,
            word_count: self.word_count + other.word_count,
        }
    }
}

impl AddAssign for TraversalResult {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

/// A child database left out of the counts under the best-effort policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedDatabase {
    pub id: NotionId,
    pub reason: String,
}

/// Everything a traversal produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub counts: TraversalResult,
    pub skipped_databases: Vec<SkippedDatabase>,
}

/// One row of a plan's append-only statistics history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatisticsRecord {
    pub plan_id: PlanId,
    #[serde(rename = "block_cnt")]
    pub block_count: u64,
    #[serde(rename = "word_cnt")]
    pub word_count: u64,
    #[serde(rename = "created_at")]
    pub recorded_at: DateTime<Utc>,
}

impl StatisticsRecord {
    pub fn new(plan_id: PlanId, counts: TraversalResult, recorded_at: DateTime<Utc>) -> Self {
        Self {
            plan_id,
            block_count: counts.block_count,
            word_count: counts.word_count,
            recorded_at,
        }
    }

    pub fn counts(&self) -> TraversalResult {
        TraversalResult::new(self.block_count, self.word_count)
    }
}

/// Last terminal error of a plan; `None` once the plan succeeds again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanErrorState {
    pub plan_id: PlanId,
    pub last_error: Option<String>,
}

impl PlanErrorState {
    pub fn cleared(plan_id: PlanId) -> Self {
        Self {
            plan_id,
            last_error: None,
        }
    }

    pub fn failed(plan_id: PlanId, message: impl Into<String>) -> Self {
        Self {
            plan_id,
            last_error: Some(message.into()),
        }
    }
}
