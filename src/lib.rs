// src/lib.rs
//! notion-stats library: periodically counts blocks and words under Notion
//! roots and records the counts per plan in a relational store.
//!
//! # Public API
//!
//! The library exposes types organized by concern:
//! - **Error handling**: `AppError`, `StoreError`, `ValidationError`
//! - **Configuration**: `CommandLineInput`, `ScanConfig`
//! - **Domain model**: `Block`, `Plan`, `TraversalResult`, `StatisticsRecord`, etc.
//! - **Domain types**: `NotionId`, `PlanId`, `ApiKey`, `CredentialRef`
//! - **API client**: `NotionRepository`, `NotionHttpClient`, `ThrottledRepository`
//! - **Traversal**: `detect`, `TreeWalker`, `scan_root`
//! - **Stores**: `StatisticsStore`, `PostgrestStore`, `SqliteStore`
//! - **Batch**: `JobRunner`, `BatchReport`

pub mod api;
pub mod config;
pub mod constants;
pub mod error;
pub mod model;
pub mod runner;
pub mod scan;
pub mod store;
pub mod types;

// --- Error Handling ---
pub use crate::error::{AppError, NotionErrorCode, StoreError};
pub use crate::types::ValidationError;

// --- Configuration ---
pub use crate::config::{CommandLineInput, ScanConfig, StoreSelection};

// --- Domain Model ---
pub use crate::model::{
    Block, DetectedType, Plan, PlanErrorState, PlanRow, RowPage, ScanReport, SkippedDatabase,
    StatisticsRecord, TraversalResult,
};

// --- Domain Types ---
pub use crate::types::{ApiKey, CredentialRef, NotionId, PlanId, ValidatedUrl};

// --- API Client ---
pub use crate::api::{
    HttpRepositoryFactory, NotionHttpClient, NotionRepository, PaginatedResponse,
    RepositoryFactory, Throttle, ThrottledFactory, ThrottledRepository,
};

// --- Traversal ---
pub use crate::scan::{detect, scan_root, DatabaseFailurePolicy, TreeWalker};

// --- Stores ---
pub use crate::store::{PostgrestStore, SqliteStore, StatisticsStore};

// --- Batch ---
pub use crate::runner::{BatchReport, JobRunner, PlanOutcome, PlanState, PlanSummary, RunnerConfig};
