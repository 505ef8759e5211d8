// src/model/mod.rs
//! Domain model for a statistics scan.
//!
//! Blocks and row pages are what the Notion API hands back; plans, counts and
//! statistics records are what the store and the job runner trade in.

mod block;
mod stats;

pub use block::{Block, DetectedType, RowPage};
pub use stats::{
    Plan, PlanErrorState, PlanRow, ScanReport, SkippedDatabase, StatisticsRecord, TraversalResult,
};
