// src/constants.rs
//! Domain constants that define the operational boundaries of a scan.
//!
//! Each constant is named for the domain concept it constrains. Reading these
//! tells the story of how a batch behaves: how much it asks for per call, how
//! politely it paces the API, and how hard it tries before giving up on a plan.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Notion API boundaries
// ---------------------------------------------------------------------------

/// How many objects the Notion API returns per page of results.
///
/// The Notion API maximum is 100. We use the maximum to minimize
/// round-trips while walking large trees.
pub const NOTION_API_PAGE_SIZE: u32 = 100;

/// Minimum spacing between two consecutive Notion API calls.
///
/// Notion documents an average budget of three requests per second per
/// integration.
pub const NOTION_MIN_CALL_INTERVAL: Duration = Duration::from_millis(334);

/// Maximum nesting of databases inside pages inside databases.
///
/// Block nesting is walked with a queue and costs nothing here; only a
/// child database found inside a database row adds a level.
pub const NOTION_MAX_DATABASE_NESTING: usize = 50;

/// Notion API version header sent with every request.
pub const NOTION_API_VERSION: &str = "2022-06-28";

/// Base URL of the public Notion API.
pub const NOTION_API_BASE_URL: &str = "https://api.notion.com/v1";

// ---------------------------------------------------------------------------
// Batch boundaries
// ---------------------------------------------------------------------------

/// How many times a plan is re-queued after a transient failure before the
/// failure is recorded as terminal for this cycle.
pub const PLAN_RETRY_CEILING: u32 = 3;

/// Pause after a transient plan failure before the queue moves on.
pub const PLAN_RETRY_BACKOFF: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Error display
// ---------------------------------------------------------------------------

/// Maximum characters shown when previewing error response bodies.
pub const ERROR_BODY_PREVIEW_LENGTH: usize = 200;
