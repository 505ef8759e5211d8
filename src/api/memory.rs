// src/api/memory.rs
//! An in-memory Notion workspace.
//!
//! Serves blocks, children and database rows from maps, splits collections
//! into server-side pages of a configurable size, and can be told to fail on
//! particular ids. Used to drive the walker and the job runner offline.

use super::types::PaginatedResponse;
use super::{NotionRepository, RepositoryFactory};
use crate::error::{AppError, NotionErrorCode};
use crate::model::{Block, RowPage};
use crate::types::{ApiKey, NotionId};
use parking_lot::Mutex;
use reqwest::StatusCode;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// A failure to inject for every call touching an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InjectedFailure {
    NotFound,
    Unauthorized,
    Transient(String),
}

impl InjectedFailure {
    fn to_error(&self, id: &NotionId) -> AppError {
        match self {
            Self::NotFound => AppError::NotionService {
                code: NotionErrorCode::ObjectNotFound,
                message: format!("Could not find object with ID: {}.", id.to_hyphenated()),
                status: StatusCode::NOT_FOUND,
            },
            Self::Unauthorized => AppError::NotionService {
                code: NotionErrorCode::Unauthorized,
                message: "API token is invalid.".to_string(),
                status: StatusCode::UNAUTHORIZED,
            },
            Self::Transient(message) => AppError::NotionService {
                code: NotionErrorCode::ServiceUnavailable,
                message: message.clone(),
                status: StatusCode::SERVICE_UNAVAILABLE,
            },
        }
    }
}

/// Failures served in order, then `forever` (if any) on every later call.
#[derive(Default)]
struct FailureRule {
    scripted: VecDeque<InjectedFailure>,
    forever: Option<InjectedFailure>,
}

/// Per-method call counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub retrieve: u32,
    pub list_children: u32,
    pub query_database: u32,
}

impl CallCounts {
    pub fn total(&self) -> u32 {
        self.retrieve + self.list_children + self.query_database
    }
}

/// In-memory [`NotionRepository`].
pub struct MemoryRepository {
    objects: HashMap<NotionId, Block>,
    children: HashMap<NotionId, Vec<Block>>,
    rows: HashMap<NotionId, Vec<RowPage>>,
    server_page_size: usize,
    failures: Mutex<HashMap<NotionId, FailureRule>>,
    calls: Mutex<CallCounts>,
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self {
            objects: HashMap::new(),
            children: HashMap::new(),
            rows: HashMap::new(),
            server_page_size: 100,
            failures: Mutex::new(HashMap::new()),
            calls: Mutex::new(CallCounts::default()),
        }
    }

    /// Caps how many items one response may carry, regardless of the
    /// requested page size.
    pub fn with_server_page_size(mut self, size: usize) -> Self {
        self.server_page_size = size.max(1);
        self
    }

    /// Makes `block` retrievable by id.
    pub fn with_object(mut self, block: Block) -> Self {
        self.objects.insert(block.id.clone(), block);
        self
    }

    /// Sets the children listed under `parent`.
    pub fn with_children(mut self, parent: &NotionId, blocks: Vec<Block>) -> Self {
        self.children.insert(parent.clone(), blocks);
        self
    }

    /// Sets the rows returned when querying `database`.
    pub fn with_rows(mut self, database: &NotionId, rows: Vec<NotionId>) -> Self {
        self.rows.insert(
            database.clone(),
            rows.into_iter().map(|id| RowPage { id }).collect(),
        );
        self
    }

    /// Fails every call touching `id`; `times` limits how often.
    pub fn with_failure(self, id: &NotionId, failure: InjectedFailure, times: Option<u32>) -> Self {
        let rule = match times {
            Some(n) => FailureRule {
                scripted: std::iter::repeat(failure).take(n as usize).collect(),
                forever: None,
            },
            None => FailureRule {
                scripted: VecDeque::new(),
                forever: Some(failure),
            },
        };
        self.failures.lock().insert(id.clone(), rule);
        self
    }

    /// Fails the next calls touching `id` with `failures`, one per call, in
    /// order. Calls after the last one succeed.
    pub fn with_failure_sequence(self, id: &NotionId, failures: Vec<InjectedFailure>) -> Self {
        self.failures.lock().insert(
            id.clone(),
            FailureRule {
                scripted: failures.into(),
                forever: None,
            },
        );
        self
    }

    pub fn calls(&self) -> CallCounts {
        *self.calls.lock()
    }

    fn check_failure(&self, id: &NotionId) -> Result<(), AppError> {
        let mut failures = self.failures.lock();
        let Some(rule) = failures.get_mut(id) else {
            return Ok(());
        };
        match rule.scripted.pop_front().or_else(|| rule.forever.clone()) {
            Some(failure) => Err(failure.to_error(id)),
            None => Ok(()),
        }
    }

    fn page_of<T: Clone>(
        &self,
        items: &[T],
        cursor: Option<String>,
        page_size: u32,
    ) -> Result<PaginatedResponse<T>, AppError> {
        let start = match cursor {
            Some(c) => c
                .parse::<usize>()
                .map_err(|_| AppError::MalformedResponse(format!("unknown cursor {}", c)))?,
            None => 0,
        };
        let size = (page_size as usize).min(self.server_page_size).max(1);
        let end = (start + size).min(items.len());
        let results = items.get(start..end).unwrap_or_default().to_vec();
        if end < items.len() {
            Ok(PaginatedResponse::more(results, end.to_string()))
        } else {
            Ok(PaginatedResponse::last(results))
        }
    }
}

#[async_trait::async_trait]
impl NotionRepository for MemoryRepository {
    async fn retrieve(&self, id: &NotionId) -> Result<Block, AppError> {
        self.calls.lock().retrieve += 1;
        self.check_failure(id)?;
        self.objects
            .get(id)
            .cloned()
            .ok_or_else(|| InjectedFailure::NotFound.to_error(id))
    }

    async fn list_children(
        &self,
        block: &NotionId,
        cursor: Option<String>,
        page_size: u32,
    ) -> Result<PaginatedResponse<Block>, AppError> {
        self.calls.lock().list_children += 1;
        self.check_failure(block)?;
        let children = self.children.get(block).map(Vec::as_slice).unwrap_or(&[]);
        self.page_of(children, cursor, page_size)
    }

    async fn query_database(
        &self,
        database: &NotionId,
        cursor: Option<String>,
        page_size: u32,
    ) -> Result<PaginatedResponse<RowPage>, AppError> {
        self.calls.lock().query_database += 1;
        self.check_failure(database)?;
        let rows = self
            .rows
            .get(database)
            .ok_or_else(|| InjectedFailure::NotFound.to_error(database))?;
        self.page_of(rows, cursor, page_size)
    }
}

/// Hands out the same in-memory workspace for every credential and
/// remembers which keys asked for it.
pub struct SharedRepositoryFactory {
    repo: Arc<MemoryRepository>,
    connected_with: Mutex<Vec<String>>,
}

impl SharedRepositoryFactory {
    pub fn new(repo: Arc<MemoryRepository>) -> Self {
        Self {
            repo,
            connected_with: Mutex::new(Vec::new()),
        }
    }

    /// Every key a client was built for, in order.
    pub fn connected_with(&self) -> Vec<String> {
        self.connected_with.lock().clone()
    }
}

impl RepositoryFactory for SharedRepositoryFactory {
    fn connect(&self, api_key: &ApiKey) -> Result<Box<dyn NotionRepository>, AppError> {
        self.connected_with.lock().push(api_key.as_str().to_string());
        Ok(Box::new(Arc::clone(&self.repo)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn id(n: u32) -> NotionId {
        NotionId::parse(&format!("{:032x}", n)).unwrap()
    }

    #[tokio::test]
    async fn test_splits_collections_into_server_pages() {
        let blocks = (10..15)
            .map(|n| Block::new(id(n), "divider", false, json!({})))
            .collect();
        let repo = MemoryRepository::new()
            .with_server_page_size(2)
            .with_children(&id(1), blocks);

        let first = repo.list_children(&id(1), None, 100).await.unwrap();
        assert_eq!(first.results.len(), 2);
        assert!(first.has_more);

        let last = repo
            .list_children(&id(1), Some("4".into()), 100)
            .await
            .unwrap();
        assert_eq!(last.results.len(), 1);
        assert!(!last.has_more);
        assert_eq!(repo.calls().list_children, 2);
    }

    #[tokio::test]
    async fn test_limited_failures_clear_up() {
        let repo = MemoryRepository::new()
            .with_object(Block::new(id(1), "child_page", true, json!({ "title": "Root" })))
            .with_failure(&id(1), InjectedFailure::Transient("blip".into()), Some(1));

        assert!(repo.retrieve(&id(1)).await.is_err());
        assert!(repo.retrieve(&id(1)).await.is_ok());
        assert_eq!(repo.calls().retrieve, 2);
    }

    #[tokio::test]
    async fn test_failure_sequence_is_served_in_order() {
        let repo = MemoryRepository::new()
            .with_object(Block::new(id(1), "child_page", true, json!({ "title": "Root" })))
            .with_failure_sequence(
                &id(1),
                vec![
                    InjectedFailure::Transient("first".into()),
                    InjectedFailure::Transient("second".into()),
                ],
            );

        assert!(repo.retrieve(&id(1)).await.unwrap_err().to_string().contains("first"));
        assert!(repo.retrieve(&id(1)).await.unwrap_err().to_string().contains("second"));
        assert!(repo.retrieve(&id(1)).await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_objects_are_not_found() {
        let repo = MemoryRepository::new();
        let err = repo.retrieve(&id(9)).await.unwrap_err();
        assert_eq!(err.notion_code(), Some(&NotionErrorCode::ObjectNotFound));
    }
}
