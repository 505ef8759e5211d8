// tests/common/mod.rs
//! A fake Notion workspace for the integration tests, built only from the
//! crate's public API.
#![allow(dead_code)]

use notion_stats::{
    ApiKey, AppError, Block, NotionErrorCode, NotionId, NotionRepository, PaginatedResponse,
    RepositoryFactory, RowPage,
};
use parking_lot::Mutex;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Notion never returns more than this many items per response.
const SERVER_PAGE_SIZE: usize = 100;

pub fn id(n: u32) -> NotionId {
    NotionId::parse(&format!("{:032x}", n)).unwrap()
}

pub fn text(content: &str) -> Value {
    json!({ "rich_text": [{ "type": "text", "plain_text": content }] })
}

pub fn paragraph(n: u32, content: &str) -> Block {
    Block::new(id(n), "paragraph", false, text(content))
}

/// How calls touching a broken id fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Broken {
    NotFound,
    Unauthorized,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Calls {
    pub retrieve: u32,
    pub list_children: u32,
    pub query_database: u32,
}

impl Calls {
    pub fn total(&self) -> u32 {
        self.retrieve + self.list_children + self.query_database
    }
}

#[derive(Default)]
pub struct FakeWorkspace {
    objects: HashMap<NotionId, Block>,
    children: HashMap<NotionId, Vec<Block>>,
    rows: HashMap<NotionId, Vec<RowPage>>,
    broken: HashMap<NotionId, Broken>,
    calls: Mutex<Calls>,
}

impl FakeWorkspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object(mut self, block: Block) -> Self {
        self.objects.insert(block.id.clone(), block);
        self
    }

    pub fn with_children(mut self, parent: &NotionId, blocks: Vec<Block>) -> Self {
        self.children.insert(parent.clone(), blocks);
        self
    }

    pub fn with_rows(mut self, database: &NotionId, rows: Vec<NotionId>) -> Self {
        self.rows
            .insert(database.clone(), rows.into_iter().map(|id| RowPage { id }).collect());
        self
    }

    /// Every call touching `id` fails with `how`.
    pub fn broken(mut self, id: &NotionId, how: Broken) -> Self {
        self.broken.insert(id.clone(), how);
        self
    }

    pub fn calls(&self) -> Calls {
        *self.calls.lock()
    }

    fn check(&self, id: &NotionId) -> Result<(), AppError> {
        match self.broken.get(id) {
            Some(Broken::NotFound) => Err(not_found(id)),
            Some(Broken::Unauthorized) => Err(AppError::NotionService {
                code: NotionErrorCode::Unauthorized,
                message: "API token is invalid.".to_string(),
                status: StatusCode::UNAUTHORIZED,
            }),
            None => Ok(()),
        }
    }
}

fn not_found(id: &NotionId) -> AppError {
    AppError::NotionService {
        code: NotionErrorCode::ObjectNotFound,
        message: format!("Could not find object with ID: {}.", id.to_hyphenated()),
        status: StatusCode::NOT_FOUND,
    }
}

/// Serves `items` from offset `cursor`, at most one server page at a time.
fn page<T: Clone>(items: &[T], cursor: Option<String>, page_size: u32) -> PaginatedResponse<T> {
    let start: usize = cursor.map(|c| c.parse().unwrap()).unwrap_or(0);
    let end = (start + (page_size as usize).min(SERVER_PAGE_SIZE)).min(items.len());
    let results = items[start..end].to_vec();
    if end < items.len() {
        PaginatedResponse::more(results, end.to_string())
    } else {
        PaginatedResponse::last(results)
    }
}

#[async_trait::async_trait]
impl NotionRepository for FakeWorkspace {
    async fn retrieve(&self, id: &NotionId) -> Result<Block, AppError> {
        self.calls.lock().retrieve += 1;
        self.check(id)?;
        self.objects.get(id).cloned().ok_or_else(|| not_found(id))
    }

    async fn list_children(
        &self,
        block: &NotionId,
        cursor: Option<String>,
        page_size: u32,
    ) -> Result<PaginatedResponse<Block>, AppError> {
        self.calls.lock().list_children += 1;
        self.check(block)?;
        let children = self.children.get(block).map(Vec::as_slice).unwrap_or(&[]);
        Ok(page(children, cursor, page_size))
    }

    async fn query_database(
        &self,
        database: &NotionId,
        cursor: Option<String>,
        page_size: u32,
    ) -> Result<PaginatedResponse<RowPage>, AppError> {
        self.calls.lock().query_database += 1;
        self.check(database)?;
        let rows = self.rows.get(database).ok_or_else(|| not_found(database))?;
        Ok(page(rows, cursor, page_size))
    }
}

/// Hands every plan the same workspace and records the keys it saw.
pub struct FakeFactory {
    workspace: Arc<FakeWorkspace>,
    keys: Mutex<HashSet<String>>,
}

impl FakeFactory {
    pub fn new(workspace: FakeWorkspace) -> Self {
        Self {
            workspace: Arc::new(workspace),
            keys: Mutex::new(HashSet::new()),
        }
    }

    pub fn workspace(&self) -> &FakeWorkspace {
        &self.workspace
    }

    pub fn keys(&self) -> HashSet<String> {
        self.keys.lock().clone()
    }
}

impl RepositoryFactory for FakeFactory {
    fn connect(&self, api_key: &ApiKey) -> Result<Box<dyn NotionRepository>, AppError> {
        self.keys.lock().insert(api_key.as_str().to_string());
        Ok(Box::new(Arc::clone(&self.workspace)))
    }
}
