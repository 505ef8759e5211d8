// src/api/mod.rs
//! Notion API interaction: the ability to read a workspace's block tree.
//!
//! Traversal code depends on [`NotionRepository`] only. The HTTP client,
//! the throttling decorator and the per-plan factory are the concrete pieces
//! wired together at the edge.

pub mod client;
#[cfg(test)]
pub(crate) mod memory;
pub mod pagination;
pub mod parser;
pub mod throttle;
mod types;

use crate::error::AppError;
use crate::model::{Block, RowPage};
use crate::types::{ApiKey, NotionId};
use std::sync::Arc;
use std::time::Duration;

pub use client::NotionHttpClient;
#[cfg(test)]
pub(crate) use memory::{InjectedFailure, MemoryRepository, SharedRepositoryFactory};
pub use pagination::{collect_children, collect_rows, fetch_all_pages};
pub use throttle::{Throttle, ThrottledFactory, ThrottledRepository};
pub use types::{PaginatedResponse, PaginationResult};

/// The ability to read content from a Notion workspace, one API call per
/// method. Pagination is the caller's business (see [`pagination`]).
#[async_trait::async_trait]
pub trait NotionRepository: Send + Sync {
    /// Fetches a single block's metadata.
    async fn retrieve(&self, id: &NotionId) -> Result<Block, AppError>;

    /// Fetches one page of a block's children.
    async fn list_children(
        &self,
        block: &NotionId,
        cursor: Option<String>,
        page_size: u32,
    ) -> Result<PaginatedResponse<Block>, AppError>;

    /// Fetches one page of a database's rows.
    async fn query_database(
        &self,
        database: &NotionId,
        cursor: Option<String>,
        page_size: u32,
    ) -> Result<PaginatedResponse<RowPage>, AppError>;
}

macro_rules! forward_repository {
    ($pointer:ident) => {
        #[async_trait::async_trait]
        impl<T: NotionRepository + ?Sized> NotionRepository for $pointer<T> {
            async fn retrieve(&self, id: &NotionId) -> Result<Block, AppError> {
                (**self).retrieve(id).await
            }

            async fn list_children(
                &self,
                block: &NotionId,
                cursor: Option<String>,
                page_size: u32,
            ) -> Result<PaginatedResponse<Block>, AppError> {
                (**self).list_children(block, cursor, page_size).await
            }

            async fn query_database(
                &self,
                database: &NotionId,
                cursor: Option<String>,
                page_size: u32,
            ) -> Result<PaginatedResponse<RowPage>, AppError> {
                (**self).query_database(database, cursor, page_size).await
            }
        }
    };
}

forward_repository!(Arc);
forward_repository!(Box);

/// Builds a document-API client for one plan's credential.
///
/// Credentials differ per plan, so the job runner asks for a fresh client
/// every time a plan starts running.
pub trait RepositoryFactory: Send + Sync {
    fn connect(&self, api_key: &ApiKey) -> Result<Box<dyn NotionRepository>, AppError>;
}

/// Produces HTTP clients against the public Notion API.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpRepositoryFactory;

impl HttpRepositoryFactory {
    /// The factory a run uses: one throttle paces every call of every plan.
    pub fn throttled(min_call_interval: Duration) -> ThrottledFactory<Self> {
        ThrottledFactory::new(Self, Throttle::new(min_call_interval))
    }
}

impl RepositoryFactory for HttpRepositoryFactory {
    fn connect(&self, api_key: &ApiKey) -> Result<Box<dyn NotionRepository>, AppError> {
        Ok(Box::new(NotionHttpClient::new(api_key)?))
    }
}
