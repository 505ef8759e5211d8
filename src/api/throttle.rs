// src/api/throttle.rs
//! Minimum-interval pacing for Notion API calls.
//!
//! Every call of a run passes through one [`Throttle`]. The
//! [`ThrottledRepository`] decorator applies it to each repository method so
//! traversal code never has to remember to wait, and [`ThrottledFactory`]
//! hands the same throttle to every plan's client so plan boundaries are
//! paced too.

use super::types::PaginatedResponse;
use super::{NotionRepository, RepositoryFactory};
use crate::error::AppError;
use crate::model::{Block, RowPage};
use crate::types::{ApiKey, NotionId};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Spaces calls at least `min_interval` apart, measured start to start.
pub struct Throttle {
    min_interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl Throttle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_call: Mutex::new(None),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Waits out the remainder of the interval, then runs `op`.
    ///
    /// The first call through a fresh throttle runs immediately.
    pub async fn call<F, Fut, T>(&self, op: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        {
            let mut last_call = self.last_call.lock().await;
            if let Some(previous) = *last_call {
                let ready_at = previous + self.min_interval;
                if ready_at > Instant::now() {
                    log::trace!("Throttling API call until {:?}", ready_at);
                    tokio::time::sleep_until(ready_at).await;
                }
            }
            *last_call = Some(Instant::now());
        }
        op().await
    }
}

/// A [`NotionRepository`] that routes every call through a [`Throttle`].
pub struct ThrottledRepository<R> {
    inner: R,
    throttle: Arc<Throttle>,
}

impl<R> ThrottledRepository<R> {
    /// Wraps an existing repository with the given throttle, which may be
    /// shared with other repositories.
    pub fn new(inner: R, throttle: impl Into<Arc<Throttle>>) -> Self {
        Self {
            inner,
            throttle: throttle.into(),
        }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }
}

#[async_trait::async_trait]
impl<R: NotionRepository> NotionRepository for ThrottledRepository<R> {
    async fn retrieve(&self, id: &NotionId) -> Result<Block, AppError> {
        self.throttle.call(|| self.inner.retrieve(id)).await
    }

    async fn list_children(
        &self,
        block: &NotionId,
        cursor: Option<String>,
        page_size: u32,
    ) -> Result<PaginatedResponse<Block>, AppError> {
        self.throttle
            .call(|| self.inner.list_children(block, cursor, page_size))
            .await
    }

    async fn query_database(
        &self,
        database: &NotionId,
        cursor: Option<String>,
        page_size: u32,
    ) -> Result<PaginatedResponse<RowPage>, AppError> {
        self.throttle
            .call(|| self.inner.query_database(database, cursor, page_size))
            .await
    }
}

/// A [`RepositoryFactory`] whose clients all share one [`Throttle`].
pub struct ThrottledFactory<F> {
    inner: F,
    throttle: Arc<Throttle>,
}

impl<F> ThrottledFactory<F> {
    pub fn new(inner: F, throttle: Throttle) -> Self {
        Self {
            inner,
            throttle: Arc::new(throttle),
        }
    }
}

impl<F: RepositoryFactory> RepositoryFactory for ThrottledFactory<F> {
    fn connect(&self, api_key: &ApiKey) -> Result<Box<dyn NotionRepository>, AppError> {
        let client = self.inner.connect(api_key)?;
        Ok(Box::new(ThrottledRepository::new(
            client,
            Arc::clone(&self.throttle),
        )))
    }
}
