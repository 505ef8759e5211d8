// src/api/pagination.rs
//! Cursor-following pagination over any paged Notion collection.

use super::types::{PaginatedResponse, PaginationResult};
use super::NotionRepository;
use crate::constants::NOTION_API_PAGE_SIZE;
use crate::error::AppError;
use crate::model::{Block, RowPage};
use crate::types::NotionId;

/// Fetches every page of a collection using async closures directly.
///
/// The first call gets no cursor; each later call gets the previous page's
/// `next_cursor`. Stops as soon as a page reports `has_more == false`.
/// Items come back in server order.
pub async fn fetch_all_pages<T, F, Fut>(mut fetch_fn: F) -> Result<PaginationResult<T>, AppError>
where
    F: FnMut(u32, Option<String>) -> Fut,
    Fut: std::future::Future<Output = Result<PaginatedResponse<T>, AppError>>,
{
    let mut items = Vec::new();
    let mut cursor = None;
    let mut calls = 0u32;

    loop {
        let response = fetch_fn(NOTION_API_PAGE_SIZE, cursor).await?;
        calls += 1;

        let has_more = response.has_more;
        cursor = response.next_cursor;
        items.extend(response.results);

        if !has_more {
            break;
        }
        if cursor.is_none() {
            log::warn!("Page {} declared more results without a cursor; stopping", calls);
            break;
        }
    }

    Ok(PaginationResult { items, calls })
}

/// All direct children of a block or page.
pub async fn collect_children<R>(repo: &R, parent: &NotionId) -> Result<Vec<Block>, AppError>
where
    R: NotionRepository + ?Sized,
{
    let result = fetch_all_pages(|page_size, cursor| repo.list_children(parent, cursor, page_size))
        .await?;
    log::debug!(
        "Listed {} children of {} in {} call(s)",
        result.items.len(),
        parent,
        result.calls
    );
    Ok(result.items)
}

/// All rows of a database.
pub async fn collect_rows<R>(repo: &R, database: &NotionId) -> Result<Vec<RowPage>, AppError>
where
    R: NotionRepository + ?Sized,
{
    let result =
        fetch_all_pages(|page_size, cursor| repo.query_database(database, cursor, page_size))
            .await?;
    log::debug!(
        "Queried {} rows of database {} in {} call(s)",
        result.items.len(),
        database,
        result.calls
    );
    Ok(result.items)
}
