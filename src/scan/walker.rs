// src/scan/walker.rs
//! Breadth-first walk of a Notion block tree.
//!
//! Page traversal drains a FIFO queue of blocks; database traversal walks
//! every row as a page. The two recurse into each other through boxed
//! futures, so only database nesting (never block nesting) grows the stack.

use crate::api::{collect_children, collect_rows, NotionRepository};
use crate::constants::NOTION_MAX_DATABASE_NESTING;
use crate::error::AppError;
use crate::model::{Block, DetectedType, ScanReport, SkippedDatabase, TraversalResult};
use crate::types::NotionId;
use futures::future::BoxFuture;
use std::collections::VecDeque;

/// What to do when a child database inside a page cannot be walked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DatabaseFailurePolicy {
    /// Log it, leave its subtree out of the counts, keep walking the page.
    #[default]
    BestEffort,
    /// Fail the whole traversal.
    Strict,
}

/// Walks a page or database and accumulates block and word counts.
pub struct TreeWalker<'a, R: ?Sized> {
    repo: &'a R,
    policy: DatabaseFailurePolicy,
}

impl<'a, R> TreeWalker<'a, R>
where
    R: NotionRepository + ?Sized,
{
    pub fn new(repo: &'a R, policy: DatabaseFailurePolicy) -> Self {
        Self { repo, policy }
    }

    /// Walks `root` according to its detected type.
    pub async fn walk(&self, root: &NotionId, kind: &DetectedType) -> Result<ScanReport, AppError> {
        let mut skipped = Vec::new();
        let counts = match kind {
            DetectedType::Page => self.walk_page(root, 0, &mut skipped).await?,
            DetectedType::Database => self.walk_database(root, 0, &mut skipped).await?,
            DetectedType::Unsupported(block_type) => {
                log::info!("Root {} is a {} block; nothing to do.", root, block_type);
                TraversalResult::default()
            }
        };
        Ok(ScanReport {
            counts,
            skipped_databases: skipped,
        })
    }

    fn walk_page<'s>(
        &'s self,
        page: &'s NotionId,
        depth: usize,
        skipped: &'s mut Vec<SkippedDatabase>,
    ) -> BoxFuture<'s, Result<TraversalResult, AppError>> {
        Box::pin(async move {
            let mut totals = TraversalResult::default();
            let mut queue: VecDeque<Block> = collect_children(self.repo, page).await?.into();

            while let Some(block) = queue.pop_front() {
                if block.has_children {
                    log::trace!("Block {} ({}) has children", block.id, block.block_type);
                    queue.extend(collect_children(self.repo, &block.id).await?);
                }

                if let Some(len) = block.rich_text_len() {
                    totals.word_count += len;
                }

                if block.is_child_database() {
                    log::debug!("Block {} is a child database", block.id);
                    let nested = self.walk_database(&block.id, depth + 1, skipped).await;
                    match nested {
                        Ok(counts) => totals += counts,
                        Err(err) if self.policy == DatabaseFailurePolicy::BestEffort => {
                            log::warn!(
                                "Skipping child database {} under {}: {}",
                                block.id,
                                page,
                                err
                            );
                            skipped.push(SkippedDatabase {
                                id: block.id.clone(),
                                reason: err.to_string(),
                            });
                        }
                        Err(err) => return Err(err),
                    }
                    continue;
                }

                totals.block_count += 1;
            }

            Ok(totals)
        })
    }

    fn walk_database<'s>(
        &'s self,
        database: &'s NotionId,
        depth: usize,
        skipped: &'s mut Vec<SkippedDatabase>,
    ) -> BoxFuture<'s, Result<TraversalResult, AppError>> {
        Box::pin(async move {
            if depth > NOTION_MAX_DATABASE_NESTING {
                return Err(AppError::RecursionLimitExceeded(NOTION_MAX_DATABASE_NESTING));
            }

            let rows = collect_rows(self.repo, database).await?;
            let mut totals = TraversalResult::default();
            for row in &rows {
                totals += self.walk_page(&row.id, depth, skipped).await?;
            }

            log::debug!(
                "Database {}: {} rows, {} blocks, {} words",
                database,
                rows.len(),
                totals.block_count,
                totals.word_count
            );
            Ok(totals)
        })
    }
}
