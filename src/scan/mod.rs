// src/scan/mod.rs
//! The traversal engine: root type detection and the block-tree walk.

mod detector;
mod walker;

pub use detector::detect;
pub use walker::{DatabaseFailurePolicy, TreeWalker};

use crate::api::NotionRepository;
use crate::error::AppError;
use crate::model::ScanReport;
use crate::types::NotionId;

/// Detects what `root` is and walks it.
pub async fn scan_root<R>(
    repo: &R,
    root: &NotionId,
    policy: DatabaseFailurePolicy,
) -> Result<ScanReport, AppError>
where
    R: NotionRepository + ?Sized,
{
    let detected = detect(repo, root).await?;
    TreeWalker::new(repo, policy).walk(root, &detected).await
}
