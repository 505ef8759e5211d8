// src/scan/detector.rs
use crate::api::NotionRepository;
use crate::error::AppError;
use crate::model::DetectedType;
use crate::types::NotionId;

/// Classifies a root identifier with a single metadata fetch.
///
/// Anything other than an embedded database or page comes back as
/// [`DetectedType::Unsupported`], which callers treat as "nothing to do".
pub async fn detect<R>(repo: &R, id: &NotionId) -> Result<DetectedType, AppError>
where
    R: NotionRepository + ?Sized,
{
    let block = repo.retrieve(id).await?;
    let detected = DetectedType::from_block_type(&block.block_type);
    log::debug!("Root {} detected as {:?}", id, detected);
    Ok(detected)
}
