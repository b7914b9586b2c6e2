use async_trait::async_trait;
use chrono::Utc;

use crate::{
    entities::image::{BlobKey, ImageData, StoredBlob},
    errors::AppError,
    repositories::memory_repo::MemoryBlobStore,
};

/// Image blobs addressed by `owner_id/file_name`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlobRepository: Send + Sync {
    /// Writes or overwrites the blob at `key`.
    async fn upload(&self, key: &BlobKey, bytes: Vec<u8>, content_type: &str) -> Result<StoredBlob, AppError>;
    async fn download(&self, key: &BlobKey) -> Result<Option<ImageData>, AppError>;
    /// Returns whether a blob was removed.
    async fn delete(&self, key: &BlobKey) -> Result<bool, AppError>;
    /// Removes every blob under `owner_id/` and returns how many went.
    async fn delete_all_for_owner(&self, owner_id: &str) -> Result<u64, AppError>;
    async fn list_all(&self) -> Result<Vec<StoredBlob>, AppError>;
    async fn check_connection(&self) -> Result<(), AppError>;
}

pub(crate) fn unsafe_key(key: &BlobKey) -> AppError {
    AppError::invalid("fileName", format!("Invalid blob key: {}", key.path()))
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobRepository for MemoryBlobStore {
    async fn upload(&self, key: &BlobKey, bytes: Vec<u8>, content_type: &str) -> Result<StoredBlob, AppError> {
        if !key.is_safe() {
            return Err(unsafe_key(key));
        }

        let now = Utc::now();
        let size = bytes.len() as u64;
        let data = ImageData {
            bytes,
            content_type: content_type.to_string(),
        };
        self.blobs.insert(key.clone(), (data, now));

        Ok(StoredBlob {
            key: key.clone(),
            size,
            content_type: content_type.to_string(),
            last_modified: now,
        })
    }

    async fn download(&self, key: &BlobKey) -> Result<Option<ImageData>, AppError> {
        Ok(self.blobs.get(key).map(|entry| entry.0.clone()))
    }

    async fn delete(&self, key: &BlobKey) -> Result<bool, AppError> {
        Ok(self.blobs.remove(key).is_some())
    }

    async fn delete_all_for_owner(&self, owner_id: &str) -> Result<u64, AppError> {
        let mut removed = 0;
        self.blobs.retain(|key, _| {
            let keep = key.owner_id != owner_id;
            if !keep {
                removed += 1;
            }
            keep
        });
        Ok(removed)
    }

    async fn list_all(&self) -> Result<Vec<StoredBlob>, AppError> {
        let mut blobs: Vec<StoredBlob> = self
            .blobs
            .iter()
            .map(|entry| {
                let (data, last_modified) = entry.value();
                StoredBlob {
                    key: entry.key().clone(),
                    size: data.bytes.len() as u64,
                    content_type: data.content_type.clone(),
                    last_modified: *last_modified,
                }
            })
            .collect();
        blobs.sort_by_key(|b| b.key.path());
        Ok(blobs)
    }

    async fn check_connection(&self) -> Result<(), AppError> {
        Ok(())
    }
}
