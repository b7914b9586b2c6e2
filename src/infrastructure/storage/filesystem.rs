use std::{io::ErrorKind, path::{Path, PathBuf}};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::{fs, io::AsyncReadExt};
use tracing::{debug, warn};

use crate::{
    entities::image::{BlobKey, ImageData, StoredBlob},
    errors::AppError,
    repositories::blob::{unsafe_key, BlobRepository},
};

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";
const SNIFF_LEN: usize = 512;

/// Blob store laid out as `<root>/<owner_id>/<file_name>`.
#[derive(Debug, Clone)]
pub struct FilesystemBlobStore {
    root: PathBuf,
}

impl FilesystemBlobStore {
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self, AppError> {
        let root = root.into();
        fs::create_dir_all(&root)
            .await
            .map_err(|e| AppError::dependency("blobs.init", e))?;
        Ok(FilesystemBlobStore { root })
    }

    fn path_for(&self, key: &BlobKey) -> Result<PathBuf, AppError> {
        if !key.is_safe() {
            return Err(unsafe_key(key));
        }
        Ok(self.root.join(&key.owner_id).join(&key.file_name))
    }

    async fn describe(&self, key: BlobKey, path: &Path) -> Result<StoredBlob, AppError> {
        let metadata = fs::metadata(path)
            .await
            .map_err(|e| AppError::dependency("blobs.stat", e))?;
        let last_modified = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());

        Ok(StoredBlob {
            key,
            size: metadata.len(),
            content_type: sniff_file(path).await,
            last_modified,
        })
    }
}

fn sniff(bytes: &[u8]) -> String {
    infer::get(bytes)
        .map(|kind| kind.mime_type().to_string())
        .unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_string())
}

async fn sniff_file(path: &Path) -> String {
    let mut head = [0u8; SNIFF_LEN];
    match fs::File::open(path).await {
        Ok(mut file) => match file.read(&mut head).await {
            Ok(n) => sniff(&head[..n]),
            Err(_) => FALLBACK_CONTENT_TYPE.to_string(),
        },
        Err(_) => FALLBACK_CONTENT_TYPE.to_string(),
    }
}

#[async_trait]
impl BlobRepository for FilesystemBlobStore {
    async fn upload(&self, key: &BlobKey, bytes: Vec<u8>, content_type: &str) -> Result<StoredBlob, AppError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::dependency("blobs.upload", e))?;
        }

        let size = bytes.len() as u64;
        fs::write(&path, bytes)
            .await
            .map_err(|e| AppError::dependency("blobs.upload", e))?;
        debug!(key = %key.path(), size, "Blob written");

        Ok(StoredBlob {
            key: key.clone(),
            size,
            content_type: content_type.to_string(),
            last_modified: Utc::now(),
        })
    }

    async fn download(&self, key: &BlobKey) -> Result<Option<ImageData>, AppError> {
        let path = self.path_for(key)?;
        match fs::read(&path).await {
            Ok(bytes) => {
                let content_type = sniff(&bytes);
                Ok(Some(ImageData { bytes, content_type }))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::dependency("blobs.download", e)),
        }
    }

    async fn delete(&self, key: &BlobKey) -> Result<bool, AppError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(AppError::dependency("blobs.delete", e)),
        }
    }

    async fn delete_all_for_owner(&self, owner_id: &str) -> Result<u64, AppError> {
        let probe = BlobKey::new(owner_id, "probe");
        if !probe.is_safe() {
            return Err(unsafe_key(&probe));
        }

        let dir = self.root.join(owner_id);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(AppError::dependency("blobs.delete_all", e)),
        };

        let mut removed = 0;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| AppError::dependency("blobs.delete_all", e))?
        {
            match fs::remove_file(entry.path()).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(AppError::dependency("blobs.delete_all", e)),
            }
        }

        if let Err(e) = fs::remove_dir(&dir).await {
            warn!(owner_id, "Could not remove empty blob directory: {}", e);
        }
        Ok(removed)
    }

    async fn list_all(&self) -> Result<Vec<StoredBlob>, AppError> {
        let mut blobs = Vec::new();
        let mut owners = fs::read_dir(&self.root)
            .await
            .map_err(|e| AppError::dependency("blobs.list", e))?;

        while let Some(owner) = owners
            .next_entry()
            .await
            .map_err(|e| AppError::dependency("blobs.list", e))?
        {
            if !owner.path().is_dir() {
                continue;
            }
            let owner_id = owner.file_name().to_string_lossy().into_owned();
            let mut files = fs::read_dir(owner.path())
                .await
                .map_err(|e| AppError::dependency("blobs.list", e))?;

            while let Some(file) = files
                .next_entry()
                .await
                .map_err(|e| AppError::dependency("blobs.list", e))?
            {
                let key = BlobKey::new(owner_id.clone(), file.file_name().to_string_lossy().into_owned());
                blobs.push(self.describe(key, &file.path()).await?);
            }
        }

        blobs.sort_by_key(|b| b.key.path());
        Ok(blobs)
    }

    async fn check_connection(&self) -> Result<(), AppError> {
        fs::metadata(&self.root)
            .await
            .map(|_| ())
            .map_err(|e| AppError::dependency("blobs.check_connection", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    fn scratch_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("childcare-blobs-{}-{}", name, uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn stores_and_sniffs_blobs() {
        let root = scratch_dir("roundtrip");
        let store = FilesystemBlobStore::new(&root).await.unwrap();
        let key = BlobKey::new("u1", "pic.png");

        store.upload(&key, PNG_HEADER.to_vec(), "image/png").await.unwrap();
        let data = store.download(&key).await.unwrap().unwrap();
        assert_eq!(data.content_type, "image/png");

        assert!(store.delete(&key).await.unwrap());
        assert!(!store.delete(&key).await.unwrap());
        assert!(store.download(&key).await.unwrap().is_none());

        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn deletes_everything_for_an_owner() {
        let root = scratch_dir("owner");
        let store = FilesystemBlobStore::new(&root).await.unwrap();
        store.upload(&BlobKey::new("u1", "a.png"), PNG_HEADER.to_vec(), "image/png").await.unwrap();
        store.upload(&BlobKey::new("u1", "b.png"), PNG_HEADER.to_vec(), "image/png").await.unwrap();
        store.upload(&BlobKey::new("u2", "c.png"), PNG_HEADER.to_vec(), "image/png").await.unwrap();

        assert_eq!(store.delete_all_for_owner("u1").await.unwrap(), 2);
        assert_eq!(store.delete_all_for_owner("u1").await.unwrap(), 0);
        assert_eq!(store.list_all().await.unwrap().len(), 1);

        let _ = std::fs::remove_dir_all(root);
    }
}
