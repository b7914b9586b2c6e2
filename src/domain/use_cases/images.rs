use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use crate::{
    constants::MAX_USER_IMAGES,
    entities::image::{BlobKey, Image, ImageData, ImageStatistics, SizeValidationResult},
    errors::AppError,
    repositories::{
        blob::BlobRepository,
        user::{ImageSlot, UserRepository},
    },
    use_cases::image_statistics::ImageStatisticsTracker,
};

const MAX_FILE_NAME_LEN: usize = 128;

#[derive(Debug, Clone)]
pub struct UploadImage {
    pub owner_id: String,
    pub file_name: String,
    pub declared_content_type: Option<String>,
    pub bytes: Vec<u8>,
}

pub struct ImageHandler {
    users: Arc<dyn UserRepository>,
    blobs: Arc<dyn BlobRepository>,
    stats: Arc<ImageStatisticsTracker>,
    public_base_url: String,
}

impl ImageHandler {
    pub fn new(
        users: Arc<dyn UserRepository>,
        blobs: Arc<dyn BlobRepository>,
        stats: Arc<ImageStatisticsTracker>,
        public_base_url: impl Into<String>,
    ) -> Self {
        ImageHandler {
            users,
            blobs,
            stats,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn validate_size(&self, size: u64) -> SizeValidationResult {
        self.stats.validate_image_size(size)
    }

    pub fn statistics(&self) -> (ImageStatistics, u64) {
        (self.stats.statistics(), self.stats.size_limit())
    }

    /// Stores an image for its owner. The name is tracked on the user before
    /// the blob is written and untracked again if the write fails.
    pub async fn upload(&self, upload: UploadImage) -> Result<Image, AppError> {
        let size = upload.bytes.len() as u64;
        let check = self.stats.validate_image_size(size);
        if !check.valid {
            return Err(AppError::invalid("image", check.message));
        }

        let content_type = image_content_type(upload.declared_content_type.as_deref(), &upload.bytes)?;
        let file_name = sanitize_file_name(&upload.file_name)?;
        let key = BlobKey::new(upload.owner_id.trim(), file_name.clone());
        if !key.is_safe() {
            return Err(AppError::invalid("userId", "Invalid owner id"));
        }

        let slot = self.users.add_image(&key.owner_id, &file_name, MAX_USER_IMAGES).await?;

        let stored = match self.blobs.upload(&key, upload.bytes, &content_type).await {
            Ok(stored) => stored,
            Err(err) => {
                if slot == ImageSlot::Added {
                    if let Err(undo) = self.users.remove_image(&key.owner_id, &file_name).await {
                        error!(key = %key.path(), "Failed to untrack image after blob write failure: {}", undo);
                    }
                }
                return Err(match err {
                    AppError::Dependency { .. } => err,
                    other => AppError::dependency("images.upload", other),
                });
            }
        };

        self.stats.track_upload(stored.size);
        info!(key = %key.path(), size = stored.size, "Image uploaded");

        Ok(Image {
            url: self.url_for(&key),
            owner_id: key.owner_id,
            name: file_name,
            content_type: stored.content_type,
            size: stored.size,
            uploaded_at: Utc::now(),
        })
    }

    pub async fn delete(&self, owner_id: &str, file_name: &str) -> Result<(), AppError> {
        let key = BlobKey::new(owner_id, file_name);
        if !key.is_safe() {
            return Err(AppError::NotFound("Image not found".into()));
        }

        let untracked = match self.users.remove_image(owner_id, file_name).await {
            Ok(untracked) => untracked,
            Err(AppError::NotFound(_)) => false,
            Err(e) => return Err(e),
        };
        let removed = self.blobs.delete(&key).await?;

        if !untracked && !removed {
            return Err(AppError::NotFound("Image not found".into()));
        }
        if untracked != removed {
            warn!(key = %key.path(), untracked, removed, "Image record and blob were out of step");
        }
        Ok(())
    }

    pub async fn download(&self, owner_id: &str, file_name: &str) -> Result<ImageData, AppError> {
        let key = BlobKey::new(owner_id, file_name);
        if !key.is_safe() {
            return Err(AppError::NotFound("Image not found".into()));
        }

        self.blobs
            .download(&key)
            .await?
            .ok_or_else(|| AppError::NotFound("Image not found".into()))
    }

    fn url_for(&self, key: &BlobKey) -> String {
        format!(
            "{}/api/images/{}/{}",
            self.public_base_url,
            urlencoding::encode(&key.owner_id),
            urlencoding::encode(&key.file_name)
        )
    }
}

/// Accepts a declared `image/*` type, otherwise sniffs the bytes.
fn image_content_type(declared: Option<&str>, bytes: &[u8]) -> Result<String, AppError> {
    if let Some(kind) = infer::get(bytes) {
        if kind.matcher_type() == infer::MatcherType::Image {
            return Ok(kind.mime_type().to_string());
        }
    }

    match declared.map(str::trim) {
        Some(declared) if declared.starts_with("image/") => Ok(declared.to_string()),
        _ => Err(AppError::invalid("image", "File must be an image")),
    }
}

/// Reduces a client-supplied name to a safe base name.
pub fn sanitize_file_name(raw: &str) -> Result<String, AppError> {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or_default().trim();

    let mut cleaned = String::with_capacity(base.len());
    for c in base.chars() {
        if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
            cleaned.push(c);
        } else if !cleaned.ends_with('_') {
            cleaned.push('_');
        }
    }
    let cleaned = cleaned.trim_start_matches('.');

    if cleaned.is_empty() || cleaned.chars().all(|c| c == '_') {
        return Err(AppError::invalid("fileName", "File name is required"));
    }
    if cleaned.len() > MAX_FILE_NAME_LEN {
        return Err(AppError::invalid(
            "fileName",
            format!("File name cannot exceed {MAX_FILE_NAME_LEN} characters"),
        ));
    }
    Ok(cleaned.to_string())
}
