use chrono::{DateTime, Utc};
use serde::Serialize;

/// Metadata about a stored image blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub owner_id: String,
    pub name: String,
    pub url: String,
    pub content_type: String,
    pub size: u64,
    pub uploaded_at: DateTime<Utc>,
}

/// Blob payload with its content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Blob location: `owner_id/file_name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlobKey {
    pub owner_id: String,
    pub file_name: String,
}

impl BlobKey {
    pub fn new(owner_id: impl Into<String>, file_name: impl Into<String>) -> Self {
        BlobKey {
            owner_id: owner_id.into(),
            file_name: file_name.into(),
        }
    }

    pub fn path(&self) -> String {
        format!("{}/{}", self.owner_id, self.file_name)
    }

    pub fn owner_prefix(owner_id: &str) -> String {
        format!("{owner_id}/")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeValidationResult {
    pub valid: bool,
    pub message: String,
    pub size_limit: u64,
    pub file_size: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageStatistics {
    pub total_images: u64,
    pub total_size: u64,
    pub average_size: f64,
    pub largest_image: u64,
    pub smallest_image: u64,
}

/// What a blob store knows about one stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub key: BlobKey,
    pub size: u64,
    pub content_type: String,
    pub last_modified: DateTime<Utc>,
}

impl BlobKey {
    /// A key is storable when neither segment could escape its directory.
    pub fn is_safe(&self) -> bool {
        [self.owner_id.as_str(), self.file_name.as_str()]
            .into_iter()
            .all(|segment| {
                !segment.is_empty()
                    && segment != "."
                    && segment != ".."
                    && !segment.contains(['/', '\\', '\0'])
            })
    }
}
