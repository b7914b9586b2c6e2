use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::constants::MAX_USER_IMAGES;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub images: Vec<String>,
}

impl User {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        email: impl Into<String>,
        role: impl Into<String>,
    ) -> Self {
        User {
            id: id.into(),
            name: name.into(),
            email: email.into(),
            role: role.into(),
            images: Vec::new(),
        }
    }

    pub fn has_image(&self, file_name: &str) -> bool {
        self.images.iter().any(|name| name == file_name)
    }

    /// Applies the non-empty fields of `patch`. Callers validate first.
    pub fn apply(&mut self, patch: &UpdateUserRequest) {
        if let Some(name) = non_empty(&patch.name) {
            self.name = name.to_string();
        }
        if let Some(email) = non_empty(&patch.email) {
            self.email = email.to_string();
        }
        if let Some(role) = non_empty(&patch.role) {
            self.role = role.to_string();
        }
        if let Some(images) = &patch.images {
            self.images = images.clone();
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Debug, Default, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub id: Option<String>,

    #[validate(length(min = 1, max = 120, message = "Name must be between 1 and 120 characters"))]
    pub name: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    pub role: Option<String>,

    #[validate(custom(function = "validate_image_list"))]
    pub images: Option<Vec<String>>,
}

impl UpdateUserRequest {
    pub fn changes_role(&self) -> bool {
        non_empty(&self.role).is_some()
    }
}

pub fn validate_image_list(images: &[String]) -> Result<(), ValidationError> {
    if images.len() > MAX_USER_IMAGES {
        return Err(ValidationError::new("too_many_images")
            .with_message(format!("A user may hold at most {MAX_USER_IMAGES} images").into()));
    }

    let mut seen = HashSet::new();
    if !images.iter().all(|name| seen.insert(name.as_str())) {
        return Err(ValidationError::new("duplicate_images")
            .with_message("Image names must be unique".into()));
    }

    if images.iter().any(|name| name.trim().is_empty()) {
        return Err(ValidationError::new("empty_image_name")
            .with_message("Image names cannot be empty".into()));
    }

    Ok(())
}

/// Body of `POST /api/user/sync`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SyncUserRequest {
    #[validate(length(min = 1, message = "uid is required"))]
    pub uid: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    pub name: Option<String>,
    pub display_name: Option<String>,
}

impl SyncUserRequest {
    pub fn preferred_name(&self) -> Option<&str> {
        non_empty(&self.name).or_else(|| non_empty(&self.display_name))
    }
}
