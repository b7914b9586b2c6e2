use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Invitation {
    pub email: String,
    pub invited: bool,
    pub signed_up: bool,
    pub admin: bool,
    pub role: String,
    pub invited_at: DateTime<Utc>,
}

impl Invitation {
    pub fn grants_admin(&self) -> bool {
        self.admin && self.signed_up
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct InviteRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[serde(default)]
    pub admin: bool,
}

/// Emails are keys; compare them case-insensitively.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
