use async_trait::async_trait;

use crate::{entities::identity::Identity, errors::{AppError, AuthError}};

/// Verifies bearer tokens and manages the admin custom claim.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn verify_token(&self, token: &str) -> Result<Identity, AuthError>;
    async fn set_admin_claim(&self, email: &str) -> Result<(), AppError>;
}
