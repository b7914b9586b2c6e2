use async_trait::async_trait;

use crate::errors::AppError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmailService: Send + Sync {
    async fn send_invite_email(&self, to: &str) -> Result<(), AppError>;
}
