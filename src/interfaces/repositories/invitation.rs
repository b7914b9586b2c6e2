use async_trait::async_trait;
use sqlx::PgPool;

use crate::{
    entities::invitation::{normalize_email, Invitation},
    errors::AppError,
    repositories::{memory_repo::MemoryInvitationRepo, sqlx_repo::SqlxInvitationRepo},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InvitationRepository: Send + Sync {
    async fn upsert_invitation(&self, invitation: &Invitation) -> Result<(), AppError>;
    async fn get_invitation(&self, email: &str) -> Result<Option<Invitation>, AppError>;
    /// Returns whether an invitation existed for the email.
    async fn mark_signed_up(&self, email: &str) -> Result<bool, AppError>;
    async fn list_signed_up_admins(&self) -> Result<Vec<Invitation>, AppError>;
}

impl SqlxInvitationRepo {
    pub fn new(pool: PgPool) -> Self {
        SqlxInvitationRepo { pool }
    }
}

#[async_trait]
impl InvitationRepository for SqlxInvitationRepo {
    async fn upsert_invitation(&self, invitation: &Invitation) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO invited_users (email, invited, signed_up, admin, role, invited_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (email) DO UPDATE
            SET invited = EXCLUDED.invited,
                signed_up = EXCLUDED.signed_up,
                admin = EXCLUDED.admin,
                role = EXCLUDED.role,
                invited_at = EXCLUDED.invited_at
            "#,
        )
        .bind(normalize_email(&invitation.email))
        .bind(invitation.invited)
        .bind(invitation.signed_up)
        .bind(invitation.admin)
        .bind(&invitation.role)
        .bind(invitation.invited_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::dependency("invitations.upsert", e))?;

        Ok(())
    }

    async fn get_invitation(&self, email: &str) -> Result<Option<Invitation>, AppError> {
        sqlx::query_as::<_, Invitation>(
            "SELECT email, invited, signed_up, admin, role, invited_at FROM invited_users WHERE email = $1",
        )
        .bind(normalize_email(email))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::dependency("invitations.get", e))
    }

    async fn mark_signed_up(&self, email: &str) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE invited_users SET signed_up = TRUE WHERE email = $1")
            .bind(normalize_email(email))
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::dependency("invitations.mark_signed_up", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_signed_up_admins(&self) -> Result<Vec<Invitation>, AppError> {
        sqlx::query_as::<_, Invitation>(
            "SELECT email, invited, signed_up, admin, role, invited_at FROM invited_users WHERE admin AND signed_up",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::dependency("invitations.list_admins", e))
    }
}

impl MemoryInvitationRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InvitationRepository for MemoryInvitationRepo {
    async fn upsert_invitation(&self, invitation: &Invitation) -> Result<(), AppError> {
        let email = normalize_email(&invitation.email);
        self.invitations.insert(email.clone(), Invitation { email, ..invitation.clone() });
        Ok(())
    }

    async fn get_invitation(&self, email: &str) -> Result<Option<Invitation>, AppError> {
        Ok(self.invitations.get(&normalize_email(email)).map(|i| i.clone()))
    }

    async fn mark_signed_up(&self, email: &str) -> Result<bool, AppError> {
        Ok(self
            .invitations
            .get_mut(&normalize_email(email))
            .map(|mut invitation| invitation.signed_up = true)
            .is_some())
    }

    async fn list_signed_up_admins(&self) -> Result<Vec<Invitation>, AppError> {
        Ok(self
            .invitations
            .iter()
            .filter(|i| i.grants_admin())
            .map(|i| i.value().clone())
            .collect())
    }
}
