use std::sync::Arc;

use tracing::{info, warn};
use validator::Validate;

use crate::{
    constants::{ADMIN_ROLE, DEFAULT_USER_NAME, PARENT_ROLE, USER_ROLE},
    entities::{
        deletion::{DeletionReport, DeletionStatus},
        identity::Identity,
        user::{SyncUserRequest, UpdateUserRequest, User},
    },
    errors::AppError,
    repositories::{
        identity::IdentityProvider, invitation::InvitationRepository, user::UserRepository,
    },
    use_cases::user_deletion::UserDeletionCoordinator,
};

pub struct UserHandler {
    pub users: Arc<dyn UserRepository>,
    invitations: Arc<dyn InvitationRepository>,
    identity: Arc<dyn IdentityProvider>,
    deletion: UserDeletionCoordinator,
}

impl UserHandler {
    pub fn new(
        users: Arc<dyn UserRepository>,
        invitations: Arc<dyn InvitationRepository>,
        identity: Arc<dyn IdentityProvider>,
        deletion: UserDeletionCoordinator,
    ) -> Self {
        UserHandler { users, invitations, identity, deletion }
    }

    /// Creates the caller's user record from their verified identity.
    pub async fn signup(&self, caller: &Identity) -> Result<User, AppError> {
        let email = caller
            .email
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| AppError::Unauthorized("Token carries no email".into()))?;

        let name = caller
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(DEFAULT_USER_NAME);

        self.ensure_no_pending_deletion(&caller.uid).await?;

        let invitation = self.invitations.get_invitation(email).await?;
        let is_admin = invitation.as_ref().is_some_and(|i| i.admin);
        let role = if is_admin { ADMIN_ROLE } else { USER_ROLE };

        let user = User::new(caller.uid.clone(), name, email, role);
        self.users.create_user(&user).await?;
        info!(user_id = %user.id, role, "User signed up");

        if invitation.is_some() {
            if let Err(e) = self.invitations.mark_signed_up(email).await {
                warn!(email, "Could not mark invitation as signed up: {}", e);
            }
        }

        if is_admin {
            let identity = Arc::clone(&self.identity);
            let email = email.to_string();
            tokio::spawn(async move {
                if let Err(e) = identity.set_admin_claim(&email).await {
                    warn!(email, "Failed to set admin claim: {}", e);
                }
            });
        }

        Ok(user)
    }

    /// Returns the existing user, or creates one with the parent role. The
    /// flag is true when a record was created.
    pub async fn sync(&self, caller: &Identity, request: SyncUserRequest) -> Result<(User, bool), AppError> {
        request.validate()?;
        if !caller.can_act_for(&request.uid) {
            return Err(AppError::Forbidden("Cannot sync another user".into()));
        }
        self.ensure_no_pending_deletion(&request.uid).await?;

        if let Some(existing) = self.users.get_user(&request.uid).await? {
            return Ok((existing, false));
        }

        let name = request.preferred_name().unwrap_or(DEFAULT_USER_NAME).to_string();
        let user = User::new(request.uid.clone(), name, request.email.trim(), PARENT_ROLE);

        match self.users.create_user(&user).await {
            Ok(()) => {
                info!(user_id = %user.id, "User synced");
                Ok((user, true))
            }
            // Lost a race with a concurrent sync.
            Err(AppError::Conflict(_)) => self
                .users
                .get_user(&request.uid)
                .await?
                .map(|u| (u, false))
                .ok_or_else(|| AppError::NotFound(format!("User {} not found", request.uid))),
            Err(e) => Err(e),
        }
    }

    async fn ensure_no_pending_deletion(&self, id: &str) -> Result<(), AppError> {
        match self.deletion.deletion_status(id).await? {
            DeletionStatus::Pending(_) => Err(AppError::Conflict(format!("Deletion pending for user {id}"))),
            DeletionStatus::None => Ok(()),
        }
    }

    pub async fn get_user(&self, id: &str) -> Result<User, AppError> {
        self.users
            .get_user(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {id} not found")))
    }

    pub async fn get_all_users(&self) -> Result<Vec<User>, AppError> {
        self.users.get_all_users().await
    }

    /// Partial update; only admins may change roles.
    pub async fn update_user(
        &self,
        caller: &Identity,
        id: &str,
        request: UpdateUserRequest,
    ) -> Result<User, AppError> {
        request.validate()?;
        if request.id.as_deref().is_some_and(|body_id| body_id != id) {
            return Err(AppError::invalid("id", "Body id does not match the path"));
        }
        if !caller.can_act_for(id) {
            return Err(AppError::Forbidden("Cannot modify another user".into()));
        }
        if request.changes_role() && !caller.admin {
            return Err(AppError::Forbidden("Only admins can change roles".into()));
        }

        let mut user = self.get_user(id).await?;
        user.apply(&request);
        self.users.update_user(&user).await?;

        Ok(user)
    }

    pub async fn delete_user(&self, caller: &Identity, id: &str) -> Result<DeletionReport, AppError> {
        if !caller.can_act_for(id) {
            return Err(AppError::Forbidden("Cannot delete another user".into()));
        }
        self.deletion.delete_user(id).await
    }

    pub async fn deletion_status(&self, caller: &Identity, id: &str) -> Result<DeletionStatus, AppError> {
        if !caller.can_act_for(id) {
            return Err(AppError::Forbidden("Cannot inspect another user".into()));
        }
        self.deletion.deletion_status(id).await
    }
}
