use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use validator::Validate;

use crate::{
    constants::PARENT_ROLE,
    entities::invitation::{normalize_email, Invitation, InviteRequest},
    errors::AppError,
    repositories::{
        email::EmailService, identity::IdentityProvider, invitation::InvitationRepository,
    },
};

pub struct InvitationHandler {
    invitations: Arc<dyn InvitationRepository>,
    email: Arc<dyn EmailService>,
    identity: Arc<dyn IdentityProvider>,
}

impl InvitationHandler {
    pub fn new(
        invitations: Arc<dyn InvitationRepository>,
        email: Arc<dyn EmailService>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        InvitationHandler { invitations, email, identity }
    }

    /// Emails an invite and records it. A re-invite keeps an earlier sign-up.
    pub async fn send_invite(&self, request: InviteRequest) -> Result<Invitation, AppError> {
        request.validate()?;
        let email = normalize_email(&request.email);

        self.email.send_invite_email(&email).await?;

        let signed_up = self
            .invitations
            .get_invitation(&email)
            .await?
            .is_some_and(|existing| existing.signed_up);

        let invitation = Invitation {
            email,
            invited: true,
            signed_up,
            admin: request.admin,
            role: PARENT_ROLE.to_string(),
            invited_at: Utc::now(),
        };
        self.invitations.upsert_invitation(&invitation).await?;
        info!(email = %invitation.email, admin = invitation.admin, "Invitation recorded");

        Ok(invitation)
    }

    /// Sets the admin claim for every signed-up admin invitation. Individual
    /// failures are logged and skipped; returns how many claims were set.
    pub async fn sync_admin_claims(&self) -> Result<usize, AppError> {
        let mut synced = 0;
        for invitation in self.invitations.list_signed_up_admins().await? {
            match self.identity.set_admin_claim(&invitation.email).await {
                Ok(()) => synced += 1,
                Err(e) => warn!(email = %invitation.email, "Error setting admin claim: {}", e),
            }
        }
        info!(synced, "Admin claims synchronized");
        Ok(synced)
    }

    pub async fn set_admin_claim_for_email(&self, email: &str) -> Result<(), AppError> {
        let invitation = self
            .invitations
            .get_invitation(email)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No invitation for {email}")))?;

        if !invitation.grants_admin() {
            return Err(AppError::Forbidden(format!(
                "{email} is not an admin or has not signed up"
            )));
        }
        self.identity.set_admin_claim(&invitation.email).await
    }
}
