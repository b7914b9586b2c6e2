use actix_web::{web, HttpResponse, Responder};
use tracing::instrument;

use crate::{
    entities::invitation::InviteRequest,
    errors::AppError,
    use_cases::extractors::AdminIdentity,
    AppState,
};

#[instrument(skip(_admin, state, data))]
pub async fn send_invite(
    _admin: AdminIdentity,
    state: web::Data<AppState>,
    data: web::Json<InviteRequest>,
) -> Result<impl Responder, AppError> {
    let invitation = state.invitation_handler.send_invite(data.into_inner()).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Invite sent",
        "invitation": invitation,
    })))
}

#[instrument(skip(state))]
pub async fn grant_admin_claim(
    email: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<impl Responder, AppError> {
    state.invitation_handler.set_admin_claim_for_email(&email).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": format!("Admin claim set for {}", email.as_str()),
    })))
}

#[instrument(skip(state))]
pub async fn sync_admin_claims(state: web::Data<AppState>) -> Result<impl Responder, AppError> {
    let synced = state.invitation_handler.sync_admin_claims().await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "synced": synced })))
}
