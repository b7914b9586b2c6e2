use actix_web::{web, HttpResponse, Responder};
use tracing::instrument;

use crate::{
    entities::user::{SyncUserRequest, UpdateUserRequest},
    errors::AppError,
    use_cases::extractors::AuthIdentity,
    AppState,
};

#[instrument(skip(caller))]
pub async fn whoami(caller: AuthIdentity) -> Result<impl Responder, AppError> {
    Ok(HttpResponse::Ok().json(caller.0))
}

#[instrument(skip(caller, state))]
pub async fn signup(
    caller: AuthIdentity,
    state: web::Data<AppState>,
) -> Result<impl Responder, AppError> {
    let user = state.user_handler.signup(&caller.0).await?;
    Ok(HttpResponse::Created().json(user))
}

#[instrument(skip(caller, state, data))]
pub async fn sync_user(
    caller: AuthIdentity,
    state: web::Data<AppState>,
    data: web::Json<SyncUserRequest>,
) -> Result<impl Responder, AppError> {
    let (user, created) = state.user_handler.sync(&caller.0, data.into_inner()).await?;

    if created {
        Ok(HttpResponse::Created().json(user))
    } else {
        Ok(HttpResponse::Ok().json(user))
    }
}

#[instrument(skip(state))]
pub async fn get_all_users(state: web::Data<AppState>) -> Result<impl Responder, AppError> {
    let users = state.user_handler.get_all_users().await?;
    Ok(HttpResponse::Ok().json(users))
}

#[instrument(skip(state))]
pub async fn get_user(
    user_id: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<impl Responder, AppError> {
    let user = state.user_handler.get_user(&user_id).await?;
    Ok(HttpResponse::Ok().json(user))
}

#[instrument(skip(caller, state, data))]
pub async fn update_user(
    caller: AuthIdentity,
    user_id: web::Path<String>,
    state: web::Data<AppState>,
    data: web::Json<UpdateUserRequest>,
) -> Result<impl Responder, AppError> {
    let user = state
        .user_handler
        .update_user(&caller.0, &user_id, data.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(user))
}

#[instrument(skip(caller, state))]
pub async fn delete_user(
    caller: AuthIdentity,
    user_id: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<impl Responder, AppError> {
    let report = state.user_handler.delete_user(&caller.0, &user_id).await?;
    Ok(HttpResponse::Ok().json(report))
}

#[instrument(skip(caller, state))]
pub async fn deletion_status(
    caller: AuthIdentity,
    user_id: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<impl Responder, AppError> {
    let status = state.user_handler.deletion_status(&caller.0, &user_id).await?;
    Ok(HttpResponse::Ok().json(status))
}
