use actix_web::{web, HttpResponse, Responder};
use chrono::Utc;
use tracing::instrument;

use crate::{
    entities::banner::BannerRequest,
    errors::AppError,
    use_cases::extractors::AdminIdentity,
    AppState,
};

#[instrument(skip(state))]
pub async fn get_banner(state: web::Data<AppState>) -> Result<impl Responder, AppError> {
    let banner = state.banner.get_current()?;
    Ok(HttpResponse::Ok().json(banner))
}

#[instrument(skip(_admin, state, data))]
pub async fn set_banner(
    _admin: AdminIdentity,
    state: web::Data<AppState>,
    data: web::Json<BannerRequest>,
) -> Result<impl Responder, AppError> {
    let banner = data.into_inner().into_banner(Utc::now())?;
    let banner = state.banner.replace(banner)?;

    Ok(HttpResponse::Created().json(banner))
}

#[instrument(skip(_admin, state))]
pub async fn delete_banner(
    _admin: AdminIdentity,
    state: web::Data<AppState>,
) -> Result<impl Responder, AppError> {
    state.banner.delete();
    Ok(HttpResponse::NoContent().finish())
}

#[instrument(skip(state))]
pub async fn banner_status(state: web::Data<AppState>) -> Result<impl Responder, AppError> {
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "status": state.banner.status(),
        "timerRunning": state.banner.is_timer_running(),
        "expiredAt": state.banner.expired_at(),
    })))
}
