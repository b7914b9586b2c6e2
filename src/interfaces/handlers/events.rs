use actix_web::{web, HttpResponse, Responder};
use tracing::instrument;

use crate::{
    entities::event::{CreateEventRequest, UpdateEventRequest},
    errors::AppError,
    use_cases::extractors::AuthIdentity,
    AppState,
};

#[instrument(skip(caller, state, data))]
pub async fn create_event(
    caller: AuthIdentity,
    state: web::Data<AppState>,
    data: web::Json<CreateEventRequest>,
) -> Result<impl Responder, AppError> {
    let event = state.event_handler.create_event(&caller.0, data.into_inner()).await?;
    Ok(HttpResponse::Created().json(event))
}

#[instrument(skip(state))]
pub async fn get_all_events(state: web::Data<AppState>) -> Result<impl Responder, AppError> {
    let events = state.event_handler.get_all_events().await?;
    Ok(HttpResponse::Ok().json(events))
}

#[instrument(skip(state))]
pub async fn get_events_by_user(
    user_id: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<impl Responder, AppError> {
    let events = state.event_handler.get_events_by_user(&user_id).await?;
    Ok(HttpResponse::Ok().json(events))
}

#[instrument(skip(state))]
pub async fn get_event(
    event_id: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<impl Responder, AppError> {
    let event = state.event_handler.get_event(&event_id).await?;
    Ok(HttpResponse::Ok().json(event))
}

#[instrument(skip(caller, state, data))]
pub async fn update_event(
    caller: AuthIdentity,
    event_id: web::Path<String>,
    state: web::Data<AppState>,
    data: web::Json<UpdateEventRequest>,
) -> Result<impl Responder, AppError> {
    let event = state
        .event_handler
        .update_event(&caller.0, &event_id, data.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(event))
}

#[instrument(skip(caller, state))]
pub async fn delete_event(
    caller: AuthIdentity,
    event_id: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<impl Responder, AppError> {
    state.event_handler.delete_event(&caller.0, &event_id).await?;
    Ok(HttpResponse::NoContent().finish())
}
