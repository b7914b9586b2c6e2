use actix_multipart::form::{tempfile::TempFile, text::Text, MultipartForm};
use actix_web::{http::StatusCode, web, HttpResponse, Responder};
use tracing::{instrument, warn};

use crate::{
    errors::AppError,
    use_cases::{extractors::AuthIdentity, images::UploadImage},
    AppState,
};

const DEFAULT_FILE_NAME: &str = "image";

#[derive(Debug, MultipartForm)]
pub struct ImageUploadForm {
    pub image: TempFile,
    /// Owner to upload for; admins only when it is not the caller.
    #[multipart(rename = "userId")]
    pub user_id: Option<Text<String>>,
}

#[instrument(skip(caller, state, form))]
pub async fn upload_image(
    caller: AuthIdentity,
    state: web::Data<AppState>,
    MultipartForm(form): MultipartForm<ImageUploadForm>,
) -> Result<impl Responder, AppError> {
    let caller = caller.0;
    let owner_id = form
        .user_id
        .map(|text| text.into_inner())
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| caller.uid.clone());

    if !caller.can_act_for(&owner_id) {
        return Err(AppError::Forbidden("Cannot upload images for another user".into()));
    }

    let check = state.image_handler.validate_size(form.image.size as u64);
    if !check.valid {
        warn!(owner_id, size = check.file_size, limit = check.size_limit, "Rejected oversized image");
        return Ok(HttpResponse::build(StatusCode::BAD_REQUEST).json(serde_json::json!({
            "success": false,
            "message": check.message,
            "violation": check,
        })));
    }

    let bytes = tokio::fs::read(form.image.file.path())
        .await
        .map_err(|e| AppError::dependency("images.read_upload", e))?;

    let upload = UploadImage {
        owner_id,
        file_name: form.image.file_name.clone().unwrap_or_else(|| DEFAULT_FILE_NAME.to_string()),
        declared_content_type: form.image.content_type.as_ref().map(|m| m.essence_str().to_string()),
        bytes,
    };
    let image = state.image_handler.upload(upload).await?;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "success": true,
        "message": "Image uploaded successfully",
        "image": image,
    })))
}

#[instrument(skip(state))]
pub async fn download_image(
    path: web::Path<(String, String)>,
    state: web::Data<AppState>,
) -> Result<impl Responder, AppError> {
    let (owner_id, file_name) = path.into_inner();
    let data = state.image_handler.download(&owner_id, &file_name).await?;

    Ok(HttpResponse::Ok()
        .content_type(data.content_type)
        .body(data.bytes))
}

#[instrument(skip(caller, state))]
pub async fn delete_image(
    caller: AuthIdentity,
    path: web::Path<(String, String)>,
    state: web::Data<AppState>,
) -> Result<impl Responder, AppError> {
    let (owner_id, file_name) = path.into_inner();
    if !caller.0.can_act_for(&owner_id) {
        return Err(AppError::Forbidden("Cannot delete another user's image".into()));
    }

    state.image_handler.delete(&owner_id, &file_name).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Image deleted successfully",
    })))
}

#[instrument(skip(state))]
pub async fn image_statistics(state: web::Data<AppState>) -> Result<impl Responder, AppError> {
    let (statistics, size_limit) = state.image_handler.statistics();
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Image statistics retrieved successfully",
        "statistics": statistics,
        "sizeLimit": size_limit,
    })))
}
