use actix_multipart::form::MultipartFormConfig;
use actix_web::{error::InternalError, http::StatusCode, web};

use crate::handlers::{images, json_error::json_error};

/// Slack on top of the image limit for multipart framing and the text fields.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn config_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/images")
            .service(
                web::resource("")
                    .route(web::post().to(images::upload_image))
            )
            .service(
                web::resource("/statistics")
                    .route(web::get().to(images::image_statistics))
            )
            .service(
                web::resource("/{user_id}/{file_name}")
                    .route(web::get().to(images::download_image))
                    .route(web::delete().to(images::delete_image))
            )
    );
}

/// Multipart limits for the upload route. The hard cap sits above the image
/// size limit so oversized files still reach the structured size check.
pub fn multipart_config(max_upload_bytes: u64) -> MultipartFormConfig {
    let limit = usize::try_from(max_upload_bytes)
        .unwrap_or(usize::MAX)
        .saturating_mul(2)
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    MultipartFormConfig::default()
        .total_limit(limit)
        .memory_limit(MULTIPART_OVERHEAD_BYTES)
        .error_handler(|err, _req| {
            let response = json_error(StatusCode::BAD_REQUEST, "Invalid multipart payload", &err.to_string());
            InternalError::from_response(err, response).into()
        })
}
