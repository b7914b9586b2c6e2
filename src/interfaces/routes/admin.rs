use actix_web::web;

use crate::handlers::{banner, invitations, system::admin_health_check};

pub fn config_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .service(
                web::resource("/health")
                    .route(web::get().to(admin_health_check))
            )
            .service(
                web::resource("/banner/status")
                    .route(web::get().to(banner::banner_status))
            )
            .service(
                web::resource("/claims/sync")
                    .route(web::post().to(invitations::sync_admin_claims))
            )
            .service(
                web::resource("/claims/{email}")
                    .route(web::post().to(invitations::grant_admin_claim))
            )
    );
}
