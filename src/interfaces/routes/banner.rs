use actix_web::web;

use crate::handlers::banner;

pub fn config_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/banner")
            .route(web::get().to(banner::get_banner))
            .route(web::post().to(banner::set_banner))
            .route(web::delete().to(banner::delete_banner))
    );
}
