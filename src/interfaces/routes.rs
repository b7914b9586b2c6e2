use actix_web::web;

use crate::handlers::home::home;

mod admin;
mod banner;
mod events;
mod images;
mod users;
mod json_error;

pub use images::multipart_config;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(home);

    cfg.configure(admin::config_routes);

    cfg.service(
        web::scope("/api")
            .configure(banner::config_routes)
            .configure(users::config_routes)
            .configure(events::config_routes)
            .configure(images::config_routes)
    );

    cfg.configure(json_error::config_routes);
}
