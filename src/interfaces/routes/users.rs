use actix_web::web;

use crate::handlers::{invitations, users};

pub fn config_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/whoami")
            .route(web::get().to(users::whoami))
    )
    .service(
        web::resource("/users")
            .route(web::get().to(users::get_all_users))
    )
    .service(
        web::resource("/send-invite")
            .route(web::post().to(invitations::send_invite))
    )
    .service(
        web::scope("/user")
            .service(
                web::resource("")
                    .route(web::post().to(users::signup))
            )
            .service(
                web::resource("/sync")
                    .route(web::post().to(users::sync_user))
            )
            .service(
                web::resource("/{user_id}")
                    .route(web::get().to(users::get_user))
                    .route(web::put().to(users::update_user))
                    .route(web::delete().to(users::delete_user))
            )
            .service(
                web::resource("/{user_id}/deletion")
                    .route(web::get().to(users::deletion_status))
            )
    );
}
