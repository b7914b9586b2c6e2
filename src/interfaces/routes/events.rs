use actix_web::web;

use crate::handlers::events;

pub fn config_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/events")
            .service(
                web::resource("")
                    .route(web::get().to(events::get_all_events))
            )
            .service(
                web::resource("/user/{user_id}")
                    .route(web::get().to(events::get_events_by_user))
            )
    )
    .service(
        web::scope("/event")
            .service(
                web::resource("")
                    .route(web::post().to(events::create_event))
            )
            .service(
                web::resource("/{event_id}")
                    .route(web::get().to(events::get_event))
                    .route(web::put().to(events::update_event))
                    .route(web::delete().to(events::delete_event))
            )
    );
}
