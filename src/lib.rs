use std::sync::Arc;

mod domain;
mod interfaces;
mod infrastructure;
pub mod errors;
pub mod settings;
pub mod constants;
pub mod graceful_shutdown;
pub mod background_task;
pub mod shared_repos;

pub use domain::{entities, use_cases};
pub use interfaces::{handlers, repositories, middlewares, routes};
pub use infrastructure::{auth, db, email, storage};

use repositories::{email::EmailService, identity::IdentityProvider};
use settings::AppConfig;
use shared_repos::SharedRepositories;
use use_cases::{
    banner::BannerManager,
    events::EventHandler,
    image_statistics::ImageStatisticsTracker,
    images::ImageHandler,
    invitations::InvitationHandler,
    user_deletion::UserDeletionCoordinator,
    users::UserHandler,
};

pub struct AppState {
    pub banner: BannerManager,
    pub user_handler: UserHandler,
    pub event_handler: EventHandler,
    pub image_handler: ImageHandler,
    pub invitation_handler: InvitationHandler,
    pub deletion: UserDeletionCoordinator,
    pub identity: Arc<dyn IdentityProvider>,
    pub repos: SharedRepositories,
}

impl AppState {
    pub fn new(
        config: &AppConfig,
        repos: SharedRepositories,
        identity: Arc<dyn IdentityProvider>,
        email: Arc<dyn EmailService>,
    ) -> Self {
        let deletion = UserDeletionCoordinator::new(
            repos.users.clone(),
            repos.events.clone(),
            repos.blobs.clone(),
            repos.deletions.clone(),
        );

        let user_handler = UserHandler::new(
            repos.users.clone(),
            repos.invitations.clone(),
            identity.clone(),
            deletion.clone(),
        );
        let event_handler = EventHandler::new(repos.events.clone(), repos.users.clone());
        let image_handler = ImageHandler::new(
            repos.users.clone(),
            repos.blobs.clone(),
            Arc::new(ImageStatisticsTracker::new(config.max_upload_bytes)),
            config.public_base_url.clone(),
        );
        let invitation_handler = InvitationHandler::new(
            repos.invitations.clone(),
            email,
            identity.clone(),
        );

        AppState {
            banner: BannerManager::new(),
            user_handler,
            event_handler,
            image_handler,
            invitation_handler,
            deletion,
            identity,
            repos,
        }
    }
}
