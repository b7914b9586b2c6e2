pub mod banner;
pub mod events;
pub mod extractors;
pub mod image_statistics;
pub mod images;
pub mod invitations;
pub mod user_deletion;
pub mod users;
