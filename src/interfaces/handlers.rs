pub mod banner;
pub mod events;
pub mod home;
pub mod images;
pub mod invitations;
pub mod json_error;
pub mod system;
pub mod users;
