pub mod banner;
pub mod deletion;
pub mod event;
pub mod identity;
pub mod image;
pub mod invitation;
pub mod user;
