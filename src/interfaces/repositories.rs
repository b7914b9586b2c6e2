pub mod blob;
pub mod deletion;
pub mod email;
pub mod event;
pub mod identity;
pub mod invitation;
pub mod memory_repo;
pub mod sqlx_repo;
pub mod user;
