pub mod auth;
pub mod db;
pub mod email;
pub mod storage;
