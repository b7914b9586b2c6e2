use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;

pub static START_TIME: Lazy<DateTime<Utc>> = Lazy::new(Utc::now);

/// Longest lifetime a banner may be scheduled for, measured from creation.
pub const MAX_BANNER_LIFETIME_HOURS: i64 = 72;

pub const MAX_USER_IMAGES: usize = 3;

pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

pub const MIN_SECRET_LEN: usize = 32;

pub const ADMIN_ROLE: &str = "admin";
pub const USER_ROLE: &str = "user";
pub const PARENT_ROLE: &str = "parent";

pub const DEFAULT_USER_NAME: &str = "User";
