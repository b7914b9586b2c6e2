use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use dotenv::dotenv;
use jsonwebtoken::{DecodingKey, EncodingKey};
use std::{env, fmt, path::PathBuf, str::FromStr};
use zeroize::Zeroizing;

use crate::constants::{DEFAULT_MAX_UPLOAD_BYTES, MIN_SECRET_LEN};

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum AppEnvironment {
    Development,
    Production,
    Testing,
}

impl FromStr for AppEnvironment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" => Ok(AppEnvironment::Development),
            "production" => Ok(AppEnvironment::Production),
            "testing" => Ok(AppEnvironment::Testing),
            "legacy" => Err(ConfigError::Message(
                "The legacy environment is no longer functional; use development or production".into(),
            )),
            _ => Err(ConfigError::Message(format!("Invalid environment: {}", s))),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Postgres,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BlobBackend {
    Memory,
    Filesystem,
}

#[derive(Deserialize, Clone)]
#[serde(rename_all = "snake_case")]
pub struct AppConfig {
    #[serde(default = "default_env")]
    pub env: AppEnvironment,

    #[serde(default = "default_name")]
    pub name: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    #[serde(default = "default_storage_backend")]
    pub storage_backend: StorageBackend,

    #[serde(default)]
    pub database_url: String,

    #[serde(default = "default_blob_backend")]
    pub blob_backend: BlobBackend,

    #[serde(default = "default_blob_root")]
    pub blob_root: PathBuf,

    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,

    #[serde(default = "default_cors_origins")]
    pub cors_allowed_origins: Vec<String>,

    #[serde(default)]
    pub identity_secret: String,

    #[serde(default = "default_identity_token_ttl")]
    pub identity_token_ttl_minutes: i64,

    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,

    #[serde(default = "default_sweep_interval")]
    pub deletion_sweep_interval_secs: u64,

    #[serde(default)]
    pub sendgrid_api_key: Option<String>,

    #[serde(default = "default_invite_from_name")]
    pub invite_from_name: String,

    #[serde(default = "default_invite_from_email")]
    pub invite_from_email: String,

    #[serde(default = "default_signup_url")]
    pub signup_url: String,
}

fn default_env() -> AppEnvironment {
    AppEnvironment::Development
}
fn default_name() -> String {
    "Childcare-API".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_worker_count() -> usize {
    num_cpus::get()
}
fn default_storage_backend() -> StorageBackend {
    StorageBackend::Memory
}
fn default_blob_backend() -> BlobBackend {
    BlobBackend::Memory
}
fn default_blob_root() -> PathBuf {
    PathBuf::from("./data/blobs")
}
fn default_public_base_url() -> String {
    "http://127.0.0.1:8080".to_string()
}
fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}
fn default_identity_token_ttl() -> i64 {
    60
}
fn default_max_upload_bytes() -> u64 {
    DEFAULT_MAX_UPLOAD_BYTES
}
fn default_sweep_interval() -> u64 {
    60
}
fn default_invite_from_name() -> String {
    "Childcare".to_string()
}
fn default_invite_from_email() -> String {
    "no-reply@childcare.local".to_string()
}
fn default_signup_url() -> String {
    "http://localhost:3000/signup".to_string()
}

impl AppConfig {
    pub fn new() -> Result<Self, ConfigError> {
        dotenv().ok();

        let raw_env = env::var("APP_ENV").unwrap_or_else(|_| "development".into());
        let env_name = AppEnvironment::from_str(&raw_env)?;

        let builder = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env_name)).required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("cors_allowed_origins")
                    .ignore_empty(true),
            );

        Self::from_config(env_name, builder.build()?)
    }

    /// Deserializes and validates an already assembled `Config`.
    pub fn from_config(env_name: AppEnvironment, source: Config) -> Result<Self, ConfigError> {
        let mut config: Self = source.try_deserialize()?;
        config.env = env_name;

        if config.storage_backend == StorageBackend::Postgres {
            config.database_url = fill_or_env(config.database_url, "DATABASE_URL")?;
        }
        config.identity_secret = fill_or_env(config.identity_secret, "APP_IDENTITY_SECRET")?;

        if config.sendgrid_api_key.as_deref().is_some_and(|k| k.trim().is_empty()) {
            config.sendgrid_api_key = None;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.storage_backend == StorageBackend::Postgres && self.database_url.trim().is_empty() {
            errors.push("DATABASE_URL cannot be empty with the postgres backend");
        }
        if self.identity_secret.len() < MIN_SECRET_LEN {
            errors.push("IDENTITY_SECRET must be at least 32 characters");
        }
        if self.max_upload_bytes == 0 {
            errors.push("MAX_UPLOAD_BYTES must be positive");
        }
        if self.deletion_sweep_interval_secs == 0 {
            errors.push("DELETION_SWEEP_INTERVAL_SECS must be positive");
        }
        if self.is_production() && self.cors_origins().iter().any(|o| o == "*") {
            errors.push("Wildcard CORS (*) is not allowed in production");
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Message(errors.join(", ")))
        }
    }

    pub fn is_production(&self) -> bool {
        self.env == AppEnvironment::Production
    }

    pub fn cors_origins(&self) -> Vec<String> {
        self.cors_allowed_origins
            .iter()
            .flat_map(|origin| origin.split(','))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

fn fill_or_env(current: String, env_key: &str) -> Result<String, ConfigError> {
    if current.trim().is_empty() {
        env::var(env_key).map_err(|_| ConfigError::Message(format!("{env_key} must be set")))
    } else {
        Ok(current)
    }
}

impl fmt::Display for AppEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AppEnvironment::Development => "development",
            AppEnvironment::Production => "production",
            AppEnvironment::Testing => "testing",
        };
        write!(f, "{s}")
    }
}

trait Redact {
    fn redact(&self) -> &str;
}

impl Redact for str {
    fn redact(&self) -> &str {
        if self.is_empty() {
            "[MISSING]"
        } else if self.len() < MIN_SECRET_LEN {
            "[TOO_SHORT]"
        } else {
            "[REDACTED]"
        }
    }
}

impl Redact for String {
    fn redact(&self) -> &str {
        self.as_str().redact()
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("name", &self.name)
            .field("port", &self.port)
            .field("host", &self.host)
            .field("worker_count", &self.worker_count)
            .field("storage_backend", &self.storage_backend)
            .field("database_url", &self.database_url.redact())
            .field("blob_backend", &self.blob_backend)
            .field("blob_root", &self.blob_root)
            .field("public_base_url", &self.public_base_url)
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .field("identity_secret", &self.identity_secret.redact())
            .field("identity_token_ttl_minutes", &self.identity_token_ttl_minutes)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("deletion_sweep_interval_secs", &self.deletion_sweep_interval_secs)
            .field("sendgrid_api_key", &self.sendgrid_api_key.as_deref().map(|k| k.redact()))
            .field("invite_from_email", &self.invite_from_email)
            .finish()
    }
}

#[derive(Clone)]
pub struct IdentityKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
}

impl IdentityKeys {
    pub fn from_secret(secret: &str) -> Self {
        let secret = Zeroizing::new(secret.to_owned());

        IdentityKeys {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

impl From<&AppConfig> for IdentityKeys {
    fn from(config: &AppConfig) -> Self {
        IdentityKeys::from_secret(&config.identity_secret)
    }
}

impl fmt::Debug for IdentityKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityKeys")
            .field("encoding", &"[REDACTED]")
            .field("decoding", &"[REDACTED]")
            .finish()
    }
}
