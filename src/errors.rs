use std::borrow::Cow;
use std::fmt;

use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse
};
use jsonwebtoken::errors::{ErrorKind, Error as JwtError};
use derive_more::Display;
use serde::Serialize;
use validator::ValidationErrors;

/// Coarse classification of every failure the service can surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AppErrorKind {
    InvalidArgument,
    NotFound,
    Conflict,
    Unauthorized,
    Forbidden,
    Dependency,
}

#[derive(Debug)]
pub enum AppError {
    InvalidArgument(Vec<FieldError>),
    NotFound(String),
    Conflict(String),
    Unauthorized(String),
    Forbidden(String),
    Dependency {
        operation: &'static str,
        message: String,
    },
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::InvalidArgument(errors) => {
                let messages = errors.iter()
                    .map(|e| format!("{}:{}", e.field, e.message))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "invalid argument: {}", messages)
            }
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            AppError::Dependency { operation, message } => {
                write!(f, "Dependency failure in {}: {}", operation, message)
            }
        }
    }
}

impl std::error::Error for AppError {}

impl AppError {
    pub fn kind(&self) -> AppErrorKind {
        match self {
            AppError::InvalidArgument(_) => AppErrorKind::InvalidArgument,
            AppError::NotFound(_) => AppErrorKind::NotFound,
            AppError::Conflict(_) => AppErrorKind::Conflict,
            AppError::Unauthorized(_) => AppErrorKind::Unauthorized,
            AppError::Forbidden(_) => AppErrorKind::Forbidden,
            AppError::Dependency { .. } => AppErrorKind::Dependency,
        }
    }

    /// Single-field validation failure.
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        AppError::InvalidArgument(vec![FieldError::new(field, message)])
    }

    /// Wraps an opaque store/client failure with the name of the operation that hit it.
    pub fn dependency(operation: &'static str, err: impl fmt::Display) -> Self {
        AppError::Dependency {
            operation,
            message: err.to_string(),
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let body = match self {
            AppError::InvalidArgument(errors) => {
                serde_json::json!({
                    "error": "Validation failed",
                    "kind": self.kind(),
                    "details": errors
                })
            }
            AppError::Dependency { operation, .. } => {
                tracing::error!(operation, "{}", self);
                serde_json::json!({
                    "error": format!("Internal server error in {}", operation),
                    "kind": self.kind()
                })
            }
            _ => {
                serde_json::json!({"error": self.to_string(), "kind": self.kind()})
            }
        };
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .json(body)
    }

    fn status_code(&self) -> StatusCode {
        match self.kind() {
            AppErrorKind::InvalidArgument => StatusCode::BAD_REQUEST,
            AppErrorKind::NotFound => StatusCode::NOT_FOUND,
            AppErrorKind::Conflict => StatusCode::CONFLICT,
            AppErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            AppErrorKind::Forbidden => StatusCode::FORBIDDEN,
            AppErrorKind::Dependency => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::InvalidArgument(field_errors(&errors))
    }
}

/// Flattens `validator` output into the wire format, sorted by field for stable responses.
fn field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut fields: Vec<FieldError> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(|e| FieldError {
                field: field.to_string(),
                message: e
                    .message
                    .as_ref()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "Invalid value".to_string()),
            })
        })
        .collect();

    fields.sort_by(|a, b| a.field.cmp(&b.field));
    fields
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(e) if e.code() == Some(Cow::Borrowed("23505")) => {
                AppError::Conflict("Record already exists".into())
            }
            sqlx::Error::RowNotFound => AppError::NotFound("Record not found".into()),
            _ => AppError::dependency("database", err)
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Unauthorized(err.to_string())
    }
}

#[derive(Debug, Display)]
pub enum AuthError {
    #[display("Invalid token")]
    InvalidToken,

    #[display("Token expired")]
    TokenExpired,

    #[display("Missing or invalid Authorization header")]
    MissingCredentials,

    #[display("Token is missing the {_0} claim")]
    MissingClaim(&'static str),

    #[display("Token creation error")]
    TokenCreation,

    #[display("Identity provider unavailable")]
    MissingIdentityProvider,

    #[display("Forbidden: {_0}")]
    Forbidden(String),
}

impl ResponseError for AuthError {
    fn error_response(&self) -> HttpResponse {
        let error_message = match self {
            AuthError::TokenExpired => {
                "Your session is invalid or has expired. Please sign in again.".to_string()
            }
            _ => self.to_string(),
        };
        HttpResponse::build(self.status_code())
            .json(serde_json::json!({"error": error_message}))
    }

    fn status_code(&self) -> StatusCode {
        match *self {
            AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
            AuthError::TokenExpired => StatusCode::UNAUTHORIZED,
            AuthError::MissingCredentials => StatusCode::UNAUTHORIZED,
            AuthError::MissingClaim(_) => StatusCode::UNAUTHORIZED,
            AuthError::TokenCreation => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::MissingIdentityProvider => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::Forbidden(_) => StatusCode::FORBIDDEN,
        }
    }
}

impl From<JwtError> for AuthError {
    fn from(e: JwtError) -> Self {
        match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        FieldError {
            field: field.to_string(),
            message: message.into(),
        }
    }
}
