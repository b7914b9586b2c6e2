use std::{fmt, str::FromStr};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{constants::MAX_BANNER_LIFETIME_HOURS, errors::{AppError, FieldError}};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BannerType {
    Weather,
    Closure,
    Custom,
}

impl FromStr for BannerType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "weather" => Ok(BannerType::Weather),
            "closure" => Ok(BannerType::Closure),
            "custom" => Ok(BannerType::Custom),
            other => Err(format!("invalid banner type '{other}': must be weather, closure, or custom")),
        }
    }
}

impl fmt::Display for BannerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BannerType::Weather => "weather",
            BannerType::Closure => "closure",
            BannerType::Custom => "custom",
        };
        write!(f, "{s}")
    }
}

/// The site-wide notice. At most one exists per process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Banner {
    #[serde(rename = "type")]
    pub kind: BannerType,
    pub message: String,
    pub expires_at: DateTime<Utc>,
}

impl Banner {
    pub fn new(kind: BannerType, message: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Banner {
            kind,
            message: message.into(),
            expires_at,
        }
    }

    /// Checks the banner against `now`, reporting every violated field.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), AppError> {
        let errors = schedule_errors(Some(self.kind), &self.message, Some(self.expires_at), now);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::InvalidArgument(errors))
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

fn schedule_errors(
    kind: Option<BannerType>,
    message: &str,
    expires_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Vec<FieldError> {
    let mut errors = Vec::new();

    if kind == Some(BannerType::Custom) && message.trim().is_empty() {
        errors.push(FieldError::new("message", "message is required for custom banner type"));
    }

    if let Some(expires_at) = expires_at {
        if expires_at <= now {
            errors.push(FieldError::new("expiresAt", "expiration time must be in the future"));
        } else if expires_at > now + Duration::hours(MAX_BANNER_LIFETIME_HOURS) {
            errors.push(FieldError::new(
                "expiresAt",
                format!("expiration time cannot be more than {MAX_BANNER_LIFETIME_HOURS} hours in the future"),
            ));
        }
    }

    errors
}

/// Wire shape of `POST /api/banner`. Every field is optional so that missing
/// and malformed values surface as field errors instead of a JSON failure.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BannerRequest {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub message: Option<String>,
    pub expires_at: Option<String>,
}

impl BannerRequest {
    pub fn into_banner(self, now: DateTime<Utc>) -> Result<Banner, AppError> {
        let mut errors = Vec::new();

        let kind = match self.kind.as_deref().map(str::trim) {
            None | Some("") => {
                errors.push(FieldError::new("type", "type is required"));
                None
            }
            Some(raw) => match raw.parse::<BannerType>() {
                Ok(kind) => Some(kind),
                Err(msg) => {
                    errors.push(FieldError::new("type", msg));
                    None
                }
            },
        };

        let expires_at = match self.expires_at.as_deref().map(str::trim) {
            None | Some("") => {
                errors.push(FieldError::new("expiresAt", "expiresAt is required"));
                None
            }
            Some(raw) => match DateTime::parse_from_rfc3339(raw) {
                Ok(ts) => Some(ts.with_timezone(&Utc)),
                Err(_) => {
                    errors.push(FieldError::new("expiresAt", "expiresAt must be an RFC 3339 timestamp"));
                    None
                }
            },
        };

        let message = self.message.unwrap_or_default();
        errors.extend(schedule_errors(kind, &message, expires_at, now));

        match (kind, expires_at) {
            (Some(kind), Some(expires_at)) if errors.is_empty() => {
                Ok(Banner::new(kind, message, expires_at))
            }
            _ => Err(AppError::InvalidArgument(errors)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BannerStatus {
    Empty,
    Active,
    Expired,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(err: AppError) -> Vec<String> {
        match err {
            AppError::InvalidArgument(errors) => errors.into_iter().map(|e| e.field).collect(),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn parses_a_well_formed_request() {
        let now = Utc::now();
        let request = BannerRequest {
            kind: Some("Weather".into()),
            message: None,
            expires_at: Some((now + Duration::hours(2)).to_rfc3339()),
        };

        let banner = request.into_banner(now).unwrap();
        assert_eq!(banner.kind, BannerType::Weather);
        assert!(banner.message.is_empty());
    }

    #[test]
    fn reports_every_violated_field() {
        let now = Utc::now();
        let request = BannerRequest {
            kind: Some("custom".into()),
            message: Some("   ".into()),
            expires_at: Some((now - Duration::minutes(1)).to_rfc3339()),
        };

        assert_eq!(fields(request.into_banner(now).unwrap_err()), vec!["message", "expiresAt"]);
    }

    #[test]
    fn rejects_unknown_type_and_missing_expiry() {
        let request = BannerRequest {
            kind: Some("flood".into()),
            ..Default::default()
        };

        assert_eq!(fields(request.into_banner(Utc::now()).unwrap_err()), vec!["type", "expiresAt"]);
    }

    #[test]
    fn enforces_the_lifetime_ceiling() {
        let now = Utc::now();
        let at_limit = Banner::new(BannerType::Closure, "", now + Duration::hours(MAX_BANNER_LIFETIME_HOURS));
        let past_limit = Banner::new(
            BannerType::Closure,
            "",
            now + Duration::hours(MAX_BANNER_LIFETIME_HOURS) + Duration::seconds(1),
        );

        assert!(at_limit.validate(now).is_ok());
        assert_eq!(fields(past_limit.validate(now).unwrap_err()), vec!["expiresAt"]);
    }

    #[test]
    fn serializes_with_wire_field_names() {
        let expires_at = DateTime::parse_from_rfc3339("2030-01-01T10:00:00Z").unwrap().with_timezone(&Utc);
        let json = serde_json::to_value(Banner::new(BannerType::Closure, "Snow day", expires_at)).unwrap();

        assert_eq!(json["type"], "closure");
        assert_eq!(json["message"], "Snow day");
        assert_eq!(json["expiresAt"], "2030-01-01T10:00:00Z");
    }
}
