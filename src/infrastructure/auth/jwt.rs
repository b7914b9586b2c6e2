use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use dashmap::DashSet;
use jsonwebtoken::{decode, encode, Algorithm, Header, Validation};

use crate::{
    entities::{identity::{Claims, Identity}, invitation::normalize_email},
    errors::{AppError, AuthError},
    repositories::identity::IdentityProvider,
    settings::{AppConfig, IdentityKeys},
};

const JWT_ALGORITHM: Algorithm = Algorithm::HS512;

/// Identity provider backed by HS512-signed tokens. A caller is admin when the
/// token says so or when their email is in the admin registry.
#[derive(Clone)]
pub struct JwtIdentityProvider {
    keys: IdentityKeys,
    token_ttl: Duration,
    admin_emails: Arc<DashSet<String>>,
}

impl JwtIdentityProvider {
    pub fn new(config: &AppConfig) -> Self {
        JwtIdentityProvider {
            keys: IdentityKeys::from(config),
            token_ttl: Duration::minutes(config.identity_token_ttl_minutes),
            admin_emails: Arc::new(DashSet::new()),
        }
    }

    pub fn with_secret(secret: &str, token_ttl: Duration) -> Self {
        JwtIdentityProvider {
            keys: IdentityKeys::from_secret(secret),
            token_ttl,
            admin_emails: Arc::new(DashSet::new()),
        }
    }

    pub fn issue_token(
        &self,
        uid: &str,
        email: Option<&str>,
        name: Option<&str>,
        admin: bool,
    ) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: uid.to_string(),
            email: email.map(str::to_string),
            name: name.map(str::to_string),
            admin,
            exp: (now + self.token_ttl).timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        encode(&Header::new(JWT_ALGORITHM), &claims, &self.keys.encoding)
            .map_err(|_| AuthError::TokenCreation)
    }

    pub fn decode_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(JWT_ALGORITHM);
        validation.validate_exp = true;

        decode::<Claims>(token, &self.keys.decoding, &validation)
            .map(|data| data.claims)
            .map_err(AuthError::from)
    }

    pub fn is_registered_admin(&self, email: &str) -> bool {
        self.admin_emails.contains(&normalize_email(email))
    }
}

#[async_trait]
impl IdentityProvider for JwtIdentityProvider {
    async fn verify_token(&self, token: &str) -> Result<Identity, AuthError> {
        let claims = self.decode_token(token)?;
        if claims.sub.trim().is_empty() {
            return Err(AuthError::MissingClaim("sub"));
        }

        let admin = claims.admin
            || claims.email.as_deref().is_some_and(|email| self.is_registered_admin(email));

        Ok(Identity {
            uid: claims.sub,
            email: claims.email,
            name: claims.name,
            admin,
        })
    }

    async fn set_admin_claim(&self, email: &str) -> Result<(), AppError> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(AppError::invalid("email", "Email is required"));
        }
        if self.admin_emails.insert(email.clone()) {
            tracing::info!(email, "Admin claim set");
        }
        Ok(())
    }
}
