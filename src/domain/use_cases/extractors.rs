use actix_web::{FromRequest, HttpRequest, HttpMessage};
use futures_util::future::{ready, Ready};

use crate::{entities::identity::Identity, errors::AuthError};

/// Extractor for the verified caller.
/// Returns 401 if the auth middleware did not attach an identity.
/// Usage: add `caller: AuthIdentity` as a handler parameter.
#[derive(Debug)]
pub struct AuthIdentity(pub Identity);

impl FromRequest for AuthIdentity {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut actix_web::dev::Payload) -> Self::Future {
        match req.extensions().get::<Identity>() {
            Some(identity) => ready(Ok(AuthIdentity(identity.clone()))),
            None => ready(Err(AuthError::MissingCredentials.into())),
        }
    }
}

/// Extractor for admin callers.
/// Returns 403 if the caller is not an admin, 401 if unauthenticated.
#[derive(Debug)]
pub struct AdminIdentity(pub Identity);

impl FromRequest for AdminIdentity {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut actix_web::dev::Payload) -> Self::Future {
        match req.extensions().get::<Identity>() {
            Some(identity) if identity.admin => {
                ready(Ok(AdminIdentity(identity.clone())))
            }
            Some(_) => {
                ready(Err(AuthError::Forbidden("Admin access required".into()).into()))
            }
            None => {
                ready(Err(AuthError::MissingCredentials.into()))
            }
        }
    }
}
