use actix_web::{
    body::BoxBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    web, Error, HttpMessage, HttpResponse, ResponseError,
};
use futures_util::future::{ok, Ready, LocalBoxFuture};
use std::{rc::Rc, task::{Context, Poll}};

use crate::{entities::identity::Identity, errors::AuthError, AppState};

/// Resolves the bearer token on every non-public request and attaches the
/// caller's `Identity` to the request extensions.
pub struct AuthMiddleware;

impl<S> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<BoxBody>, Error = Error> + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AuthMiddlewareService {
            service: Rc::new(service),
        })
    }
}

pub struct AuthMiddlewareService<S> {
    service: Rc<S>,
}

impl<S> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<BoxBody>, Error = Error> + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, ctx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);

        Box::pin(async move {
            if is_public_route(req.path(), req.method().as_str()) {
                return service.call(req).await;
            }

            let Some(state) = req.app_data::<web::Data<AppState>>().cloned() else {
                tracing::error!("AppState missing in middleware");
                return Ok(custom_error_response(req, AuthError::MissingIdentityProvider.error_response()));
            };

            let Some(token) = extract_token(&req) else {
                tracing::warn!("Missing or malformed Authorization header");
                return Ok(custom_error_response(req, AuthError::MissingCredentials.error_response()));
            };

            let identity = match state.identity.verify_token(&token).await {
                Ok(identity) => identity,
                Err(e) => {
                    tracing::warn!("Token verification failed: {}", e);
                    return Ok(custom_error_response(req, e.error_response()));
                }
            };

            if let Err(forbidden_response) = enforce_admin_access(req.path(), &identity) {
                return Ok(custom_error_response(req, forbidden_response));
            }

            req.extensions_mut().insert(identity);
            service.call(req).await
        })
    }
}

fn is_public_route(path: &str, method: &str) -> bool {
    if method == "OPTIONS" {
        return true;
    }

    matches!(
        (path, method),
        ("/", "GET") |
        ("/api/banner", "GET")
    )
}

fn extract_token(req: &ServiceRequest) -> Option<String> {
    req.headers()
        .get("Authorization")
        .and_then(|header| header.to_str().ok())
        .and_then(|header| {
            let parts: Vec<&str> = header.split_whitespace().collect();
            if parts.len() == 2 && parts[0].eq_ignore_ascii_case("bearer") {
                Some(parts[1].to_string())
            } else {
                None
            }
        })
}

fn enforce_admin_access(path: &str, identity: &Identity) -> Result<(), HttpResponse> {
    if path.starts_with("/admin") && !identity.admin {
        tracing::warn!(uid = identity.uid, "Admin access required for path: {}", path);
        return Err(
            HttpResponse::Forbidden().json(serde_json::json!({
                "error": "Admin access required"
            }))
        );
    }
    Ok(())
}

fn custom_error_response(req: ServiceRequest, res: HttpResponse) -> ServiceResponse<BoxBody> {
    req.into_response(res)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(admin: bool) -> Identity {
        Identity {
            uid: "u1".into(),
            email: None,
            name: None,
            admin,
        }
    }

    #[test]
    fn banner_reads_and_preflight_are_public() {
        assert!(is_public_route("/api/banner", "GET"));
        assert!(is_public_route("/api/users", "OPTIONS"));
        assert!(is_public_route("/", "GET"));
        assert!(!is_public_route("/api/banner", "POST"));
        assert!(!is_public_route("/api/users", "GET"));
    }

    #[test]
    fn admin_paths_require_the_admin_flag() {
        assert!(enforce_admin_access("/admin/health", &identity(false)).is_err());
        assert!(enforce_admin_access("/admin/health", &identity(true)).is_ok());
        assert!(enforce_admin_access("/api/users", &identity(false)).is_ok());
    }
}
