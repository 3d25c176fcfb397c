use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, Method},
    middleware::Next,
    response::Response,
};

use crate::error::ApiError;
use crate::identity::{bearer_token, IdentityClaims};
use crate::state::AppState;

/// Caller identity verified from the bearer credential.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub sub: String,
    pub email: String,
    pub name: Option<String>,
}

impl From<IdentityClaims> for AuthUser {
    fn from(claims: IdentityClaims) -> Self {
        Self {
            sub: claims.sub,
            email: claims.email,
            name: claims.name,
        }
    }
}

/// Email of the verified caller, if the request carried one.
pub fn actor(user: &Option<axum::Extension<AuthUser>>) -> Option<&str> {
    user.as_ref().map(|u| u.0.email.as_str())
}

/// Verifies the bearer credential on mutating routes when auth is enforced.
/// Reads stay public, as do account creation and login.
pub async fn require_identity(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if !state.config.security.require_auth || !is_protected(request.method(), request.uri().path()) {
        return Ok(next.run(request).await);
    }

    let token = extract_bearer(&headers).map_err(ApiError::unauthorized)?;
    let claims = state.identity.verify(token).await?;
    tracing::debug!(email = %claims.email, "Verified caller");
    request.extensions_mut().insert(AuthUser::from(claims));

    Ok(next.run(request).await)
}

fn is_protected(method: &Method, path: &str) -> bool {
    if !matches!(*method, Method::POST | Method::PUT | Method::PATCH | Method::DELETE) {
        return false;
    }
    let path = path.strip_prefix("/api/v1").unwrap_or(path).trim_end_matches('/');
    !(*method == Method::POST && matches!(path, "/users" | "/users/login"))
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, String> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| "Missing Authorization header".to_string())?
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    bearer_token(value).ok_or_else(|| "Authorization header must use Bearer token format".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn only_mutations_are_protected() {
        assert!(!is_protected(&Method::GET, "/api/v1/properties"));
        assert!(is_protected(&Method::POST, "/api/v1/properties"));
        assert!(is_protected(&Method::PATCH, "/properties/abc"));
        assert!(is_protected(&Method::DELETE, "/requirement/abc"));
        assert!(is_protected(&Method::POST, "/api/v1/users/update"));
    }

    #[test]
    fn account_bootstrap_routes_are_open() {
        assert!(!is_protected(&Method::POST, "/api/v1/users"));
        assert!(!is_protected(&Method::POST, "/users/login"));
        assert!(!is_protected(&Method::POST, "/users/"));
        assert!(is_protected(&Method::DELETE, "/users/abc"));
    }

    #[test]
    fn bearer_header_is_required() {
        let mut headers = HeaderMap::new();
        assert!(extract_bearer(&headers).is_err());

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic Zm9v"));
        assert!(extract_bearer(&headers).is_err());

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer tok-1"));
        assert_eq!(extract_bearer(&headers), Ok("tok-1"));
    }
}
