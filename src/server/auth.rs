//! Bearer-token extractor for authenticated routes.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use super::api_error::ApiError;
use super::auth_service::{AuthService, AuthServiceTrait};
use super::routes::AppState;

/// The authenticated user id behind an `Authorization: Bearer <token>` header.
///
/// A missing or non-bearer header rejects with 401; an unknown or expired
/// token rejects with 403, which tells the extension to drop its session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser(pub i64);

/// Extracts the token from an `Authorization` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(bearer_token)
            .ok_or_else(|| ApiError::Unauthorized("Bearer token required".to_string()))?;

        let db = state.lock_db()?;
        let user_id = AuthService::new(db.connection(), state.tokens).authenticate(token)?;
        Ok(AuthUser(user_id))
    }
}
