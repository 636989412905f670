use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::debug;

use super::{claims::UserContext, jwt::JwtKeys};
use crate::response::ApiError;

/// Authentication gate. Extracts and validates the bearer JWT, yielding the caller's context.
///
/// Must precede any body extractor so that a rejected request never reaches the handler.
#[derive(Debug, Clone)]
pub struct AuthUser(pub UserContext);

/// Splits `Bearer <token>`: exactly one scheme prefix followed by a single non-empty token.
pub(crate) fn bearer_token(header: &str) -> Option<&str> {
    let token = header.strip_prefix("Bearer ")?;
    if token.is_empty() || token.contains(char::is_whitespace) {
        return None;
    }
    Some(token)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .ok_or_else(|| {
                ApiError::unauthorized("Authorization header required")
                    .with_cause("missing Authorization header")
            })?
            .to_str()
            .map_err(|e| ApiError::unauthorized("Invalid authorization header").with_cause(e))?;

        let token = bearer_token(header).ok_or_else(|| {
            ApiError::unauthorized("Invalid authorization header").with_cause("expected Bearer <token>")
        })?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys
            .verify(token)
            .map_err(|e| ApiError::unauthorized("Invalid token").with_cause(e))?;

        debug!(user_id = %claims.id, "request authenticated");
        Ok(AuthUser(claims.into()))
    }
}
