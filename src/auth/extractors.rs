//! Axum extractors for bearer token authentication.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};

use super::errors::{ApiAuthError, AuthErrorKind};
use super::state::HasAuthBackend;
use super::types::AuthenticatedUser;

/// The token from an `Authorization: Bearer <token>` header.
///
/// `Ok(None)` when there is no header, `Err` when the header is malformed.
fn bearer_token(headers: &HeaderMap) -> Result<Option<&str>, AuthErrorKind> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value.to_str().map_err(|_| AuthErrorKind::InvalidToken)?;
    let (scheme, token) = value
        .split_once(' ')
        .ok_or(AuthErrorKind::InvalidToken)?;
    if !scheme.eq_ignore_ascii_case("bearer") || token.trim().is_empty() {
        return Err(AuthErrorKind::InvalidToken);
    }
    Ok(Some(token.trim()))
}

/// Core authentication logic shared between the extractors.
async fn authenticate_request<S>(
    parts: &Parts,
    state: &S,
) -> Result<AuthenticatedUser, AuthErrorKind>
where
    S: HasAuthBackend + Send + Sync,
{
    let token = bearer_token(&parts.headers)?.ok_or(AuthErrorKind::NotAuthenticated)?;

    let claims = state
        .jwt()
        .validate_access_token(token)
        .map_err(|_| AuthErrorKind::InvalidToken)?;
    let user_id = claims.user_id().map_err(|_| AuthErrorKind::InvalidToken)?;

    // Tokens outlive account deletion by up to their lifetime
    let user = state
        .db()
        .users()
        .get_by_id(user_id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to get user: {}", e);
            AuthErrorKind::DatabaseError
        })?
        .ok_or(AuthErrorKind::UserNotFound)?;

    Ok(AuthenticatedUser {
        user_id: user.id,
        username: user.username,
    })
}

/// Extractor for API endpoints that require authentication.
pub struct ApiAuth(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for ApiAuth
where
    S: HasAuthBackend + Send + Sync,
{
    type Rejection = ApiAuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        authenticate_request(parts, state)
            .await
            .map(ApiAuth)
            .map_err(ApiAuthError::new)
    }
}

/// Optional authentication extractor - never fails.
/// Used by read endpoints that are public but may personalize the result.
pub struct MaybeAuth(pub Option<AuthenticatedUser>);

impl<S> FromRequestParts<S> for MaybeAuth
where
    S: HasAuthBackend + Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeAuth(authenticate_request(parts, state).await.ok()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn with_auth(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token(&HeaderMap::new()), Ok(None));
        assert_eq!(bearer_token(&with_auth("Bearer abc")), Ok(Some("abc")));
        assert_eq!(bearer_token(&with_auth("bearer abc")), Ok(Some("abc")));
        assert_eq!(
            bearer_token(&with_auth("Basic abc")),
            Err(AuthErrorKind::InvalidToken)
        );
        assert_eq!(
            bearer_token(&with_auth("Bearer")),
            Err(AuthErrorKind::InvalidToken)
        );
    }
}
