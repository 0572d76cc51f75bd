//! Authentication error types.

use axum::response::{IntoResponse, Response};

use crate::api::ApiError;

/// Internal auth error kind used by the core authentication logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    NotAuthenticated,
    InvalidToken,
    UserNotFound,
    DatabaseError,
}

/// Rejection of the API auth extractors.
#[derive(Debug)]
pub struct ApiAuthError {
    pub(super) kind: AuthErrorKind,
}

impl ApiAuthError {
    pub(super) fn new(kind: AuthErrorKind) -> Self {
        Self { kind }
    }
}

impl From<ApiAuthError> for ApiError {
    fn from(err: ApiAuthError) -> Self {
        match err.kind {
            AuthErrorKind::NotAuthenticated => {
                ApiError::unauthorized("Authentication credentials were not provided.")
            }
            AuthErrorKind::InvalidToken => {
                ApiError::invalid_token("Given token not valid for any token type")
            }
            AuthErrorKind::UserNotFound => ApiError::invalid_token("User not found"),
            AuthErrorKind::DatabaseError => ApiError::internal("Database error"),
        }
    }
}

impl IntoResponse for ApiAuthError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}
