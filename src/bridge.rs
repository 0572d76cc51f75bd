//! Session token bridge.
//!
//! Turns the credentials held in a [`Session`] into the headers for an API
//! call. An expired access token is refreshed silently; when that is not
//! possible the caller gets an empty header map and proceeds unauthenticated.
//!
//! ```text
//! NoCredentials --login--> Authenticated
//! Authenticated --verify ok--> Authenticated
//! Authenticated --verify fails, refresh ok--> Authenticated (new access token)
//! Authenticated --verify fails, refresh rejected or absent--> NoCredentials
//! ```
//!
//! Transport failures and unexpected statuses never reach the caller. They
//! yield empty headers and leave the session as it was, so a flaky API does
//! not log anyone out.

use std::future::Future;

use axum::http::{HeaderMap, HeaderValue, header};
use serde_json::Value;
use tracing::{debug, warn};

use crate::client::ClientError;
use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyOutcome {
    Valid,
    Invalid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// New access token, plus a new refresh token if the API rotated it.
    Refreshed {
        access: String,
        refresh: Option<String>,
    },
    /// The refresh token is invalid, expired or blacklisted.
    Rejected,
}

impl RefreshOutcome {
    /// Read a 2xx refresh body. A body without `access` counts as a rejection.
    pub fn from_body(body: &Value) -> Self {
        match body.get("access").and_then(Value::as_str) {
            Some(access) if !access.is_empty() => RefreshOutcome::Refreshed {
                access: access.to_string(),
                refresh: body
                    .get("refresh")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            },
            _ => RefreshOutcome::Rejected,
        }
    }
}

/// Token endpoints the bridge talks to.
///
/// `Err` means the API could not give a definite answer.
pub trait TokenApi {
    fn verify(&self, token: &str) -> impl Future<Output = Result<VerifyOutcome, ClientError>> + Send;

    fn refresh(
        &self,
        refresh: &str,
    ) -> impl Future<Output = Result<RefreshOutcome, ClientError>> + Send;
}

/// Produce the headers for an API call on behalf of `session`.
///
/// Returns either `Authorization: Bearer <token>` or an empty map. Updates the
/// session when a token is refreshed and clears both tokens when the session
/// can no longer authenticate.
pub async fn get_auth_headers<A: TokenApi + Sync>(session: &mut Session, api: &A) -> HeaderMap {
    let Some(access) = session.access_token().map(str::to_string) else {
        return HeaderMap::new();
    };

    match api.verify(&access).await {
        Ok(VerifyOutcome::Valid) => return bearer(&access),
        Ok(VerifyOutcome::Invalid) => {}
        Err(e) => {
            warn!(error = %e, "Token verification unavailable");
            return HeaderMap::new();
        }
    }

    let Some(refresh) = session.refresh_token().map(str::to_string) else {
        debug!("Access token invalid and no refresh token, clearing session tokens");
        session.clear_tokens();
        return HeaderMap::new();
    };

    match api.refresh(&refresh).await {
        Ok(RefreshOutcome::Refreshed {
            access,
            refresh: rotated,
        }) => {
            let headers = bearer(&access);
            session.set_access_token(access);
            if let Some(rotated) = rotated {
                session.set_refresh_token(rotated);
            }
            headers
        }
        Ok(RefreshOutcome::Rejected) => {
            warn!("Refresh token rejected, clearing session tokens");
            session.clear_tokens();
            HeaderMap::new()
        }
        Err(e) => {
            warn!(error = %e, "Token refresh unavailable");
            HeaderMap::new()
        }
    }
}

fn bearer(token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    match HeaderValue::from_str(&format!("Bearer {}", token)) {
        Ok(value) => {
            headers.insert(header::AUTHORIZATION, value);
        }
        Err(_) => warn!("Access token is not a valid header value"),
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use serde_json::json;
    use std::sync::Mutex;

    /// Scripted token API that records every call.
    #[derive(Default)]
    struct MockApi {
        valid_access: Vec<&'static str>,
        verify_down: bool,
        refresh_result: Option<Result<RefreshOutcome, StatusCode>>,
        calls: Mutex<Vec<String>>,
    }

    impl MockApi {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl TokenApi for MockApi {
        async fn verify(&self, token: &str) -> Result<VerifyOutcome, ClientError> {
            self.calls.lock().unwrap().push(format!("verify:{}", token));
            if self.verify_down {
                return Err(ClientError::Status {
                    status: StatusCode::SERVICE_UNAVAILABLE,
                    body: Value::Null,
                });
            }
            if self.valid_access.contains(&token) {
                Ok(VerifyOutcome::Valid)
            } else {
                Ok(VerifyOutcome::Invalid)
            }
        }

        async fn refresh(&self, refresh: &str) -> Result<RefreshOutcome, ClientError> {
            self.calls.lock().unwrap().push(format!("refresh:{}", refresh));
            match self.refresh_result.clone() {
                Some(Ok(outcome)) => Ok(outcome),
                Some(Err(status)) => Err(ClientError::Status {
                    status,
                    body: Value::Null,
                }),
                None => Ok(RefreshOutcome::Rejected),
            }
        }
    }

    fn auth_value(headers: &HeaderMap) -> Option<&str> {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
    }

    #[tokio::test]
    async fn test_no_access_token_makes_no_calls() {
        let api = MockApi::default();
        let mut session = Session::with_tokens(None, Some("good-refresh"));

        let headers = get_auth_headers(&mut session, &api).await;

        assert!(headers.is_empty());
        assert!(api.calls().is_empty());
        assert_eq!(session.refresh_token(), Some("good-refresh"));
    }

    #[tokio::test]
    async fn test_valid_access_token_is_used_unchanged() {
        let api = MockApi {
            valid_access: vec!["good-access"],
            ..Default::default()
        };
        let mut session = Session::with_tokens(Some("good-access"), Some("good-refresh"));

        let first = get_auth_headers(&mut session, &api).await;
        let second = get_auth_headers(&mut session, &api).await;

        assert_eq!(auth_value(&first), Some("Bearer good-access"));
        assert_eq!(first, second);
        assert_eq!(api.calls(), vec!["verify:good-access", "verify:good-access"]);
        assert!(!session.is_modified());
    }

    #[tokio::test]
    async fn test_expired_access_without_refresh_clears_session() {
        let api = MockApi::default();
        let mut session = Session::with_tokens(Some("expired-token"), None);

        let headers = get_auth_headers(&mut session, &api).await;

        assert!(headers.is_empty());
        assert!(session.access_token().is_none());
        assert!(session.refresh_token().is_none());
        assert_eq!(api.calls(), vec!["verify:expired-token"]);
    }

    #[tokio::test]
    async fn test_expired_access_is_refreshed() {
        let api = MockApi {
            refresh_result: Some(Ok(RefreshOutcome::from_body(&json!({"access": "new-token"})))),
            ..Default::default()
        };
        let mut session = Session::with_tokens(Some("expired-token"), Some("good-refresh"));

        let headers = get_auth_headers(&mut session, &api).await;

        assert_eq!(auth_value(&headers), Some("Bearer new-token"));
        assert_eq!(session.access_token(), Some("new-token"));
        assert_eq!(session.refresh_token(), Some("good-refresh"));
        assert_eq!(
            api.calls(),
            vec!["verify:expired-token", "refresh:good-refresh"]
        );
    }

    #[tokio::test]
    async fn test_rotated_refresh_token_is_stored() {
        let api = MockApi {
            refresh_result: Some(Ok(RefreshOutcome::Refreshed {
                access: "new-token".into(),
                refresh: Some("new-refresh".into()),
            })),
            ..Default::default()
        };
        let mut session = Session::with_tokens(Some("expired-token"), Some("good-refresh"));

        get_auth_headers(&mut session, &api).await;

        assert_eq!(session.refresh_token(), Some("new-refresh"));
    }

    #[tokio::test]
    async fn test_rejected_refresh_clears_session() {
        let api = MockApi {
            refresh_result: Some(Ok(RefreshOutcome::Rejected)),
            ..Default::default()
        };
        let mut session = Session::with_tokens(Some("expired-token"), Some("bad-refresh"));

        let headers = get_auth_headers(&mut session, &api).await;

        assert!(headers.is_empty());
        assert!(session.access_token().is_none());
        assert!(session.refresh_token().is_none());
    }

    #[tokio::test]
    async fn test_refresh_body_without_access_is_a_rejection() {
        assert_eq!(RefreshOutcome::from_body(&json!({})), RefreshOutcome::Rejected);
        assert_eq!(
            RefreshOutcome::from_body(&json!({"access": ""})),
            RefreshOutcome::Rejected
        );

        let api = MockApi {
            refresh_result: Some(Ok(RefreshOutcome::from_body(&json!({"detail": "ok"})))),
            ..Default::default()
        };
        let mut session = Session::with_tokens(Some("expired-token"), Some("good-refresh"));

        assert!(get_auth_headers(&mut session, &api).await.is_empty());
        assert!(session.refresh_token().is_none());
    }

    #[tokio::test]
    async fn test_unavailable_verify_keeps_session() {
        let api = MockApi {
            verify_down: true,
            ..Default::default()
        };
        let mut session = Session::with_tokens(Some("some-token"), Some("good-refresh"));

        let headers = get_auth_headers(&mut session, &api).await;

        assert!(headers.is_empty());
        assert_eq!(session.access_token(), Some("some-token"));
        assert_eq!(session.refresh_token(), Some("good-refresh"));
        assert_eq!(api.calls(), vec!["verify:some-token"]);
    }

    #[tokio::test]
    async fn test_unavailable_refresh_keeps_session() {
        let api = MockApi {
            refresh_result: Some(Err(StatusCode::INTERNAL_SERVER_ERROR)),
            ..Default::default()
        };
        let mut session = Session::with_tokens(Some("expired-token"), Some("good-refresh"));

        let headers = get_auth_headers(&mut session, &api).await;

        assert!(headers.is_empty());
        assert_eq!(session.access_token(), Some("expired-token"));
        assert_eq!(session.refresh_token(), Some("good-refresh"));
    }
}
