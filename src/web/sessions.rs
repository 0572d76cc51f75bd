//! Loading and saving page sessions.
//!
//! The `sessionid` cookie names a row in the sessions table. Handlers take a
//! [`Session`] as an extractor, mutate it, and hand it back to [`commit`]
//! together with their response.

use axum::{
    extract::FromRequestParts,
    http::{HeaderValue, header, request::Parts},
    response::Response,
};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use std::convert::Infallible;
use tracing::{error, warn};

use super::WebState;
use crate::auth::{clear_cookie, get_cookie, set_cookie};
use crate::session::{Session, SessionData};

pub const SESSION_COOKIE: &str = "sessionid";

/// Matches the refresh token lifetime.
const SESSION_MAX_AGE_SECS: u64 = 14 * 24 * 60 * 60;

/// Generate a random 256-bit session id as base64url.
pub fn new_session_id() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

impl FromRequestParts<WebState> for Session {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &WebState,
    ) -> Result<Self, Self::Rejection> {
        let Some(id) = get_cookie(&parts.headers, SESSION_COOKIE) else {
            return Ok(Session::new());
        };

        let raw = match state.db.sessions().load(id).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Ok(Session::new()),
            Err(e) => {
                error!("Failed to load session: {}", e);
                return Ok(Session::new());
            }
        };

        match serde_json::from_str::<SessionData>(&raw) {
            Ok(data) => Ok(Session::restore(id.to_string(), data)),
            Err(e) => {
                warn!("Discarding unreadable session: {}", e);
                Ok(Session::new())
            }
        }
    }
}

fn append_cookie(response: &mut Response, cookie: &str) {
    match HeaderValue::from_str(cookie) {
        Ok(value) => {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
        Err(e) => error!("Invalid session cookie: {}", e),
    }
}

/// Persist `session` if it changed and attach the cookie to `response`.
///
/// A flushed session loses its row. Anything written after the flush (a
/// goodbye flash, say) is saved under a fresh id.
pub async fn commit(state: &WebState, session: Session, mut response: Response) -> Response {
    let store = state.db.sessions();
    let mut id = session.id().map(str::to_string);

    if session.is_flushed() {
        if let Some(old) = id.take() {
            if let Err(e) = store.delete(&old).await {
                error!("Failed to delete session: {}", e);
            }
        }
        if *session.data() == SessionData::default() {
            append_cookie(
                &mut response,
                &clear_cookie(SESSION_COOKIE, state.secure_cookies),
            );
            return response;
        }
    } else if !session.is_modified() {
        return response;
    }

    let id = id.unwrap_or_else(new_session_id);
    let data = match serde_json::to_string(session.data()) {
        Ok(data) => data,
        Err(e) => {
            error!("Failed to serialize session: {}", e);
            return response;
        }
    };

    if let Err(e) = store.save(&id, &data).await {
        error!("Failed to save session: {}", e);
        return response;
    }

    append_cookie(
        &mut response,
        &set_cookie(SESSION_COOKIE, &id, SESSION_MAX_AGE_SECS, state.secure_cookies),
    );
    response
}
