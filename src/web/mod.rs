//! Server-rendered pages.
//!
//! Pages hold no data of their own: they keep credentials in the session and
//! call the JSON API over HTTP with headers from the token bridge.

mod account;
mod posts;
mod profiles;
pub mod render;
pub mod sessions;

use axum::{
    Router,
    http::{HeaderMap, header},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use tracing::warn;
use url::Url;

use crate::bridge::get_auth_headers;
use crate::client::{ApiClient, ClientError};
use crate::db::Database;
use crate::session::{Level, Session};

pub use sessions::SESSION_COOKIE;

pub const SESSION_EXPIRED: &str = "Session expired. Please log in again.";

#[derive(Clone)]
pub struct WebState {
    pub db: Database,
    pub api: ApiClient,
    pub secure_cookies: bool,
}

pub fn router(state: WebState) -> Router {
    Router::new()
        .route("/", get(|| async { Redirect::to("/feed") }))
        .route("/register", get(account::register_form).post(account::register))
        .route("/login", get(account::login_form).post(account::login))
        .route("/logout", post(account::logout))
        .route(
            "/change-password",
            get(account::change_password_form).post(account::change_password),
        )
        .route("/feed", get(posts::feed))
        .route(
            "/create-post",
            get(posts::create_post_form).post(posts::create_post),
        )
        .route("/post/{id}", get(posts::post_detail))
        .route("/post/{id}/comment", post(posts::add_comment))
        .route("/posts/{id}/like", post(posts::like))
        .route("/posts/{id}/unlike", post(posts::unlike))
        .route(
            "/profile/{username}",
            get(profiles::profile).post(profiles::toggle_follow),
        )
        .route(
            "/edit-profile",
            get(profiles::edit_profile_form).post(profiles::edit_profile),
        )
        .route("/search", get(profiles::search))
        .with_state(state)
}

pub(crate) fn to_login() -> Response {
    Redirect::to("/login").into_response()
}

/// Headers for a login-required page, or the redirect to send instead.
pub(crate) async fn require_login(
    state: &WebState,
    session: &mut Session,
) -> Result<HeaderMap, Response> {
    if session.username().is_none() {
        return Err(to_login());
    }

    let headers = get_auth_headers(session, &state.api).await;
    if headers.is_empty() {
        session.flash(Level::Error, SESSION_EXPIRED);
        return Err(to_login());
    }
    Ok(headers)
}

/// Flash a failed API call. Returns the login redirect for 401/403.
pub(crate) fn api_failure(session: &mut Session, err: &ClientError, message: &str) -> Option<Response> {
    if err.is_auth_failure() {
        session.flash(Level::Error, SESSION_EXPIRED);
        return Some(to_login());
    }
    warn!(error = %err, "{}", message);
    session.flash(Level::Error, message);
    None
}

/// Redirect to the path of the Referer header, or `fallback`.
pub(crate) fn redirect_back(headers: &HeaderMap, fallback: &str) -> Response {
    let target = headers
        .get(header::REFERER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Url::parse(v).ok())
        .map(|url| match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        })
        .unwrap_or_else(|| fallback.to_string());
    Redirect::to(&target).into_response()
}
