//! HTTP client for the JSON API, used by the page layer.
//!
//! Every resource call takes the header map produced by the token bridge so
//! the caller decides which credentials (if any) go out.

use axum::http::{HeaderMap, StatusCode};
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::time::Duration;
use url::Url;

use crate::api::types::{
    CommentView, FollowToggle, LikeStatus, Page, PostView, ProfileView, RegisteredUser,
    TokenPair, UserRef,
};
use crate::bridge::{RefreshOutcome, TokenApi, VerifyOutcome};
use crate::validation::{FieldErrors, ProfileForm};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug)]
pub enum ClientError {
    /// The request never produced a response.
    Transport(reqwest::Error),
    /// The API answered with a non-success status.
    Status { status: StatusCode, body: Value },
    /// A success response had an unexpected body.
    Decode(reqwest::Error),
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// 401 or 403 from the API.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self.status(),
            Some(StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
        )
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }

    /// Field errors from a 400 body.
    pub fn field_errors(&self) -> Option<FieldErrors> {
        match self {
            ClientError::Status { status, body } if *status == StatusCode::BAD_REQUEST => {
                FieldErrors::from_json(body)
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::Transport(e) => write!(f, "API request failed: {}", e),
            ClientError::Status { status, .. } => write!(f, "API returned {}", status),
            ClientError::Decode(e) => write!(f, "Unexpected API response: {}", e),
        }
    }
}

impl std::error::Error for ClientError {}

/// Header carrying the browser's address on calls made on its behalf.
pub const FORWARDED_FOR: &str = "x-forwarded-for";

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
}

impl ApiClient {
    /// `base` is the API root, e.g. `http://127.0.0.1:8000/api`.
    pub fn new(base: Url) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { http, base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// The API root followed by `segments`. Each segment is percent-encoded
    /// on its own, so `/`, `?` and `#` inside one never change the path.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send_raw(request: RequestBuilder) -> Result<reqwest::Response, ClientError> {
        let response = request.send().await.map_err(ClientError::Transport)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.json::<Value>().await.unwrap_or(Value::Null);
        Err(ClientError::Status { status, body })
    }

    async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ClientError> {
        Self::send_raw(request)
            .await?
            .json::<T>()
            .await
            .map_err(ClientError::Decode)
    }

    async fn send_empty(request: RequestBuilder) -> Result<(), ClientError> {
        Self::send_raw(request).await.map(|_| ())
    }

    // --- Tokens ---

    /// Attach the address of the browser this call is made for. The API
    /// rate-limits credential endpoints by it.
    fn forwarded_for(request: RequestBuilder, client_ip: Option<&str>) -> RequestBuilder {
        match client_ip {
            Some(ip) => request.header(FORWARDED_FOR, ip),
            None => request,
        }
    }

    pub async fn obtain_token(
        &self,
        username: &str,
        password: &str,
        client_ip: Option<&str>,
    ) -> Result<TokenPair, ClientError> {
        let request = self
            .http
            .post(self.url(&["token"]))
            .json(&json!({ "username": username, "password": password }));
        Self::send(Self::forwarded_for(request, client_ip)).await
    }

    pub async fn blacklist(&self, refresh: &str) -> Result<(), ClientError> {
        Self::send_empty(
            self.http
                .post(self.url(&["token", "blacklist"]))
                .json(&json!({ "refresh": refresh })),
        )
        .await
    }

    // --- Users ---

    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
        password2: &str,
        client_ip: Option<&str>,
    ) -> Result<RegisteredUser, ClientError> {
        let request = self.http.post(self.url(&["register"])).json(&json!({
            "username": username,
            "email": email,
            "password": password,
            "password2": password2,
        }));
        Self::send(Self::forwarded_for(request, client_ip)).await
    }

    pub async fn search_users(
        &self,
        headers: HeaderMap,
        query: &str,
        page: i64,
    ) -> Result<Page<UserRef>, ClientError> {
        Self::send(
            self.http
                .get(self.url(&["users"]))
                .headers(headers)
                .query(&[("search", query.to_string()), ("page", page.to_string())]),
        )
        .await
    }

    pub async fn change_password(
        &self,
        headers: HeaderMap,
        current: &str,
        new: &str,
        confirm: &str,
    ) -> Result<(), ClientError> {
        Self::send_empty(self.http.post(self.url(&["password"])).headers(headers).json(&json!({
            "current_password": current,
            "new_password": new,
            "confirm_password": confirm,
        })))
        .await
    }

    // --- Profiles ---

    pub async fn get_profile(
        &self,
        headers: HeaderMap,
        username: &str,
    ) -> Result<ProfileView, ClientError> {
        Self::send(
            self.http
                .get(self.url(&["profiles", username]))
                .headers(headers),
        )
        .await
    }

    pub async fn update_profile(
        &self,
        headers: HeaderMap,
        username: &str,
        form: &ProfileForm,
    ) -> Result<ProfileView, ClientError> {
        Self::send(
            self.http
                .patch(self.url(&["profiles", username]))
                .headers(headers)
                .json(form),
        )
        .await
    }

    pub async fn toggle_follow(
        &self,
        headers: HeaderMap,
        username: &str,
    ) -> Result<FollowToggle, ClientError> {
        Self::send(
            self.http
                .post(self.url(&["profiles", username, "follow"]))
                .headers(headers),
        )
        .await
    }

    // --- Posts ---

    pub async fn list_posts(
        &self,
        headers: HeaderMap,
        uploader: Option<&str>,
        page: i64,
    ) -> Result<Page<PostView>, ClientError> {
        let mut query = vec![("page", page.to_string())];
        if let Some(uploader) = uploader {
            query.push(("uploader__username", uploader.to_string()));
        }
        Self::send(self.http.get(self.url(&["posts"])).headers(headers).query(&query)).await
    }

    pub async fn get_post(&self, headers: HeaderMap, id: i64) -> Result<PostView, ClientError> {
        Self::send(self.http.get(self.url(&["posts", id.to_string().as_str()])).headers(headers)).await
    }

    pub async fn create_post(
        &self,
        headers: HeaderMap,
        caption: &str,
        image: Option<&str>,
    ) -> Result<PostView, ClientError> {
        Self::send(
            self.http
                .post(self.url(&["posts"]))
                .headers(headers)
                .json(&json!({ "caption": caption, "image": image })),
        )
        .await
    }

    pub async fn like_post(&self, headers: HeaderMap, id: i64) -> Result<LikeStatus, ClientError> {
        Self::send(
            self.http
                .post(self.url(&["posts", id.to_string().as_str(), "like"]))
                .headers(headers),
        )
        .await
    }

    pub async fn unlike_post(
        &self,
        headers: HeaderMap,
        id: i64,
    ) -> Result<LikeStatus, ClientError> {
        Self::send(
            self.http
                .delete(self.url(&["posts", id.to_string().as_str(), "like"]))
                .headers(headers),
        )
        .await
    }

    // --- Comments ---

    pub async fn list_comments(
        &self,
        headers: HeaderMap,
        post: i64,
        page: i64,
    ) -> Result<Page<CommentView>, ClientError> {
        Self::send(
            self.http
                .get(self.url(&["comments"]))
                .headers(headers)
                .query(&[("post", post), ("page", page)]),
        )
        .await
    }

    pub async fn create_comment(
        &self,
        headers: HeaderMap,
        post: i64,
        content: &str,
    ) -> Result<CommentView, ClientError> {
        Self::send(
            self.http
                .post(self.url(&["comments"]))
                .headers(headers)
                .json(&json!({ "post": post, "content": content })),
        )
        .await
    }
}

impl TokenApi for ApiClient {
    async fn verify(&self, token: &str) -> Result<VerifyOutcome, ClientError> {
        let response = self
            .http
            .post(self.url(&["token", "verify"]))
            .json(&json!({ "token": token }))
            .send()
            .await
            .map_err(ClientError::Transport)?;

        match response.status() {
            s if s.is_success() => Ok(VerifyOutcome::Valid),
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => Ok(VerifyOutcome::Invalid),
            status => Err(ClientError::Status {
                status,
                body: Value::Null,
            }),
        }
    }

    async fn refresh(&self, refresh: &str) -> Result<RefreshOutcome, ClientError> {
        let response = self
            .http
            .post(self.url(&["token", "refresh"]))
            .json(&json!({ "refresh": refresh }))
            .send()
            .await
            .map_err(ClientError::Transport)?;

        let status = response.status();
        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED {
            return Ok(RefreshOutcome::Rejected);
        }
        if !status.is_success() {
            return Err(ClientError::Status {
                status,
                body: Value::Null,
            });
        }

        let body = response.json::<Value>().await.unwrap_or(Value::Null);
        Ok(RefreshOutcome::from_body(&body))
    }
}
