//! Follow edge API endpoints.
//!
//! - GET `/follows` - List edges (`follower__username`, `following__username`, `page`)
//! - POST `/follows` - Follow a user by id
//! - GET `/follows/{id}` - Get one edge
//! - DELETE `/follows/{id}` - Remove an edge you own

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use super::error::{ApiError, ResultExt, parse_id};
use super::pagination::PageRequest;
use super::types::FollowView;
use crate::auth::ApiAuth;
use crate::db::{Database, Follow, FollowFilter, FollowOutcome};
use crate::impl_has_auth_backend;
use crate::jwt::JwtConfig;
use crate::validation::FieldErrors;

#[derive(Clone)]
pub struct FollowsState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
}

impl_has_auth_backend!(FollowsState);

pub fn router(state: FollowsState) -> Router {
    Router::new()
        .route("/follows", get(list_follows).post(create_follow))
        .route("/follows/{id}", get(get_follow).delete(delete_follow))
        .with_state(state)
}

#[derive(Deserialize)]
struct FollowQuery {
    #[serde(rename = "follower__username")]
    follower_username: Option<String>,
    #[serde(rename = "following__username")]
    following_username: Option<String>,
    page: Option<String>,
}

#[derive(Deserialize)]
struct NewFollow {
    following: Option<i64>,
}

async fn find(db: &Database, raw_id: &str) -> Result<Follow, ApiError> {
    let id = parse_id(raw_id)?;
    db.follows()
        .get(id)
        .await
        .db_err("Failed to get follow")?
        .ok_or_else(ApiError::not_found)
}

async fn list_follows(
    State(state): State<FollowsState>,
    Query(query): Query<FollowQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = PageRequest::parse(query.page.as_deref())?;
    let filter = FollowFilter {
        follower_username: query.follower_username.filter(|s| !s.is_empty()),
        following_username: query.following_username.filter(|s| !s.is_empty()),
    };

    let follows = state.db.follows();
    let count = follows
        .count(&filter)
        .await
        .db_err("Failed to count follows")?;
    page.check(count)?;

    let results = follows
        .list(&filter, page.limit(), page.offset())
        .await
        .db_err("Failed to list follows")?;

    Ok(Json(page.into_page(
        count,
        results.into_iter().map(FollowView::from).collect(),
    )))
}

/// 201 for a new edge, 200 when it already existed.
async fn create_follow(
    State(state): State<FollowsState>,
    ApiAuth(auth): ApiAuth,
    Json(payload): Json<NewFollow>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(following_id) = payload.following else {
        return Err(FieldErrors::single("following", "This field is required.").into());
    };

    let target = state
        .db
        .users()
        .get_by_id(following_id)
        .await
        .db_err("Failed to get user")?;
    if target.is_none() {
        return Err(FieldErrors::single(
            "following",
            format!("Invalid pk \"{}\" - object does not exist.", following_id),
        )
        .into());
    }

    let (status, id) = match state
        .db
        .follows()
        .follow(auth.user_id, following_id)
        .await
        .db_err("Failed to follow")?
    {
        FollowOutcome::Created(id) => (StatusCode::CREATED, id),
        FollowOutcome::Existing(id) => (StatusCode::OK, id),
        FollowOutcome::SelfFollow => {
            return Err(ApiError::bad_request("You cannot follow yourself."));
        }
    };

    if status == StatusCode::CREATED {
        info!(follower = auth.user_id, following = following_id, "Created follow");
    }

    let follow = find(&state.db, &id.to_string()).await?;
    Ok((status, Json(FollowView::from(follow))))
}

async fn get_follow(
    State(state): State<FollowsState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let follow = find(&state.db, &id).await?;
    Ok(Json(FollowView::from(follow)))
}

async fn delete_follow(
    State(state): State<FollowsState>,
    ApiAuth(auth): ApiAuth,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let follow = find(&state.db, &id).await?;
    if follow.follower_id != auth.user_id {
        return Err(ApiError::not_owner());
    }

    state
        .db
        .follows()
        .delete(follow.id)
        .await
        .db_err("Failed to delete follow")?;

    info!(follow_id = follow.id, "Deleted follow");
    Ok(StatusCode::NO_CONTENT)
}
