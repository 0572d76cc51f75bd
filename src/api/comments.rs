//! Comment API endpoints.
//!
//! - GET `/comments` - List comments newest first (`post`, `page`)
//! - POST `/comments` - Comment on a post
//! - GET `/comments/{id}` - Get a comment
//! - PUT/PATCH `/comments/{id}` - Edit your own comment
//! - DELETE `/comments/{id}` - Delete your own comment
//! - POST/DELETE `/comments/{id}/like` - Add or withdraw a like
//! - POST/DELETE `/comments/{id}/dislike` - Add or withdraw a dislike

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use super::error::{ApiError, ResultExt, parse_id};
use super::pagination::PageRequest;
use super::types::{CommentView, ReactionStatus};
use crate::auth::{ApiAuth, AuthenticatedUser};
use crate::db::{Comment, Database, Reaction};
use crate::impl_has_auth_backend;
use crate::jwt::JwtConfig;
use crate::validation::{CommentForm, FieldErrors};

#[derive(Clone)]
pub struct CommentsState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
}

impl_has_auth_backend!(CommentsState);

pub fn router(state: CommentsState) -> Router {
    Router::new()
        .route("/comments", get(list_comments).post(create_comment))
        .route(
            "/comments/{id}",
            get(get_comment)
                .put(update_comment)
                .patch(update_comment)
                .delete(delete_comment),
        )
        .route("/comments/{id}/like", post(like).delete(unlike))
        .route("/comments/{id}/dislike", post(dislike).delete(undislike))
        .with_state(state)
}

#[derive(Deserialize)]
struct CommentQuery {
    post: Option<String>,
    page: Option<String>,
}

#[derive(Deserialize)]
struct NewComment {
    post: Option<i64>,
    #[serde(default)]
    content: String,
}

async fn find(db: &Database, raw_id: &str) -> Result<Comment, ApiError> {
    let id = parse_id(raw_id)?;
    db.comments()
        .get(id)
        .await
        .db_err("Failed to get comment")?
        .ok_or_else(ApiError::not_found)
}

async fn find_owned(
    db: &Database,
    raw_id: &str,
    auth: &AuthenticatedUser,
) -> Result<Comment, ApiError> {
    let comment = find(db, raw_id).await?;
    if comment.user_id != auth.user_id {
        return Err(ApiError::not_owner());
    }
    Ok(comment)
}

async fn list_comments(
    State(state): State<CommentsState>,
    Query(query): Query<CommentQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = PageRequest::parse(query.page.as_deref())?;
    let post_id = match query.post.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(raw.parse::<i64>().map_err(|_| {
            ApiError::from(FieldErrors::single("post", "A valid integer is required."))
        })?),
    };

    let comments = state.db.comments();
    let count = comments
        .count(post_id)
        .await
        .db_err("Failed to count comments")?;
    page.check(count)?;

    let results = comments
        .list(post_id, page.limit(), page.offset())
        .await
        .db_err("Failed to list comments")?;

    Ok(Json(page.into_page(
        count,
        results.into_iter().map(CommentView::from).collect(),
    )))
}

async fn create_comment(
    State(state): State<CommentsState>,
    ApiAuth(auth): ApiAuth,
    Json(payload): Json<NewComment>,
) -> Result<impl IntoResponse, ApiError> {
    let content = CommentForm {
        content: payload.content,
    }
    .validate();

    let mut errors = match &content {
        Ok(_) => FieldErrors::new(),
        Err(errors) => errors.clone(),
    };

    let post = match payload.post {
        None => {
            errors.add("post", "This field is required.");
            None
        }
        Some(post_id) => {
            let post = state
                .db
                .posts()
                .get(post_id)
                .await
                .db_err("Failed to get post")?;
            if post.is_none() {
                errors.add(
                    "post",
                    format!("Invalid pk \"{}\" - object does not exist.", post_id),
                );
            }
            post
        }
    };

    let (Some(post), Ok(content)) = (post, content) else {
        return Err(errors.into());
    };

    let id = state
        .db
        .comments()
        .create(auth.user_id, post.id, &content)
        .await
        .db_err("Failed to create comment")?;

    info!(comment_id = id, post_id = post.id, user_id = auth.user_id, "Created comment");

    let comment = find(&state.db, &id.to_string()).await?;
    Ok((StatusCode::CREATED, Json(CommentView::from(comment))))
}

async fn get_comment(
    State(state): State<CommentsState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let comment = find(&state.db, &id).await?;
    Ok(Json(CommentView::from(comment)))
}

async fn update_comment(
    State(state): State<CommentsState>,
    ApiAuth(auth): ApiAuth,
    Path(id): Path<String>,
    Json(payload): Json<CommentForm>,
) -> Result<impl IntoResponse, ApiError> {
    let comment = find_owned(&state.db, &id, &auth).await?;
    let content = payload.validate()?;

    state
        .db
        .comments()
        .update(comment.id, &content)
        .await
        .db_err("Failed to update comment")?;

    let comment = find(&state.db, &comment.id.to_string()).await?;
    Ok(Json(CommentView::from(comment)))
}

async fn delete_comment(
    State(state): State<CommentsState>,
    ApiAuth(auth): ApiAuth,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let comment = find_owned(&state.db, &id, &auth).await?;

    state
        .db
        .comments()
        .delete(comment.id)
        .await
        .db_err("Failed to delete comment")?;

    info!(comment_id = comment.id, "Deleted comment");
    Ok(StatusCode::NO_CONTENT)
}

/// Apply or withdraw one reaction and report both totals.
async fn react(
    state: &CommentsState,
    auth: &AuthenticatedUser,
    raw_id: &str,
    reaction: Reaction,
    add: bool,
) -> Result<Json<ReactionStatus>, ApiError> {
    let comment = find(&state.db, raw_id).await?;
    let comments = state.db.comments();

    if add {
        comments
            .add_reaction(comment.id, auth.user_id, reaction)
            .await
            .db_err("Failed to add reaction")?;
    } else {
        comments
            .remove_reaction(comment.id, auth.user_id, reaction)
            .await
            .db_err("Failed to remove reaction")?;
    }

    let comment = find(&state.db, raw_id).await?;
    Ok(Json(ReactionStatus {
        total_likes: comment.total_likes,
        total_dislikes: comment.total_dislikes,
    }))
}

async fn like(
    State(state): State<CommentsState>,
    ApiAuth(auth): ApiAuth,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    react(&state, &auth, &id, Reaction::Like, true).await
}

async fn unlike(
    State(state): State<CommentsState>,
    ApiAuth(auth): ApiAuth,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    react(&state, &auth, &id, Reaction::Like, false).await
}

async fn dislike(
    State(state): State<CommentsState>,
    ApiAuth(auth): ApiAuth,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    react(&state, &auth, &id, Reaction::Dislike, true).await
}

async fn undislike(
    State(state): State<CommentsState>,
    ApiAuth(auth): ApiAuth,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    react(&state, &auth, &id, Reaction::Dislike, false).await
}
