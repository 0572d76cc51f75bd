//! Post API endpoints.
//!
//! - GET `/posts` - List posts newest first (`uploader__username`, `search`, `page`)
//! - POST `/posts` - Create a post
//! - GET `/posts/{id}` - Get a post
//! - PUT/PATCH `/posts/{id}` - Edit your own post
//! - DELETE `/posts/{id}` - Delete your own post
//! - POST/DELETE `/posts/{id}/like` - Like or unlike a post

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
use super::types::{LikeStatus, PostView};
use crate::auth::{ApiAuth, AuthenticatedUser};
use crate::db::{Database, Post, PostFilter};
use crate::impl_has_auth_backend;
use crate::jwt::JwtConfig;
use crate::validation::{CleanPost, PostForm};

#[derive(Clone)]
pub struct PostsState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
}

impl_has_auth_backend!(PostsState);

pub fn router(state: PostsState) -> Router {
    Router::new()
        .route("/posts", get(list_posts).post(create_post))
        .route(
            "/posts/{id}",
            get(get_post)
                .put(replace_post)
                .patch(patch_post)
                .delete(delete_post),
        )
        .route("/posts/{id}/like", post(like_post).delete(unlike_post))
        .with_state(state)
}

#[derive(Deserialize)]
struct PostQuery {
    #[serde(rename = "uploader__username")]
    uploader_username: Option<String>,
    search: Option<String>,
    page: Option<String>,
}

/// Partial update body. Absent fields keep their value; an empty image clears it.
#[derive(Deserialize)]
struct PostPatch {
    caption: Option<String>,
    image: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

async fn find(db: &Database, raw_id: &str) -> Result<Post, ApiError> {
    let id = parse_id(raw_id)?;
    db.posts()
        .get(id)
        .await
        .db_err("Failed to get post")?
        .ok_or_else(ApiError::not_found)
}

/// Load a post the caller is allowed to modify.
async fn find_owned(db: &Database, raw_id: &str, auth: &AuthenticatedUser) -> Result<Post, ApiError> {
    let post = find(db, raw_id).await?;
    if post.uploader_id != auth.user_id {
        return Err(ApiError::not_owner());
    }
    Ok(post)
}

async fn list_posts(
    State(state): State<PostsState>,
    Query(query): Query<PostQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = PageRequest::parse(query.page.as_deref())?;
    let filter = PostFilter {
        uploader_username: non_empty(query.uploader_username),
        search: non_empty(query.search),
    };

    let posts = state.db.posts();
    let count = posts.count(&filter).await.db_err("Failed to count posts")?;
    page.check(count)?;

    let results = posts
        .list(&filter, page.limit(), page.offset())
        .await
        .db_err("Failed to list posts")?;

    Ok(Json(page.into_page(
        count,
        results.into_iter().map(PostView::from).collect(),
    )))
}

async fn create_post(
    State(state): State<PostsState>,
    ApiAuth(auth): ApiAuth,
    Json(payload): Json<PostForm>,
) -> Result<impl IntoResponse, ApiError> {
    let CleanPost { caption, image } = payload.validate()?;

    let id = state
        .db
        .posts()
        .create(auth.user_id, &caption, image.as_deref())
        .await
        .db_err("Failed to create post")?;

    info!(post_id = id, user_id = auth.user_id, "Created post");

    let post = find(&state.db, &id.to_string()).await?;
    Ok((StatusCode::CREATED, Json(PostView::from(post))))
}

async fn get_post(
    State(state): State<PostsState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let post = find(&state.db, &id).await?;
    Ok(Json(PostView::from(post)))
}

async fn save(state: &PostsState, post: Post, form: PostForm) -> Result<Json<PostView>, ApiError> {
    let CleanPost { caption, image } = form.validate()?;

    state
        .db
        .posts()
        .update(post.id, &caption, image.as_deref())
        .await
        .db_err("Failed to update post")?;

    info!(post_id = post.id, "Updated post");

    let post = find(&state.db, &post.id.to_string()).await?;
    Ok(Json(PostView::from(post)))
}

async fn replace_post(
    State(state): State<PostsState>,
    ApiAuth(auth): ApiAuth,
    Path(id): Path<String>,
    Json(payload): Json<PostForm>,
) -> Result<impl IntoResponse, ApiError> {
    let post = find_owned(&state.db, &id, &auth).await?;
    save(&state, post, payload).await
}

async fn patch_post(
    State(state): State<PostsState>,
    ApiAuth(auth): ApiAuth,
    Path(id): Path<String>,
    Json(payload): Json<PostPatch>,
) -> Result<impl IntoResponse, ApiError> {
    let post = find_owned(&state.db, &id, &auth).await?;
    let form = PostForm {
        caption: payload.caption.unwrap_or_else(|| post.caption.clone()),
        image: payload.image.or_else(|| post.image.clone()),
    };
    save(&state, post, form).await
}

async fn delete_post(
    State(state): State<PostsState>,
    ApiAuth(auth): ApiAuth,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let post = find_owned(&state.db, &id, &auth).await?;

    state
        .db
        .posts()
        .delete(post.id)
        .await
        .db_err("Failed to delete post")?;

    info!(post_id = post.id, "Deleted post");
    Ok(StatusCode::NO_CONTENT)
}

async fn like_post(
    State(state): State<PostsState>,
    ApiAuth(auth): ApiAuth,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let post = find(&state.db, &id).await?;
    let likes = state.db.likes();

    let created = likes
        .like(auth.user_id, post.id)
        .await
        .db_err("Failed to like post")?;
    let total_likes = likes
        .total_likes(post.id)
        .await
        .db_err("Failed to count likes")?;

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((
        status,
        Json(LikeStatus {
            liked: true,
            total_likes,
        }),
    ))
}

async fn unlike_post(
    State(state): State<PostsState>,
    ApiAuth(auth): ApiAuth,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let post = find(&state.db, &id).await?;
    let likes = state.db.likes();

    likes
        .unlike(auth.user_id, post.id)
        .await
        .db_err("Failed to unlike post")?;
    let total_likes = likes
        .total_likes(post.id)
        .await
        .db_err("Failed to count likes")?;

    Ok(Json(LikeStatus {
        liked: false,
        total_likes,
    }))
}
