mod comments;
mod error;
mod follows;
pub mod pagination;
mod posts;
mod profiles;
mod tokens;
pub mod types;
mod users;

use axum::Router;
use std::sync::Arc;

use crate::db::Database;
use crate::jwt::JwtConfig;
use crate::rate_limit::RateLimitConfig;

pub use error::{ApiError, parse_id};

/// Create the API router. Paths are relative to the mount point (`/api`).
pub fn create_api_router(
    db: Database,
    jwt: Arc<JwtConfig>,
    rate_limit_config: Arc<RateLimitConfig>,
) -> Router {
    let tokens_state = tokens::TokensState {
        db: db.clone(),
        jwt: jwt.clone(),
        rate_limit_config: rate_limit_config.clone(),
    };

    let users_state = users::UsersState {
        db: db.clone(),
        jwt: jwt.clone(),
        rate_limit_config,
    };

    let profiles_state = profiles::ProfilesState {
        db: db.clone(),
        jwt: jwt.clone(),
    };

    let posts_state = posts::PostsState {
        db: db.clone(),
        jwt: jwt.clone(),
    };

    let comments_state = comments::CommentsState {
        db: db.clone(),
        jwt: jwt.clone(),
    };

    let follows_state = follows::FollowsState { db, jwt };

    Router::new()
        .merge(tokens::router(tokens_state))
        .merge(users::router(users_state))
        .merge(profiles::router(profiles_state))
        .merge(posts::router(posts_state))
        .merge(comments::router(comments_state))
        .merge(follows::router(follows_state))
}
