//! User API endpoints.
//!
//! - POST `/register` - Create an account (rate limited)
//! - GET `/users` - Search users by username or bio
//! - GET `/users/{id}` - Get one user
//! - DELETE `/users/{id}` - Delete your own account
//! - POST `/password` - Change your password

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info};

use super::error::{ApiError, ResultExt, parse_id};
use super::pagination::PageRequest;
use super::types::{Detail, RegisteredUser, UserRef};
use crate::auth::ApiAuth;
use crate::db::{Database, is_unique_violation};
use crate::impl_has_auth_backend;
use crate::jwt::JwtConfig;
use crate::password::{hash_password, verify_password};
use crate::rate_limit::{RateLimitConfig, rate_limit_user_create};
use crate::validation::{FieldErrors, PasswordChangeForm, RegistrationForm};

#[derive(Clone)]
pub struct UsersState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
    pub rate_limit_config: Arc<RateLimitConfig>,
}

impl_has_auth_backend!(UsersState);

pub fn router(state: UsersState) -> Router {
    let register_router = Router::new()
        .route("/register", post(register))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            state.rate_limit_config.clone(),
            rate_limit_user_create,
        ));

    Router::new()
        .route("/users", get(list_users))
        .route("/users/{id}", get(get_user).delete(delete_user))
        .route("/password", post(change_password))
        .with_state(state)
        .merge(register_router)
}

fn username_taken() -> ApiError {
    FieldErrors::single("username", "A user with that username already exists.").into()
}

fn hash_failed(e: argon2::password_hash::Error) -> ApiError {
    error!("Failed to hash password: {}", e);
    ApiError::internal("Failed to hash password")
}

async fn register(
    State(state): State<UsersState>,
    Json(payload): Json<RegistrationForm>,
) -> Result<impl IntoResponse, ApiError> {
    let registration = payload.validate()?;

    let available = state
        .db
        .users()
        .is_username_available(&registration.username)
        .await
        .db_err("Failed to check username")?;
    if !available {
        return Err(username_taken());
    }

    let password_hash = hash_password(&registration.password).map_err(hash_failed)?;

    // Two concurrent signups can both pass the availability check
    let id = match state
        .db
        .users()
        .create(&registration.username, &registration.email, &password_hash)
        .await
    {
        Ok(id) => id,
        Err(e) if is_unique_violation(&e) => return Err(username_taken()),
        Err(e) => return Err(ApiError::db_error("Failed to create user", e)),
    };

    info!(user_id = id, username = %registration.username, "Registered user");

    Ok((
        StatusCode::CREATED,
        Json(RegisteredUser {
            id,
            username: registration.username,
            email: registration.email,
        }),
    ))
}

#[derive(Deserialize)]
struct UserQuery {
    search: Option<String>,
    page: Option<String>,
}

async fn list_users(
    State(state): State<UsersState>,
    Query(query): Query<UserQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = PageRequest::parse(query.page.as_deref())?;
    let search = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let users = state.db.users();
    let count = users.count(search).await.db_err("Failed to count users")?;
    page.check(count)?;

    let results = users
        .list(search, page.limit(), page.offset())
        .await
        .db_err("Failed to list users")?;

    Ok(Json(page.into_page(
        count,
        results.iter().map(UserRef::from).collect(),
    )))
}

async fn get_user(
    State(state): State<UsersState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    let user = state
        .db
        .users()
        .get_by_id(id)
        .await
        .db_err("Failed to get user")?
        .ok_or_else(ApiError::not_found)?;

    Ok(Json(UserRef::from(&user)))
}

async fn delete_user(
    State(state): State<UsersState>,
    ApiAuth(auth): ApiAuth,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    if id != auth.user_id {
        let exists = state
            .db
            .users()
            .get_by_id(id)
            .await
            .db_err("Failed to get user")?
            .is_some();
        return Err(if exists {
            ApiError::not_owner()
        } else {
            ApiError::not_found()
        });
    }

    state
        .db
        .users()
        .delete(id)
        .await
        .db_err("Failed to delete user")?;

    info!(user_id = id, "Deleted user");
    Ok(StatusCode::NO_CONTENT)
}

async fn change_password(
    State(state): State<UsersState>,
    ApiAuth(auth): ApiAuth,
    Json(payload): Json<PasswordChangeForm>,
) -> Result<impl IntoResponse, ApiError> {
    let (current, new) = payload.validate()?;

    let user = state
        .db
        .users()
        .get_by_id(auth.user_id)
        .await
        .db_err("Failed to get user")?
        .ok_or_else(ApiError::not_found)?;

    if !verify_password(&current, &user.password_hash) {
        return Err(
            FieldErrors::single("current_password", "Current password is incorrect.").into(),
        );
    }

    let password_hash = hash_password(&new).map_err(hash_failed)?;
    state
        .db
        .users()
        .set_password(user.id, &password_hash)
        .await
        .db_err("Failed to update password")?;

    info!(user_id = user.id, "Changed password");
    Ok(Json(Detail {
        detail: "Password updated successfully.".into(),
    }))
}
