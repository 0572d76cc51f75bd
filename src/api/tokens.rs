//! Token API endpoints.
//!
//! - POST `/token` - Exchange username and password for an access/refresh pair
//! - POST `/token/refresh` - Exchange a refresh token for a new access token
//! - POST `/token/verify` - Check an access or refresh token
//! - POST `/token/blacklist` - Revoke a refresh token

use axum::{
    Json, Router,
    extract::State,
    middleware,
    response::IntoResponse,
    routing::post,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

use super::error::{ApiError, ResultExt};
use super::types::{AccessToken, TokenPair};
use crate::db::Database;
use crate::jwt::{JwtConfig, RefreshClaims, TokenType};
use crate::password::verify_password;
use crate::rate_limit::{RateLimitConfig, rate_limit_token_obtain};
use crate::validation::{FieldErrors, LoginForm};

#[derive(Clone)]
pub struct TokensState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
    pub rate_limit_config: Arc<RateLimitConfig>,
}

pub fn router(state: TokensState) -> Router {
    let obtain_router = Router::new()
        .route("/token", post(obtain_token))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            state.rate_limit_config.clone(),
            rate_limit_token_obtain,
        ));

    Router::new()
        .route("/token/refresh", post(refresh_token))
        .route("/token/verify", post(verify_token))
        .route("/token/blacklist", post(blacklist_token))
        .with_state(state)
        .merge(obtain_router)
}

#[derive(Deserialize)]
struct RefreshRequest {
    #[serde(default)]
    refresh: String,
}

#[derive(Deserialize)]
struct VerifyRequest {
    #[serde(default)]
    token: String,
}

fn require(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(FieldErrors::single(field, "This field may not be blank.").into());
    }
    Ok(())
}

fn token_invalid() -> ApiError {
    ApiError::invalid_token("Token is invalid or expired")
}

/// Validate a refresh token and make sure it has not been blacklisted.
async fn check_refresh(state: &TokensState, token: &str) -> Result<RefreshClaims, ApiError> {
    let claims = state
        .jwt
        .validate_refresh_token(token)
        .map_err(|_| token_invalid())?;

    state
        .db
        .tokens()
        .get_by_jti(&claims.jti)
        .await
        .db_err("Failed to check token")?
        .ok_or_else(|| ApiError::invalid_token("Token is blacklisted"))?;

    Ok(claims)
}

async fn obtain_token(
    State(state): State<TokensState>,
    Json(payload): Json<LoginForm>,
) -> Result<impl IntoResponse, ApiError> {
    let (username, password) = payload.validate()?;

    let user = state
        .db
        .users()
        .get_by_username(&username)
        .await
        .db_err("Failed to get user")?;

    let Some(user) = user.filter(|u| verify_password(&password, &u.password_hash)) else {
        info!(username = %username, "Rejected login");
        return Err(ApiError::unauthorized(
            "No active account found with the given credentials",
        ));
    };

    let access = state
        .jwt
        .generate_access_token(user.id, &user.username)
        .map_err(|e| {
            error!("Failed to generate access token: {}", e);
            ApiError::internal("Failed to generate token")
        })?;

    let refresh = state
        .jwt
        .generate_refresh_token(user.id, &user.username)
        .map_err(|e| {
            error!("Failed to generate refresh token: {}", e);
            ApiError::internal("Failed to generate token")
        })?;

    state
        .db
        .tokens()
        .create(&refresh.jti, user.id, refresh.issued_at, refresh.expires_at)
        .await
        .db_err("Failed to store refresh token")?;

    info!(user_id = user.id, "Issued token pair");

    Ok(Json(TokenPair {
        access: access.token,
        refresh: refresh.token,
    }))
}

async fn refresh_token(
    State(state): State<TokensState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require("refresh", &payload.refresh)?;
    let claims = check_refresh(&state, &payload.refresh).await?;
    let user_id = claims.user_id().map_err(|_| token_invalid())?;

    let user = state
        .db
        .users()
        .get_by_id(user_id)
        .await
        .db_err("Failed to get user")?
        .ok_or_else(|| ApiError::invalid_token("User not found"))?;

    let access = state
        .jwt
        .generate_access_token(user.id, &user.username)
        .map_err(|e| {
            error!("Failed to generate access token: {}", e);
            ApiError::internal("Failed to generate token")
        })?;

    Ok(Json(AccessToken {
        access: access.token,
    }))
}

/// 200 `{}` for a valid access token or a valid, non-blacklisted refresh token.
async fn verify_token(
    State(state): State<TokensState>,
    Json(payload): Json<VerifyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require("token", &payload.token)?;

    match state.jwt.token_type(&payload.token) {
        Ok(TokenType::Access) => {
            state
                .jwt
                .validate_access_token(&payload.token)
                .map_err(|_| token_invalid())?;
        }
        Ok(TokenType::Refresh) => {
            check_refresh(&state, &payload.token).await?;
        }
        Err(_) => return Err(token_invalid()),
    }

    Ok(Json(json!({})))
}

async fn blacklist_token(
    State(state): State<TokensState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require("refresh", &payload.refresh)?;
    let claims = state
        .jwt
        .validate_refresh_token(&payload.refresh)
        .map_err(|_| token_invalid())?;

    let removed = state
        .db
        .tokens()
        .delete_by_jti(&claims.jti)
        .await
        .db_err("Failed to blacklist token")?;

    if !removed {
        return Err(ApiError::invalid_token("Token is blacklisted"));
    }

    info!(jti = %claims.jti, "Blacklisted refresh token");
    Ok(Json(json!({})))
}
