//! Rate limiting for credential endpoints.
//!
//! Uses a token bucket algorithm with per-IP tracking to slow down password
//! guessing and signup spam.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{Quota, RateLimiter, clock::DefaultClock, state::keyed::DefaultKeyedStateStore};
use std::{num::NonZeroU32, sync::Arc};

use crate::api::ApiError;
use crate::auth::client_ip;

/// Per-IP rate limiter.
pub type IpLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

#[cfg(feature = "test-mode")]
const TOKEN_OBTAIN_PER_SEC: u32 = 1000;
#[cfg(not(feature = "test-mode"))]
const TOKEN_OBTAIN_PER_SEC: u32 = 1;

#[cfg(feature = "test-mode")]
const TOKEN_OBTAIN_BURST: u32 = 1000;
#[cfg(not(feature = "test-mode"))]
const TOKEN_OBTAIN_BURST: u32 = 10;

#[cfg(feature = "test-mode")]
const USER_CREATE_PER_MIN: u32 = 1000;
#[cfg(not(feature = "test-mode"))]
const USER_CREATE_PER_MIN: u32 = 20;

/// Rate limiting configuration for credential endpoints.
#[derive(Clone)]
pub struct RateLimitConfig {
    /// Password logins: 1 per second per IP, bursts of 10
    pub token_obtain: Arc<IpLimiter>,
    /// Registrations: 20 per minute per IP
    pub user_create: Arc<IpLimiter>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimitConfig {
    /// Create rate limiters with default configuration.
    /// In test mode, limits are much higher to allow rapid test execution.
    pub fn new() -> Self {
        Self {
            token_obtain: Arc::new(RateLimiter::keyed(
                Quota::per_second(nonzero(TOKEN_OBTAIN_PER_SEC))
                    .allow_burst(nonzero(TOKEN_OBTAIN_BURST)),
            )),
            user_create: Arc::new(RateLimiter::keyed(Quota::per_minute(nonzero(
                USER_CREATE_PER_MIN,
            )))),
        }
    }
}

fn nonzero(n: u32) -> NonZeroU32 {
    NonZeroU32::new(n).unwrap_or(NonZeroU32::MIN)
}

fn too_many(message: &str) -> Response {
    ApiError::too_many_requests(message).into_response()
}

/// Middleware for rate limiting token issue.
pub async fn rate_limit_token_obtain(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    let ip = client_ip(&request);

    match config.token_obtain.check_key(&ip) {
        Ok(_) => next.run(request).await,
        Err(_) => too_many("Too many login attempts. Please wait before trying again."),
    }
}

/// Middleware for rate limiting registration.
pub async fn rate_limit_user_create(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    let ip = client_ip(&request);

    match config.user_create.check_key(&ip) {
        Ok(_) => next.run(request).await,
        Err(_) => too_many("Too many signup attempts. Please wait before trying again."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_then_limited() {
        let limiter: IpLimiter = RateLimiter::keyed(
            Quota::per_minute(nonzero(1)).allow_burst(nonzero(2)),
        );
        let ip = "10.0.0.1".to_string();
        let other = "10.0.0.2".to_string();

        assert!(limiter.check_key(&ip).is_ok());
        assert!(limiter.check_key(&ip).is_ok());
        assert!(limiter.check_key(&ip).is_err());
        assert!(limiter.check_key(&other).is_ok());
    }
}
