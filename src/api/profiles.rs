//! Profile API endpoints.
//!
//! - GET `/profiles` - List profiles
//! - GET `/profiles/{username}` - Get a profile with follower counts
//! - PUT/PATCH `/profiles/{username}` - Edit your own profile
//! - POST `/profiles/{username}/follow` - Toggle following that user

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
};
use std::sync::Arc;
use tracing::info;

use super::error::{ApiError, ResultExt};
use super::pagination::{PageQuery, PageRequest};
use super::types::{FollowToggle, ProfileView};
use crate::auth::{ApiAuth, MaybeAuth};
use crate::db::{Database, FollowOutcome, Profile, ProfileUpdate};
use crate::impl_has_auth_backend;
use crate::jwt::JwtConfig;
use crate::validation::ProfileForm;

#[derive(Clone)]
pub struct ProfilesState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
}

impl_has_auth_backend!(ProfilesState);

pub fn router(state: ProfilesState) -> Router {
    Router::new()
        .route("/profiles", get(list_profiles))
        .route(
            "/profiles/{username}",
            get(get_profile).put(update_profile).patch(update_profile),
        )
        .route("/profiles/{username}/follow", post(toggle_follow))
        .with_state(state)
}

async fn view(db: &Database, profile: Profile) -> Result<ProfileView, ApiError> {
    let follows = db.follows();
    let followers = follows
        .followers_count(profile.user_id)
        .await
        .db_err("Failed to count followers")?;
    let following = follows
        .following_count(profile.user_id)
        .await
        .db_err("Failed to count following")?;
    Ok(ProfileView::new(profile, followers, following))
}

async fn find(db: &Database, username: &str) -> Result<Profile, ApiError> {
    db.profiles()
        .get_by_username(username)
        .await
        .db_err("Failed to get profile")?
        .ok_or_else(ApiError::not_found)
}

async fn list_profiles(
    State(state): State<ProfilesState>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = PageRequest::parse(query.page.as_deref())?;
    let profiles = state.db.profiles();
    let count = profiles.count().await.db_err("Failed to count profiles")?;
    page.check(count)?;

    let mut results = Vec::new();
    for profile in profiles
        .list(page.limit(), page.offset())
        .await
        .db_err("Failed to list profiles")?
    {
        results.push(view(&state.db, profile).await?);
    }

    Ok(Json(page.into_page(count, results)))
}

async fn get_profile(
    State(state): State<ProfilesState>,
    MaybeAuth(auth): MaybeAuth,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = find(&state.db, &username).await?;
    let target = profile.user_id;
    let mut body = view(&state.db, profile).await?;

    if let Some(auth) = auth.filter(|a| a.user_id != target) {
        body.is_following = Some(
            state
                .db
                .follows()
                .is_following(auth.user_id, target)
                .await
                .db_err("Failed to check follow")?,
        );
    }

    Ok(Json(body))
}

/// PUT and PATCH both merge: fields missing from the body keep their value.
/// An explicit `null` age clears it.
async fn update_profile(
    State(state): State<ProfilesState>,
    ApiAuth(auth): ApiAuth,
    Path(username): Path<String>,
    Json(payload): Json<ProfileForm>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = find(&state.db, &username).await?;
    if profile.user_id != auth.user_id {
        return Err(ApiError::not_owner());
    }

    let form = payload.validate()?;
    let update = ProfileUpdate {
        bio: match form.bio {
            Some(bio) if bio.is_empty() => None,
            Some(bio) => Some(bio),
            None => profile.bio,
        },
        profile_picture: form.profile_picture.unwrap_or(profile.profile_picture),
        age: form.age.unwrap_or(profile.age),
    };

    state
        .db
        .profiles()
        .update(auth.user_id, &update)
        .await
        .db_err("Failed to update profile")?;

    info!(user_id = auth.user_id, "Updated profile");

    let profile = find(&state.db, &username).await?;
    Ok(Json(view(&state.db, profile).await?))
}

async fn toggle_follow(
    State(state): State<ProfilesState>,
    ApiAuth(auth): ApiAuth,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let target = find(&state.db, &username).await?;
    let follows = state.db.follows();

    let following = if follows
        .unfollow(auth.user_id, target.user_id)
        .await
        .db_err("Failed to unfollow")?
    {
        false
    } else {
        match follows
            .follow(auth.user_id, target.user_id)
            .await
            .db_err("Failed to follow")?
        {
            FollowOutcome::SelfFollow => {
                return Err(ApiError::bad_request("You cannot follow yourself."));
            }
            FollowOutcome::Created(_) | FollowOutcome::Existing(_) => true,
        }
    };

    let followers_count = follows
        .followers_count(target.user_id)
        .await
        .db_err("Failed to count followers")?;

    info!(
        follower = auth.user_id,
        following = target.user_id,
        now_following = following,
        "Toggled follow"
    );

    Ok(Json(FollowToggle {
        following,
        followers_count,
    }))
}
