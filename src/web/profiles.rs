//! Profile, follow, profile editing and user search pages.

use axum::{
    Form,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use std::fmt::Write as _;
use tracing::warn;

use super::render::{
    attr, esc, input, non_field_errors, page, post_list, profile_header, textarea, user_list,
};
use super::sessions::commit;
use super::{WebState, api_failure, require_login};
use crate::api::types::Page;
use crate::bridge::get_auth_headers;
use crate::session::{Level, Session};
use crate::validation::{FieldErrors, ProfileForm, is_valid_username};

fn profile_not_found(session: &mut Session) -> Response {
    let mut response = page(session, "Profile not found", "<h1>Profile not found</h1>");
    *response.status_mut() = StatusCode::NOT_FOUND;
    response
}

pub async fn profile(
    State(state): State<WebState>,
    mut session: Session,
    Path(username): Path<String>,
) -> Response {
    // No such user can exist, so nothing is sent to the API
    if !is_valid_username(&username) {
        let response = profile_not_found(&mut session);
        return commit(&state, session, response).await;
    }

    let response = match require_login(&state, &mut session).await {
        Err(redirect) => redirect,
        Ok(headers) => match state.api.get_profile(headers.clone(), &username).await {
            Err(e) if e.is_not_found() => profile_not_found(&mut session),
            Err(e) => match api_failure(&mut session, &e, "Failed to load profile.") {
                Some(redirect) => redirect,
                None => Redirect::to("/feed").into_response(),
            },
            Ok(profile) => {
                let posts = match state.api.list_posts(headers, Some(&username), 1).await {
                    Ok(posts) => posts,
                    Err(_) => {
                        session.flash(Level::Error, "Failed to load posts.");
                        Page::default()
                    }
                };

                let viewer = session.username().map(str::to_string);
                let mut body = profile_header(&profile);
                if let Some(following) = profile.is_following {
                    let _ = write!(
                        body,
                        r#"<form method="post" action="/profile/{}"><button>{}</button></form>"#,
                        attr(&profile.user.username),
                        if following { "Unfollow" } else { "Follow" }
                    );
                }
                let _ = write!(
                    body,
                    "<h2>Posts</h2>{}",
                    post_list(&posts.results, viewer.as_deref())
                );
                page(&mut session, &profile.user.username, &body)
            }
        },
    };
    commit(&state, session, response).await
}

/// Toggle following `username` and go back to their profile.
pub async fn toggle_follow(
    State(state): State<WebState>,
    mut session: Session,
    Path(username): Path<String>,
) -> Response {
    if !is_valid_username(&username) {
        let response = profile_not_found(&mut session);
        return commit(&state, session, response).await;
    }

    let response = match require_login(&state, &mut session).await {
        Err(redirect) => redirect,
        Ok(headers) => {
            let back = Redirect::to(&format!("/profile/{}", username)).into_response();
            match state.api.toggle_follow(headers, &username).await {
                Ok(toggle) if toggle.following => {
                    session.flash(
                        Level::Success,
                        format!("You are now following {}.", username),
                    );
                    back
                }
                Ok(_) => {
                    session.flash(Level::Success, format!("You have unfollowed {}.", username));
                    back
                }
                Err(e) if e.status() == Some(StatusCode::BAD_REQUEST) => {
                    session.flash(Level::Warning, "You cannot follow yourself.");
                    back
                }
                Err(e) => api_failure(&mut session, &e, "Failed to follow/unfollow user.")
                    .unwrap_or(back),
            }
        }
    };
    commit(&state, session, response).await
}

/// The edit form posts strings. An empty age clears it.
#[derive(Debug, Default, Deserialize)]
pub struct EditProfileForm {
    #[serde(default)]
    bio: String,
    #[serde(default)]
    profile_picture: String,
    #[serde(default)]
    age: String,
}

impl EditProfileForm {
    fn to_profile_form(&self) -> Result<ProfileForm, FieldErrors> {
        let age = match self.age.trim() {
            "" => None,
            raw => Some(
                raw.parse::<i64>()
                    .map_err(|_| FieldErrors::single("age", "Enter a whole number."))?,
            ),
        };
        Ok(ProfileForm {
            bio: Some(self.bio.clone()),
            profile_picture: Some(self.profile_picture.clone()),
            age: Some(age),
        })
    }
}

fn edit_profile_page(
    session: &mut Session,
    form: &EditProfileForm,
    errors: Option<&FieldErrors>,
) -> Response {
    let body = format!(
        r#"<h1>Edit profile</h1>
<form method="post" action="/edit-profile">
{non_field}{bio}{picture}{age}
<button>Save</button>
</form>"#,
        non_field = non_field_errors(errors),
        bio = textarea(errors, "bio", "Bio", &form.bio),
        picture = input(
            errors,
            "profile_picture",
            "Profile picture URL",
            "text",
            &form.profile_picture
        ),
        age = input(errors, "age", "Age", "number", &form.age),
    );
    page(session, "Edit profile", &body)
}

pub async fn edit_profile_form(State(state): State<WebState>, mut session: Session) -> Response {
    let response = match require_login(&state, &mut session).await {
        Err(redirect) => redirect,
        Ok(headers) => {
            let username = session.username().unwrap_or_default().to_string();
            match state.api.get_profile(headers, &username).await {
                Ok(profile) => {
                    let form = EditProfileForm {
                        bio: profile.bio.unwrap_or_default(),
                        profile_picture: profile.profile_picture,
                        age: profile.age.map(|a| a.to_string()).unwrap_or_default(),
                    };
                    edit_profile_page(&mut session, &form, None)
                }
                Err(e) => match api_failure(&mut session, &e, "Failed to load profile.") {
                    Some(redirect) => redirect,
                    None => edit_profile_page(&mut session, &EditProfileForm::default(), None),
                },
            }
        }
    };
    commit(&state, session, response).await
}

pub async fn edit_profile(
    State(state): State<WebState>,
    mut session: Session,
    Form(form): Form<EditProfileForm>,
) -> Response {
    let response = match require_login(&state, &mut session).await {
        Err(redirect) => redirect,
        Ok(headers) => match form.to_profile_form() {
            Err(errors) => edit_profile_page(&mut session, &form, Some(&errors)),
            Ok(update) => {
                let username = session.username().unwrap_or_default().to_string();
                match state.api.update_profile(headers, &username, &update).await {
                    Ok(_) => {
                        session.flash(Level::Success, "Profile updated successfully.");
                        Redirect::to(&format!("/profile/{}", username)).into_response()
                    }
                    Err(e) => match e.field_errors() {
                        Some(errors) => edit_profile_page(&mut session, &form, Some(&errors)),
                        None => match api_failure(&mut session, &e, "Failed to update profile.") {
                            Some(redirect) => redirect,
                            None => edit_profile_page(&mut session, &form, None),
                        },
                    },
                }
            }
        },
    };
    commit(&state, session, response).await
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    q: String,
}

/// Public user search by username or bio.
pub async fn search(
    State(state): State<WebState>,
    mut session: Session,
    Query(query): Query<SearchQuery>,
) -> Response {
    let q = query.q.trim();
    let results = if q.is_empty() {
        String::new()
    } else {
        let headers = get_auth_headers(&mut session, &state.api).await;
        match state.api.search_users(headers, q, 1).await {
            Ok(users) => user_list(&users.results),
            Err(e) => {
                warn!(error = %e, "User search failed");
                session.flash(Level::Error, "Search failed. Please try again.");
                String::new()
            }
        }
    };

    let body = format!(
        r#"<h1>Search</h1>
<form method="get" action="/search"><input type="search" name="q" value="{}"><button>Search</button></form>
{}{}"#,
        attr(q),
        if q.is_empty() {
            String::new()
        } else {
            format!("<h2>Results for {}</h2>", esc(q))
        },
        results
    );
    let response = page(&mut session, "Search", &body);
    commit(&state, session, response).await
}
