//! Registration, login, logout and password change pages.

use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use tracing::{debug, info, warn};

use super::render::{input, non_field_errors, page};
use super::sessions::commit;
use super::{WebState, api_failure, require_login, to_login};
use crate::auth::ClientIp;
use crate::session::{Level, Session};
use crate::validation::{FieldErrors, LoginForm, PasswordChangeForm, RegistrationForm};

fn register_page(session: &mut Session, form: &RegistrationForm, errors: Option<&FieldErrors>) -> Response {
    let body = format!(
        r#"<h1>Register</h1>
<form method="post" action="/register">
{non_field}{username}{email}{password}{password2}
<button>Register</button>
</form>
<p>Already have an account? <a href="/login">Log in</a></p>"#,
        non_field = non_field_errors(errors),
        username = input(errors, "username", "Username", "text", &form.username),
        email = input(errors, "email", "Email", "email", &form.email),
        password = input(errors, "password", "Password", "password", ""),
        password2 = input(errors, "password2", "Confirm password", "password", ""),
    );
    page(session, "Register", &body)
}

pub async fn register_form(State(state): State<WebState>, mut session: Session) -> Response {
    let response = register_page(&mut session, &RegistrationForm::default(), None);
    commit(&state, session, response).await
}

pub async fn register(
    State(state): State<WebState>,
    client_ip: ClientIp,
    mut session: Session,
    Form(form): Form<RegistrationForm>,
) -> Response {
    let result = state
        .api
        .register(
            &form.username,
            &form.email,
            &form.password,
            &form.password2,
            client_ip.known(),
        )
        .await;

    let response = match result {
        Ok(user) => {
            info!(username = %user.username, "Registered through the site");
            session.flash(Level::Success, "Registration successful. You can now log in.");
            Redirect::to("/login").into_response()
        }
        Err(e) => match e.field_errors() {
            Some(errors) => {
                session.flash(Level::Error, "Please correct the errors below.");
                register_page(&mut session, &form, Some(&errors))
            }
            None => {
                let message = if e.status() == Some(StatusCode::TOO_MANY_REQUESTS) {
                    "Too many signup attempts. Please wait before trying again."
                } else {
                    "Registration failed. Please try again later."
                };
                warn!(error = %e, "Registration failed");
                session.flash(Level::Error, message);
                register_page(&mut session, &form, None)
            }
        },
    };
    commit(&state, session, response).await
}

fn login_page(session: &mut Session, username: &str, errors: Option<&FieldErrors>) -> Response {
    let body = format!(
        r#"<h1>Log in</h1>
<form method="post" action="/login">
{username}{password}
<button>Log in</button>
</form>
<p>No account yet? <a href="/register">Register</a></p>"#,
        username = input(errors, "username", "Username", "text", username),
        password = input(errors, "password", "Password", "password", ""),
    );
    page(session, "Log in", &body)
}

pub async fn login_form(State(state): State<WebState>, mut session: Session) -> Response {
    let response = login_page(&mut session, "", None);
    commit(&state, session, response).await
}

pub async fn login(
    State(state): State<WebState>,
    client_ip: ClientIp,
    mut session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    let response = match form.validate() {
        Err(errors) => login_page(&mut session, &form.username, Some(&errors)),
        Ok((username, password)) => match state
            .api
            .obtain_token(&username, &password, client_ip.known())
            .await
        {
            Ok(pair) => {
                session.log_in(&username, pair.access, pair.refresh);
                session.flash(Level::Success, format!("Welcome back, {}!", username));
                Redirect::to("/feed").into_response()
            }
            Err(e) => {
                let message = match e.status() {
                    Some(StatusCode::UNAUTHORIZED | StatusCode::BAD_REQUEST) => {
                        "Invalid username or password."
                    }
                    Some(StatusCode::TOO_MANY_REQUESTS) => {
                        "Too many login attempts. Please wait before trying again."
                    }
                    _ => {
                        warn!(error = %e, "Login failed");
                        "Login is unavailable right now. Please try again later."
                    }
                };
                session.flash(Level::Error, message);
                login_page(&mut session, &username, None)
            }
        },
    };
    commit(&state, session, response).await
}

/// Blacklist the refresh token, then forget the session.
pub async fn logout(State(state): State<WebState>, mut session: Session) -> Response {
    if let Some(refresh) = session.refresh_token() {
        if let Err(e) = state.api.blacklist(refresh).await {
            debug!(error = %e, "Refresh token was not blacklisted");
        }
    }

    let was_logged_in = session.username().is_some();
    session.flush();
    if was_logged_in {
        session.flash(Level::Success, "Logged out successfully.");
    }
    commit(&state, session, to_login()).await
}

fn change_password_page(session: &mut Session, errors: Option<&FieldErrors>) -> Response {
    let body = format!(
        r#"<h1>Change password</h1>
<form method="post" action="/change-password">
{non_field}{current}{new}{confirm}
<button>Change password</button>
</form>"#,
        non_field = non_field_errors(errors),
        current = input(errors, "current_password", "Current password", "password", ""),
        new = input(errors, "new_password", "New password", "password", ""),
        confirm = input(errors, "confirm_password", "Confirm new password", "password", ""),
    );
    page(session, "Change password", &body)
}

pub async fn change_password_form(State(state): State<WebState>, mut session: Session) -> Response {
    let response = match require_login(&state, &mut session).await {
        Ok(_) => change_password_page(&mut session, None),
        Err(redirect) => redirect,
    };
    commit(&state, session, response).await
}

pub async fn change_password(
    State(state): State<WebState>,
    mut session: Session,
    Form(form): Form<PasswordChangeForm>,
) -> Response {
    let response = match require_login(&state, &mut session).await {
        Err(redirect) => redirect,
        Ok(headers) => {
            let result = state
                .api
                .change_password(
                    headers,
                    &form.current_password,
                    &form.new_password,
                    &form.confirm_password,
                )
                .await;
            match result {
                Ok(()) => {
                    session.flash(Level::Success, "Password updated successfully.");
                    let username = session.username().unwrap_or_default().to_string();
                    Redirect::to(&format!("/profile/{}", username)).into_response()
                }
                Err(e) => match e.field_errors() {
                    Some(errors) => change_password_page(&mut session, Some(&errors)),
                    None => match api_failure(&mut session, &e, "Failed to change password.") {
                        Some(redirect) => redirect,
                        None => change_password_page(&mut session, None),
                    },
                },
            }
        }
    };
    commit(&state, session, response).await
}
