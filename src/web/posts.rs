//! Feed, post and comment pages.

use axum::{
    Form,
    extract::{Path, Query, State},
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::debug;

use super::render::{
    comment_list, input, non_field_errors, page, pager, post_card, post_list, textarea,
};
use super::sessions::commit;
use super::{WebState, api_failure, redirect_back, require_login};
use crate::api::types::{Page, PostView};
use crate::bridge::get_auth_headers;
use crate::session::{Level, Session};
use crate::validation::{CommentForm, FieldErrors, PostForm};

#[derive(Debug, Default, Deserialize)]
pub struct PageParam {
    page: Option<String>,
}

impl PageParam {
    fn number(&self) -> i64 {
        self.page
            .as_deref()
            .and_then(|p| p.parse().ok())
            .filter(|p| *p >= 1)
            .unwrap_or(1)
    }
}

pub async fn feed(
    State(state): State<WebState>,
    mut session: Session,
    Query(query): Query<PageParam>,
) -> Response {
    let response = match require_login(&state, &mut session).await {
        Err(redirect) => redirect,
        Ok(headers) => match state.api.list_posts(headers, None, query.number()).await {
            Ok(posts) => feed_page(&mut session, &posts),
            Err(e) => match api_failure(&mut session, &e, "Failed to load posts.") {
                Some(redirect) => redirect,
                None => feed_page(&mut session, &Page::default()),
            },
        },
    };
    commit(&state, session, response).await
}

fn feed_page(session: &mut Session, posts: &Page<PostView>) -> Response {
    let viewer = session.username().map(str::to_string);
    let body = format!(
        "<h1>Feed</h1>{}{}",
        post_list(&posts.results, viewer.as_deref()),
        pager(posts, "/feed")
    );
    page(session, "Feed", &body)
}

fn create_post_page(session: &mut Session, form: &PostForm, errors: Option<&FieldErrors>) -> Response {
    let body = format!(
        r#"<h1>New post</h1>
<form method="post" action="/create-post">
{non_field}{caption}{image}
<button>Post</button>
</form>"#,
        non_field = non_field_errors(errors),
        caption = textarea(errors, "caption", "Caption", &form.caption),
        image = input(
            errors,
            "image",
            "Image URL",
            "text",
            form.image.as_deref().unwrap_or_default()
        ),
    );
    page(session, "New post", &body)
}

pub async fn create_post_form(State(state): State<WebState>, mut session: Session) -> Response {
    let response = match require_login(&state, &mut session).await {
        Ok(_) => create_post_page(&mut session, &PostForm::default(), None),
        Err(redirect) => redirect,
    };
    commit(&state, session, response).await
}

pub async fn create_post(
    State(state): State<WebState>,
    mut session: Session,
    Form(form): Form<PostForm>,
) -> Response {
    let response = match require_login(&state, &mut session).await {
        Err(redirect) => redirect,
        Ok(headers) => {
            let image = form.image.as_deref().filter(|i| !i.trim().is_empty());
            match state.api.create_post(headers, &form.caption, image).await {
                Ok(post) => {
                    debug!(post_id = post.id, "Created post through the site");
                    session.flash(Level::Success, "Post created successfully.");
                    Redirect::to("/feed").into_response()
                }
                Err(e) => match e.field_errors() {
                    Some(errors) => create_post_page(&mut session, &form, Some(&errors)),
                    None => match api_failure(&mut session, &e, "Failed to create post.") {
                        Some(redirect) => redirect,
                        None => create_post_page(&mut session, &form, None),
                    },
                },
            }
        }
    };
    commit(&state, session, response).await
}

fn post_not_found(session: &mut Session) -> Response {
    session.flash(Level::Error, "Post not found or failed to load.");
    Redirect::to("/feed").into_response()
}

/// Public. Logged-in visitors also get the comment form.
pub async fn post_detail(
    State(state): State<WebState>,
    mut session: Session,
    Path(id): Path<String>,
    Query(query): Query<PageParam>,
) -> Response {
    let response = match id.parse::<i64>() {
        Err(_) => post_not_found(&mut session),
        Ok(id) => {
            let headers = get_auth_headers(&mut session, &state.api).await;
            match state.api.get_post(headers.clone(), id).await {
                Err(_) => post_not_found(&mut session),
                Ok(post) => {
                    let comments = match state.api.list_comments(headers, id, query.number()).await {
                        Ok(comments) => comments,
                        Err(e) => {
                            debug!(error = %e, "Failed to fetch comments");
                            session.flash(Level::Error, "Failed to fetch comments.");
                            Page::default()
                        }
                    };

                    let viewer = session.username().map(str::to_string);
                    let comment_form = if viewer.is_some() {
                        format!(
                            r#"<form method="post" action="/post/{}/comment">{}<button>Comment</button></form>"#,
                            post.id,
                            textarea(None, "content", "Add a comment", "")
                        )
                    } else {
                        r#"<p><a href="/login">Log in</a> to comment.</p>"#.to_string()
                    };

                    let body = format!(
                        "{}<h2>Comments</h2>{}{}{}",
                        post_card(&post, viewer.as_deref()),
                        comment_list(&comments.results),
                        pager(&comments, &format!("/post/{}", post.id)),
                        comment_form
                    );
                    let title = format!("Post by {}", post.uploader.username);
                    page(&mut session, &title, &body)
                }
            }
        }
    };
    commit(&state, session, response).await
}

pub async fn add_comment(
    State(state): State<WebState>,
    mut session: Session,
    Path(id): Path<String>,
    Form(form): Form<CommentForm>,
) -> Response {
    let Ok(post_id) = id.parse::<i64>() else {
        let response = post_not_found(&mut session);
        return commit(&state, session, response).await;
    };

    let response = match require_login(&state, &mut session).await {
        Err(redirect) => redirect,
        Ok(headers) => {
            let back = Redirect::to(&format!("/post/{}", post_id)).into_response();
            match state.api.create_comment(headers, post_id, &form.content).await {
                Ok(_) => {
                    session.flash(Level::Success, "Comment added.");
                    back
                }
                Err(e) => match e.field_errors() {
                    Some(errors) => {
                        for (_, messages) in errors.iter() {
                            for message in messages {
                                session.flash(Level::Error, message.clone());
                            }
                        }
                        back
                    }
                    None => api_failure(&mut session, &e, "Failed to post comment.").unwrap_or(back),
                },
            }
        }
    };
    commit(&state, session, response).await
}

async fn set_like(
    state: &WebState,
    session: &mut Session,
    request_headers: &HeaderMap,
    id: &str,
    liked: bool,
) -> Response {
    let Ok(post_id) = id.parse::<i64>() else {
        return post_not_found(session);
    };
    let headers = match require_login(state, session).await {
        Ok(headers) => headers,
        Err(redirect) => return redirect,
    };

    let result = if liked {
        state.api.like_post(headers, post_id).await
    } else {
        state.api.unlike_post(headers, post_id).await
    };

    match result {
        Ok(_) if liked => session.flash(Level::Success, "Liked successfully."),
        Ok(_) => session.flash(Level::Success, "Like removed."),
        Err(e) => {
            let message = if liked {
                "Failed to like the post."
            } else {
                "Failed to unlike the post."
            };
            if let Some(redirect) = api_failure(session, &e, message) {
                return redirect;
            }
        }
    }
    redirect_back(request_headers, "/feed")
}

pub async fn like(
    State(state): State<WebState>,
    mut session: Session,
    request_headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let response = set_like(&state, &mut session, &request_headers, &id, true).await;
    commit(&state, session, response).await
}

pub async fn unlike(
    State(state): State<WebState>,
    mut session: Session,
    request_headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let response = set_like(&state, &mut session, &request_headers, &id, false).await;
    commit(&state, session, response).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_param() {
        assert_eq!(PageParam { page: None }.number(), 1);
        assert_eq!(PageParam { page: Some("3".into()) }.number(), 3);
        assert_eq!(PageParam { page: Some("0".into()) }.number(), 1);
        assert_eq!(PageParam { page: Some("x".into()) }.number(), 1);
    }
}
