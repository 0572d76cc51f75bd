//! HTML rendering. Every piece of user content goes through [`esc`] or [`attr`].

use axum::response::{Html, IntoResponse, Response};
use html_escape::{encode_double_quoted_attribute, encode_text};
use std::borrow::Cow;
use std::fmt::Write as _;

use crate::api::types::{CommentView, Page, PostView, ProfileView, UserRef};
use crate::session::{Flash, Session};
use crate::validation::{FieldErrors, NON_FIELD_ERRORS};

pub fn esc(text: &str) -> Cow<'_, str> {
    encode_text(text)
}

pub fn attr(text: &str) -> Cow<'_, str> {
    encode_double_quoted_attribute(text)
}

/// Render a full page, consuming the session's pending flash messages.
pub fn page(session: &mut Session, title: &str, body: &str) -> Response {
    let messages = session.take_messages();
    let html = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title} | Snapfeed</title>
</head>
<body>
{nav}
<main>
{messages}
{body}
</main>
</body>
</html>
"#,
        title = esc(title),
        nav = nav(session.username()),
        messages = flashes(&messages),
    );
    Html(html).into_response()
}

fn nav(username: Option<&str>) -> String {
    let mut out = String::from(r#"<nav><a href="/feed">Snapfeed</a>"#);
    out.push_str(
        r#" <form method="get" action="/search"><input type="search" name="q" placeholder="Search users"><button>Search</button></form>"#,
    );
    match username {
        Some(username) => {
            let _ = write!(
                out,
                r#" <a href="/create-post">New post</a> <a href="/profile/{}">{}</a> <a href="/edit-profile">Edit profile</a> <a href="/change-password">Change password</a> <form method="post" action="/logout"><button>Log out</button></form>"#,
                attr(username),
                esc(username)
            );
        }
        None => out.push_str(r#" <a href="/login">Log in</a> <a href="/register">Register</a>"#),
    }
    out.push_str("</nav>");
    out
}

fn flashes(messages: &[Flash]) -> String {
    if messages.is_empty() {
        return String::new();
    }
    let mut out = String::from(r#"<ul class="messages">"#);
    for flash in messages {
        let _ = write!(
            out,
            r#"<li class="{}">{}</li>"#,
            flash.level.as_str(),
            esc(&flash.message)
        );
    }
    out.push_str("</ul>");
    out
}

/// Messages for one field, or nothing.
pub fn field_errors(errors: Option<&FieldErrors>, field: &str) -> String {
    let Some(messages) = errors.map(|e| e.get(field)).filter(|m| !m.is_empty()) else {
        return String::new();
    };
    let mut out = String::from(r#"<ul class="errorlist">"#);
    for message in messages {
        let _ = write!(out, "<li>{}</li>", esc(message));
    }
    out.push_str("</ul>");
    out
}

pub fn non_field_errors(errors: Option<&FieldErrors>) -> String {
    field_errors(errors, NON_FIELD_ERRORS)
}

/// A labelled input with its errors.
pub fn input(
    errors: Option<&FieldErrors>,
    name: &str,
    label: &str,
    kind: &str,
    value: &str,
) -> String {
    format!(
        r#"<p><label for="{name}">{label}</label> <input type="{kind}" id="{name}" name="{name}" value="{value}">{errors}</p>"#,
        name = name,
        label = esc(label),
        kind = kind,
        value = attr(value),
        errors = field_errors(errors, name),
    )
}

pub fn textarea(errors: Option<&FieldErrors>, name: &str, label: &str, value: &str) -> String {
    format!(
        r#"<p><label for="{name}">{label}</label> <textarea id="{name}" name="{name}">{value}</textarea>{errors}</p>"#,
        name = name,
        label = esc(label),
        value = esc(value),
        errors = field_errors(errors, name),
    )
}

/// One post as shown in the feed and on profiles. `viewer` enables the like buttons.
pub fn post_card(post: &PostView, viewer: Option<&str>) -> String {
    let mut out = String::from(r#"<article class="post">"#);
    let _ = write!(
        out,
        r#"<header><a href="/profile/{}">{}</a> <time>{}</time></header>"#,
        attr(&post.uploader.username),
        esc(&post.uploader.username),
        esc(&post.created_at)
    );
    if let Some(image) = &post.image {
        let _ = write!(
            out,
            r#"<img src="{}" alt="{}">"#,
            attr(image),
            attr(&post.caption)
        );
    }
    let _ = write!(
        out,
        r#"<p>{}</p><footer>{} likes · <a href="/post/{}">{} comments</a>"#,
        esc(&post.caption),
        post.total_likes,
        post.id,
        post.comment_count
    );
    if viewer.is_some() {
        let _ = write!(
            out,
            r#" <form method="post" action="/posts/{id}/like"><button>Like</button></form> <form method="post" action="/posts/{id}/unlike"><button>Unlike</button></form>"#,
            id = post.id
        );
    }
    out.push_str("</footer></article>");
    out
}

pub fn post_list(posts: &[PostView], viewer: Option<&str>) -> String {
    if posts.is_empty() {
        return "<p>No posts yet.</p>".to_string();
    }
    posts.iter().map(|p| post_card(p, viewer)).collect()
}

pub fn comment_list(comments: &[CommentView]) -> String {
    if comments.is_empty() {
        return "<p>No comments yet.</p>".to_string();
    }
    let mut out = String::from(r#"<ul class="comments">"#);
    for comment in comments {
        let _ = write!(
            out,
            r#"<li><a href="/profile/{}">{}</a>: {} <small>{} likes, {} dislikes</small></li>"#,
            attr(&comment.user.username),
            esc(&comment.user.username),
            esc(&comment.content),
            comment.total_likes,
            comment.total_dislikes
        );
    }
    out.push_str("</ul>");
    out
}

pub fn profile_header(profile: &ProfileView) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        r#"<section class="profile"><img src="{}" alt="{}"><h1>{}</h1>"#,
        attr(&profile.profile_picture),
        attr(&profile.user.username),
        esc(&profile.user.username)
    );
    if let Some(bio) = profile.bio.as_deref().filter(|b| !b.is_empty()) {
        let _ = write!(out, "<p>{}</p>", esc(bio));
    }
    if let Some(age) = profile.age {
        let _ = write!(out, "<p>Age: {}</p>", age);
    }
    let _ = write!(
        out,
        "<p>{} followers · {} following</p></section>",
        profile.followers_count, profile.following_count
    );
    out
}

pub fn user_list(users: &[UserRef]) -> String {
    if users.is_empty() {
        return "<p>No users found.</p>".to_string();
    }
    let mut out = String::from("<ul>");
    for user in users {
        let _ = write!(
            out,
            r#"<li><a href="/profile/{}">{}</a></li>"#,
            attr(&user.username),
            esc(&user.username)
        );
    }
    out.push_str("</ul>");
    out
}

/// Previous/next links for a paged list. `base` is the page's path.
pub fn pager<T>(page: &Page<T>, base: &str) -> String {
    let mut out = String::new();
    if let Some(previous) = page.previous {
        let _ = write!(out, r#"<a href="{}?page={}">Newer</a> "#, attr(base), previous);
    }
    if let Some(next) = page.next {
        let _ = write!(out, r#"<a href="{}?page={}">Older</a>"#, attr(base), next);
    }
    if out.is_empty() {
        return out;
    }
    format!(r#"<nav class="pager">{}</nav>"#, out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Level;

    fn post(caption: &str) -> PostView {
        PostView {
            id: 7,
            uploader: UserRef {
                id: 1,
                username: "alice".into(),
            },
            caption: caption.into(),
            image: None,
            created_at: "2024-01-01 00:00:00".into(),
            updated_at: "2024-01-01 00:00:00".into(),
            total_likes: 2,
            comment_count: 0,
        }
    }

    #[test]
    fn test_post_card_escapes_caption() {
        let html = post_card(&post("<script>alert(1)</script>"), None);
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("/posts/7/like"));
    }

    #[test]
    fn test_post_card_like_buttons_for_viewer() {
        let html = post_card(&post("hi"), Some("bob"));
        assert!(html.contains(r#"action="/posts/7/like""#));
        assert!(html.contains(r#"action="/posts/7/unlike""#));
    }

    #[test]
    fn test_input_escapes_value() {
        let html = input(None, "username", "Username", "text", r#""><b>"#);
        assert!(!html.contains(r#""><b>"#));
    }

    #[test]
    fn test_field_errors() {
        let errors = FieldErrors::single("caption", "This field may not be blank.");
        assert!(field_errors(Some(&errors), "caption").contains("may not be blank"));
        assert!(field_errors(Some(&errors), "image").is_empty());
        assert!(field_errors(None, "caption").is_empty());
    }

    #[tokio::test]
    async fn test_page_consumes_flashes() {
        let mut session = Session::new();
        session.flash(Level::Success, "Welcome <back>");

        let response = page(&mut session, "Feed", "<p>body</p>");
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let html = String::from_utf8(bytes.to_vec()).unwrap();

        assert!(html.contains(r#"<li class="success">Welcome &lt;back&gt;</li>"#));
        assert!(session.take_messages().is_empty());
    }
}
