//! Cookie parsing and `Set-Cookie` formatting.

use axum::http::{HeaderMap, header};

/// Extract a cookie value from the Cookie header.
pub fn get_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;
    for part in cookie_header.split(';') {
        let part = part.trim();
        if let Some((key, value)) = part.split_once('=') {
            if key.trim() == name {
                return Some(value.trim());
            }
        }
    }
    None
}

/// `Set-Cookie` value for an HttpOnly, SameSite=Lax cookie on `/`.
pub fn set_cookie(name: &str, value: &str, max_age_secs: u64, secure: bool) -> String {
    format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}{}",
        name,
        value,
        max_age_secs,
        if secure { "; Secure" } else { "" }
    )
}

/// `Set-Cookie` value that removes the cookie.
pub fn clear_cookie(name: &str, secure: bool) -> String {
    set_cookie(name, "", 0, secure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_get_cookie_simple() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("sessionid=abc123"));

        assert_eq!(get_cookie(&headers, "sessionid"), Some("abc123"));
    }

    #[test]
    fn test_get_cookie_multiple() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("foo=bar; sessionid=abc123; csrftoken=xyz789"),
        );

        assert_eq!(get_cookie(&headers, "sessionid"), Some("abc123"));
        assert_eq!(get_cookie(&headers, "csrftoken"), Some("xyz789"));
        assert_eq!(get_cookie(&headers, "foo"), Some("bar"));
    }

    #[test]
    fn test_get_cookie_not_found() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("foo=bar"));

        assert_eq!(get_cookie(&headers, "sessionid"), None);
        assert_eq!(get_cookie(&HeaderMap::new(), "sessionid"), None);
    }

    #[test]
    fn test_get_cookie_with_spaces() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("  sessionid = abc123  ; foo=bar"),
        );

        assert_eq!(get_cookie(&headers, "sessionid"), Some("abc123"));
    }

    #[test]
    fn test_set_and_clear_cookie() {
        assert_eq!(
            set_cookie("sessionid", "abc", 60, false),
            "sessionid=abc; HttpOnly; SameSite=Lax; Path=/; Max-Age=60"
        );
        assert_eq!(
            clear_cookie("sessionid", true),
            "sessionid=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0; Secure"
        );
    }
}
