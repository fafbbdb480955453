//! Session cookie handling.
//!
//! The signed session token travels in an `HttpOnly` cookie named `token`.
//! The cookie is `Secure` and `SameSite=None` so the browser sends it on
//! cross-site requests from the configured frontend origins.

use axum::http::{HeaderMap, HeaderValue, header};
use tower_sessions::cookie::time::Duration;
use tower_sessions::cookie::{Cookie, SameSite};

use crate::services::TOKEN_LIFETIME_SECS;

/// Session cookie name.
pub const TOKEN_COOKIE_NAME: &str = "token";

fn base_cookie(value: String) -> tower_sessions::cookie::CookieBuilder<'static> {
    Cookie::build((TOKEN_COOKIE_NAME, value))
        .http_only(true)
        .secure(true)
        .same_site(SameSite::None)
        .path("/")
}

/// Build the cookie carrying a freshly issued token.
#[must_use]
pub fn session_cookie(token: String) -> Cookie<'static> {
    base_cookie(token)
        .max_age(Duration::seconds(TOKEN_LIFETIME_SECS))
        .build()
}

/// Build a cookie that makes the browser drop the session token.
#[must_use]
pub fn cleared_session_cookie() -> Cookie<'static> {
    base_cookie(String::new()).max_age(Duration::ZERO).build()
}

/// Render a cookie as a `Set-Cookie` header value.
///
/// Returns `None` if the cookie contains bytes not allowed in a header.
#[must_use]
pub fn set_cookie_value(cookie: &Cookie<'_>) -> Option<HeaderValue> {
    HeaderValue::from_str(&cookie.to_string()).ok()
}

/// Find the session token among the request's `Cookie` headers.
#[must_use]
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == TOKEN_COOKIE_NAME)
        .map(|cookie| cookie.value().to_owned())
        .filter(|token| !token.is_empty())
}
