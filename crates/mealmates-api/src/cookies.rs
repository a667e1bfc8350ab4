//! Session cookies
//!
//! Login, refresh and logout all emit the same attribute set so browsers
//! on the separately hosted frontend keep sending both cookies.

use axum::http::{
    HeaderMap, HeaderValue,
    header::{InvalidHeaderValue, SET_COOKIE},
};
use mealmates_auth::{ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE, TokenPair, TokenService};

use crate::error::ApiError;

const COOKIE_ATTRIBUTES: &str = "Path=/; HttpOnly; Secure; SameSite=None";

fn cookie(name: &str, value: &str, max_age: i64) -> Result<HeaderValue, InvalidHeaderValue> {
    HeaderValue::from_str(&format!(
        "{name}={value}; {COOKIE_ATTRIBUTES}; Max-Age={max_age}"
    ))
}

/// `Set-Cookie` headers carrying a freshly issued pair
pub fn session_cookies(tokens: &TokenService, pair: &TokenPair) -> Result<HeaderMap, ApiError> {
    let access = cookie(ACCESS_TOKEN_COOKIE, &pair.access_token, tokens.access_ttl_secs());
    let refresh = cookie(REFRESH_TOKEN_COOKIE, &pair.refresh_token, tokens.refresh_ttl_secs());

    let mut headers = HeaderMap::new();
    headers.append(
        SET_COOKIE,
        access.map_err(|e| ApiError::Internal(format!("Invalid access cookie: {}", e)))?,
    );
    headers.append(
        SET_COOKIE,
        refresh.map_err(|e| ApiError::Internal(format!("Invalid refresh cookie: {}", e)))?,
    );
    Ok(headers)
}

/// `Set-Cookie` headers expiring both session cookies
pub fn cleared_session_cookies() -> HeaderMap {
    let mut headers = HeaderMap::new();
    for name in [ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE] {
        if let Ok(value) = cookie(name, "", 0) {
            headers.append(SET_COOKIE, value);
        }
    }
    headers
}
