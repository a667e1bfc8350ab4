//! Session middleware for Axum

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{
        HeaderMap,
        header::{AUTHORIZATION, COOKIE},
        request::Parts,
    },
    middleware::Next,
    response::Response,
};
use mealmates_db::UserProfile;
use std::sync::Arc;
use tracing::debug;

use crate::credentials::CredentialStore;
use crate::error::AuthError;
use crate::jwt::TokenService;

pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

/// Authenticated user, attached to the request by [`session_middleware`]
#[derive(Debug, Clone)]
pub struct AuthUser(pub UserProfile);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AuthError::MissingToken)
    }
}

/// State needed to authenticate a request
#[derive(Clone)]
pub struct SessionGuard {
    tokens: Arc<TokenService>,
    store: CredentialStore,
}

impl SessionGuard {
    pub fn new(tokens: Arc<TokenService>, store: CredentialStore) -> Self {
        Self { tokens, store }
    }
}

/// Read a cookie from the request's `Cookie` headers
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))?
        .trim();
    (!token.is_empty()).then(|| token.to_string())
}

/// Access token from the `accessToken` cookie, falling back to a bearer header
pub fn extract_access_token(headers: &HeaderMap) -> Option<String> {
    cookie_value(headers, ACCESS_TOKEN_COOKIE).or_else(|| bearer_token(headers))
}

/// Session middleware
///
/// Rejects the request with 401 unless it carries a valid access token for
/// an existing user. On success the user's profile is added to the request
/// extensions as [`AuthUser`].
pub async fn session_middleware(
    State(guard): State<SessionGuard>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = extract_access_token(request.headers()).ok_or(AuthError::MissingToken)?;
    let claims = guard.tokens.verify_access(&token)?;

    let profile = match guard.store.profile(claims.user_id()?).await {
        Ok(profile) => profile,
        Err(AuthError::UserNotFound) => return Err(AuthError::InvalidToken),
        Err(e) => return Err(e),
    };

    debug!(
        "Authenticated user: {} ({})",
        profile.username,
        profile.role.as_str()
    );

    request.extensions_mut().insert(AuthUser(profile));
    Ok(next.run(request).await)
}
