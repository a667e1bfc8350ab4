//! Account and session routes

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
};
use mealmates_auth::{AuthError, AuthUser, NewAccount, REFRESH_TOKEN_COOKIE, TokenPair, cookie_value};
use mealmates_db::User;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::cookies::{cleared_session_cookies, session_cookies};
use crate::error::ApiError;
use crate::response::{ApiResponse, JsonBody};
use crate::state::AppState;

use super::types::{
    ChangePasswordRequest, LoginRequest, LoginResponse, RefreshRequest, RegisterRequest,
    UserResponse,
};

/// Issue a pair for the user and make its refresh token the only valid one
async fn start_session(state: &AppState, user: &User) -> Result<TokenPair, ApiError> {
    let pair = state.tokens.issue_pair(user.id, user.role)?;
    state
        .credentials
        .set_refresh_token(user.id, Some(&pair.refresh_token))
        .await?;
    Ok(pair)
}

/// POST /api/users/register
async fn register(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<RegisterRequest>,
) -> Result<ApiResponse<UserResponse>, ApiError> {
    let profile = state
        .credentials
        .create_user(NewAccount {
            email: request.email,
            username: request.username,
            password: request.password,
            fullname: request.fullname,
            role: request.role,
        })
        .await?;

    Ok(ApiResponse::new(
        StatusCode::CREATED,
        profile.into(),
        "User registered Successfully",
    ))
}

/// POST /api/users/login
async fn login(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<LoginRequest>,
) -> Result<(HeaderMap, ApiResponse<LoginResponse>), ApiError> {
    debug!("Login attempt for: {}", request.email);

    let user = state
        .credentials
        .authenticate(&request.email, &request.password)
        .await?;
    let pair = start_session(&state, &user).await?;
    let cookies = session_cookies(&state.tokens, &pair)?;

    info!("User {} logged in successfully", user.username);

    Ok((
        cookies,
        ApiResponse::ok(
            LoginResponse {
                user: user.profile().into(),
                access_token: pair.access_token,
                refresh_token: pair.refresh_token,
            },
            "User logged in Successfully",
        ),
    ))
}

/// POST /api/users/logout
async fn logout(
    AuthUser(profile): AuthUser,
    State(state): State<AppState>,
) -> Result<(HeaderMap, ApiResponse<Value>), ApiError> {
    state.credentials.set_refresh_token(profile.id, None).await?;

    info!("User {} logged out", profile.username);

    Ok((
        cleared_session_cookies(),
        ApiResponse::ok(json!({}), "User logged Out"),
    ))
}

/// POST /api/users/refresh-token
///
/// The refresh token comes from the cookie or, failing that, the JSON body.
async fn refresh_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(HeaderMap, ApiResponse<TokenPair>), ApiError> {
    let incoming = cookie_value(&headers, REFRESH_TOKEN_COOKIE)
        .or_else(|| {
            serde_json::from_slice::<RefreshRequest>(&body)
                .ok()
                .and_then(|r| r.refresh_token)
        })
        .filter(|token| !token.trim().is_empty())
        .ok_or(AuthError::MissingToken)?;

    let pair = state.tokens.rotate(&state.credentials, incoming.trim()).await?;
    let cookies = session_cookies(&state.tokens, &pair)?;

    Ok((cookies, ApiResponse::ok(pair, "Access token refreshed")))
}

/// POST /api/users/change-password
async fn change_password(
    AuthUser(profile): AuthUser,
    State(state): State<AppState>,
    JsonBody(request): JsonBody<ChangePasswordRequest>,
) -> Result<(HeaderMap, ApiResponse<Value>), ApiError> {
    state
        .credentials
        .change_password(profile.id, &request.old_password, &request.new_password)
        .await?;

    // The stored refresh token is gone; drop the cookies to match
    Ok((
        cleared_session_cookies(),
        ApiResponse::ok(json!({}), "Password changed successfully"),
    ))
}

/// GET /api/users/current-user
async fn current_user(AuthUser(profile): AuthUser) -> ApiResponse<UserResponse> {
    ApiResponse::ok(profile.into(), "User fetched successfully")
}

/// GET /api/users/getAllUser
async fn list_users(
    _user: AuthUser,
    State(state): State<AppState>,
) -> Result<ApiResponse<Vec<UserResponse>>, ApiError> {
    let users = state.credentials.list_profiles().await?;

    Ok(ApiResponse::ok(
        users.into_iter().map(UserResponse::from).collect(),
        "Users fetched successfully",
    ))
}

/// Public auth routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh-token", post(refresh_token))
}

/// Routes behind the session middleware
pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/logout", post(logout))
        .route("/change-password", post(change_password))
        .route("/current-user", get(current_user))
        .route("/getAllUser", get(list_users))
}
