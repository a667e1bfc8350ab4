//! Authentication error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use mealmates_db::DbError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Invalid user credentials")]
    InvalidCredentials,

    #[error("Unauthorized request")]
    MissingToken,

    #[error("Invalid access token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid refresh token")]
    InvalidRefreshToken,

    #[error("Refresh token is expired or used")]
    RefreshTokenReused,

    #[error("User does not exist")]
    UserNotFound,

    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// HTTP status this error maps to
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::Conflict(_) => StatusCode::CONFLICT,
            AuthError::InvalidCredentials
            | AuthError::MissingToken
            | AuthError::InvalidToken
            | AuthError::TokenExpired
            | AuthError::InvalidRefreshToken
            | AuthError::RefreshTokenReused => StatusCode::UNAUTHORIZED,
            AuthError::UserNotFound => StatusCode::NOT_FOUND,
            AuthError::Database(DbError::Duplicate(_)) => StatusCode::CONFLICT,
            AuthError::Database(DbError::NotFound(_)) => StatusCode::NOT_FOUND,
            AuthError::PasswordHash(_)
            | AuthError::Jwt(_)
            | AuthError::Database(_)
            | AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the client
    pub fn public_message(&self) -> String {
        if self.status().is_server_error() {
            "Internal error".to_string()
        } else {
            self.to_string()
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Authentication failure: {}", self);
        }

        let body = axum::Json(json!({
            "statusCode": status.as_u16(),
            "message": self.public_message(),
            "success": false
        }));

        (status, body).into_response()
    }
}
