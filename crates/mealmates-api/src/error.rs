//! API error types

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(#[from] mealmates_db::DbError),

    #[error("Auth error: {0}")]
    Auth(#[from] mealmates_auth::AuthError),

    #[error("Gateway error: {0}")]
    Gateway(#[from] mealmates_gateway::GatewayError),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl ApiError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            ApiError::Database(e) => match e {
                mealmates_db::DbError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
                mealmates_db::DbError::Duplicate(msg) => {
                    (StatusCode::CONFLICT, format!("{} already exists", msg))
                }
                _ => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                ),
            },
            ApiError::Auth(e) => (e.status(), e.public_message()),
            ApiError::Gateway(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "External service error".to_string(),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }

        let body = axum::Json(json!({
            "statusCode": status.as_u16(),
            "message": message,
            "success": false
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use mealmates_auth::AuthError;
    use mealmates_db::DbError;

    async fn render(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_error_envelope() {
        let (status, body) = render(ApiError::BadRequest("Amount is required".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["statusCode"], 400);
        assert_eq!(body["message"], "Amount is required");
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_auth_errors_keep_their_status() {
        let (status, body) = render(AuthError::RefreshTokenReused.into()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Refresh token is expired or used");

        let (status, _) = render(AuthError::Conflict("taken".into()).into()).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_database_errors() {
        let (status, body) = render(DbError::Duplicate("Checkout session 'cs_1'".into()).into()).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["message"], "Checkout session 'cs_1' already exists");

        let (status, _) = render(DbError::NotFound("Payment: 3".into()).into()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
