//! API routes

mod auth;
mod complaints;
mod health;
mod payments;
pub mod types;

#[cfg(test)]
mod tests;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{
        HeaderValue, Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    middleware::from_fn_with_state,
};
use mealmates_auth::session_middleware;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::warn;

use crate::state::AppState;

/// Request bodies are small JSON documents
const BODY_LIMIT: usize = 16 * 1024;

/// CORS for the configured frontends, with credentials so cookies flow
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
}

/// Create the main router
pub fn create_router(state: AppState, allowed_origins: &[String]) -> Router {
    let protected = Router::new()
        .merge(auth::protected_routes())
        .merge(payments::protected_routes())
        .route_layer(from_fn_with_state(state.session_guard(), session_middleware));

    let users = Router::new()
        .merge(auth::routes())
        .merge(complaints::routes())
        .merge(payments::routes())
        .merge(protected);

    Router::new()
        // Health check
        .merge(health::routes())
        .nest("/api/users", users)
        .with_state(state)
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(cors_layer(allowed_origins))
}
