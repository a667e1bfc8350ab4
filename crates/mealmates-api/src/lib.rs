//! Meal Mates REST API
//!
//! This crate provides the Axum-based HTTP API: account and session
//! endpoints, food complaints and checkout payments, all under `/api/users`.

pub mod cookies;
pub mod error;
pub mod response;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use response::{ApiResponse, JsonBody};
pub use routes::create_router;
pub use state::AppState;
