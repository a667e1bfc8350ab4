//! Meal Mates Database Layer
//!
//! This crate provides the persistence layer for the Meal Mates backend,
//! using SQLite via sqlx for users, payments and food complaints.

pub mod error;
pub mod models;
pub mod repository;
pub mod utils;

pub use error::DbError;
pub use models::*;
pub use repository::Database;

/// Re-export sqlx types for convenience
pub use sqlx::SqlitePool;
