//! Meal Mates Authentication
//!
//! This crate owns the account lifecycle: Argon2 password hashing, the
//! credential store, JWT access/refresh token pairs with single-use
//! rotation, and the session middleware guarding protected routes.

pub mod credentials;
pub mod error;
pub mod jwt;
pub mod middleware;
pub mod password;

pub use credentials::{CredentialStore, NewAccount};
pub use error::AuthError;
pub use jwt::{AccessClaims, RefreshClaims, TokenConfig, TokenPair, TokenService};
pub use middleware::{
    ACCESS_TOKEN_COOKIE, AuthUser, REFRESH_TOKEN_COOKIE, SessionGuard, cookie_value,
    extract_access_token, session_middleware,
};
pub use password::{hash_password, verify_password};
