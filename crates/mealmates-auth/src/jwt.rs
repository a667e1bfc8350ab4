//! JWT token management
//!
//! Access and refresh tokens are HS256 JWTs signed with two different
//! secrets. Access tokens are stateless; the current refresh token of each
//! user is stored on the user row and is exchanged exactly once.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use mealmates_db::UserRole;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::credentials::CredentialStore;
use crate::error::AuthError;

/// Access token claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AccessClaims {
    /// Subject (user ID)
    pub sub: String,
    /// User role
    pub role: UserRole,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Unique token ID
    pub jti: String,
}

impl AccessClaims {
    pub fn user_id(&self) -> Result<i64, AuthError> {
        self.sub.parse().map_err(|_| AuthError::InvalidToken)
    }
}

/// Refresh token claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RefreshClaims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
    /// Makes two refresh tokens issued in the same second distinct
    pub jti: String,
}

impl RefreshClaims {
    pub fn user_id(&self) -> Result<i64, AuthError> {
        self.sub.parse().map_err(|_| AuthError::InvalidRefreshToken)
    }
}

/// Freshly issued access/refresh token pair
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Token signing configuration
#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

/// Issues, verifies and rotates token pairs
pub struct TokenService {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
    validation: Validation,
}

impl TokenService {
    /// Create a new token service
    pub fn new(config: &TokenConfig) -> Self {
        if config.access_secret == config.refresh_secret {
            warn!("Access and refresh tokens share a signing secret");
        }

        Self {
            access_encoding: EncodingKey::from_secret(config.access_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(config.access_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(config.refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(config.refresh_secret.as_bytes()),
            access_ttl: config.access_ttl,
            refresh_ttl: config.refresh_ttl,
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Access token lifetime in seconds
    pub fn access_ttl_secs(&self) -> i64 {
        self.access_ttl.num_seconds()
    }

    /// Refresh token lifetime in seconds
    pub fn refresh_ttl_secs(&self) -> i64 {
        self.refresh_ttl.num_seconds()
    }

    /// Generate a new access/refresh token pair for a user
    pub fn issue_pair(&self, user_id: i64, role: UserRole) -> Result<TokenPair, AuthError> {
        let now = Utc::now();

        let access = AccessClaims {
            sub: user_id.to_string(),
            role,
            exp: (now + self.access_ttl).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };
        let refresh = RefreshClaims {
            sub: user_id.to_string(),
            exp: (now + self.refresh_ttl).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        debug!("Issuing token pair for user: {}", user_id);

        Ok(TokenPair {
            access_token: encode(&Header::default(), &access, &self.access_encoding)?,
            refresh_token: encode(&Header::default(), &refresh, &self.refresh_encoding)?,
        })
    }

    /// Validate an access token and return its claims
    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, AuthError> {
        decode::<AccessClaims>(token, &self.access_decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken,
            })
    }

    /// Validate a refresh token's signature and expiry
    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, AuthError> {
        decode::<RefreshClaims>(token, &self.refresh_decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::RefreshTokenReused,
                _ => AuthError::InvalidRefreshToken,
            })
    }

    /// Exchange a refresh token for a new pair
    ///
    /// The presented token must be the one currently stored for its user.
    /// The swap is conditional on that stored value, so of two requests
    /// presenting the same token only one can win.
    pub async fn rotate(
        &self,
        store: &CredentialStore,
        presented: &str,
    ) -> Result<TokenPair, AuthError> {
        let claims = self.verify_refresh(presented)?;
        let user_id = claims.user_id()?;

        let user = match store.find_by_id(user_id).await {
            Ok(user) => user,
            Err(AuthError::UserNotFound) => return Err(AuthError::InvalidRefreshToken),
            Err(e) => return Err(e),
        };

        if user.refresh_token.as_deref() != Some(presented) {
            warn!("Rejected stale refresh token for user {}", user.username);
            return Err(AuthError::RefreshTokenReused);
        }

        let pair = self.issue_pair(user.id, user.role)?;
        if !store
            .replace_refresh_token(user.id, presented, &pair.refresh_token)
            .await?
        {
            warn!("Refresh token for user {} was rotated concurrently", user.username);
            return Err(AuthError::RefreshTokenReused);
        }

        info!("Rotated session for user {}", user.username);
        Ok(pair)
    }
}
