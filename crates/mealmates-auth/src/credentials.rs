//! Credential store
//!
//! Wraps the user table with the rules around it: input validation,
//! uniqueness, password hashing and the stored refresh token.

use mealmates_db::{Database, DbError, NewUser, User, UserProfile, UserRole};
use tracing::{debug, info};

use crate::error::AuthError;
use crate::password::{hash_password, verify_password};

/// Registration input, as received from the client
#[derive(Debug, Clone, Default)]
pub struct NewAccount {
    pub email: String,
    pub username: String,
    pub password: String,
    pub fullname: String,
    pub role: String,
}

/// User persistence with password and session-token handling
#[derive(Clone)]
pub struct CredentialStore {
    db: Database,
}

impl CredentialStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Register a new user
    ///
    /// Every field must be non-blank. The username is stored lowercased and
    /// the password only as an Argon2 hash.
    pub async fn create_user(&self, account: NewAccount) -> Result<UserProfile, AuthError> {
        let fields = [
            &account.email,
            &account.username,
            &account.password,
            &account.fullname,
            &account.role,
        ];
        if fields.iter().any(|field| field.trim().is_empty()) {
            return Err(AuthError::Validation("All fields are required".to_string()));
        }

        let role: UserRole = account
            .role
            .parse()
            .map_err(|_| AuthError::Validation(format!("Invalid role: {}", account.role)))?;

        let username = account.username.trim().to_lowercase();
        debug!("Registering user: {}", username);

        let password_hash = hash_blocking(account.password).await?;

        let profile = self
            .db
            .insert_user(NewUser {
                email: account.email.trim().to_string(),
                username,
                fullname: account.fullname.trim().to_string(),
                password_hash,
                role,
            })
            .await
            .map_err(|e| match e {
                DbError::Duplicate(_) => {
                    AuthError::Conflict("User exist with this email/username".to_string())
                }
                other => AuthError::Database(other),
            })?;

        info!("Registered user: {}", profile.username);
        Ok(profile)
    }

    /// Check a plaintext password against the user's stored hash
    pub async fn verify_password(&self, user: &User, plaintext: &str) -> Result<bool, AuthError> {
        let hash = user.password_hash.clone();
        let plaintext = plaintext.to_string();
        tokio::task::spawn_blocking(move || verify_password(&plaintext, &hash))
            .await
            .map_err(|e| AuthError::Internal(format!("Password verification task failed: {}", e)))?
    }

    /// Look up a user by email and check the password
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = email.trim();
        if email.is_empty() {
            return Err(AuthError::Validation("Email is required".to_string()));
        }

        let user = self.find_by_email(email).await?;
        if !self.verify_password(&user, password).await? {
            debug!("Password mismatch for user: {}", user.username);
            return Err(AuthError::InvalidCredentials);
        }
        Ok(user)
    }

    /// Store or clear the user's refresh token
    pub async fn set_refresh_token(&self, user_id: i64, token: Option<&str>) -> Result<(), AuthError> {
        if self.db.set_refresh_token(user_id, token).await? {
            Ok(())
        } else {
            Err(AuthError::UserNotFound)
        }
    }

    /// Swap the stored refresh token if it still equals `expected`
    pub(crate) async fn replace_refresh_token(
        &self,
        user_id: i64,
        expected: &str,
        replacement: &str,
    ) -> Result<bool, AuthError> {
        Ok(self
            .db
            .replace_refresh_token(user_id, expected, replacement)
            .await?)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<User, AuthError> {
        self.db
            .get_user_by_email(email)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    pub async fn find_by_id(&self, user_id: i64) -> Result<User, AuthError> {
        self.db
            .get_user_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    /// Public profile of a user
    pub async fn profile(&self, user_id: i64) -> Result<UserProfile, AuthError> {
        self.db
            .get_user_profile(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    pub async fn list_profiles(&self) -> Result<Vec<UserProfile>, AuthError> {
        Ok(self.db.list_user_profiles().await?)
    }

    /// Replace the password after checking the old one
    ///
    /// Revokes the stored refresh token, so every session has to log in again.
    pub async fn change_password(
        &self,
        user_id: i64,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        if new_password.trim().is_empty() {
            return Err(AuthError::Validation("New password is required".to_string()));
        }

        let user = self.find_by_id(user_id).await?;
        if !self.verify_password(&user, old_password).await? {
            return Err(AuthError::Validation("Invalid old password".to_string()));
        }

        let password_hash = hash_blocking(new_password.to_string()).await?;
        if !self.db.update_user_password(user_id, &password_hash).await? {
            return Err(AuthError::UserNotFound);
        }

        info!("Password changed for user: {}", user.username);
        Ok(())
    }
}

async fn hash_blocking(password: String) -> Result<String, AuthError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AuthError::Internal(format!("Password hashing task failed: {}", e)))?
}
