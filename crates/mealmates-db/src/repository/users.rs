//! User operations

use chrono::Utc;
use sqlx::Row;

use crate::error::DbError;
use crate::models::{NewUser, User, UserProfile};
use crate::repository::Database;

const USER_COLUMNS: &str =
    "id, email, username, fullname, password_hash, role, refresh_token, created_at, updated_at";
const PROFILE_COLUMNS: &str = "id, email, username, fullname, role, created_at, updated_at";

impl Database {
    // ==================== User Operations ====================

    /// Insert a new user
    ///
    /// Fails with `Duplicate` when either the username or the email is taken.
    pub async fn insert_user(&self, user: NewUser) -> Result<UserProfile, DbError> {
        let now = Utc::now();

        if self
            .find_user_by_username_or_email(&user.username, &user.email)
            .await?
            .is_some()
        {
            return Err(DbError::Duplicate(format!(
                "User with email '{}' or username '{}'",
                user.email, user.username
            )));
        }

        let result = sqlx::query(
            r#"
            INSERT INTO users (email, username, fullname, password_hash, role, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.fullname)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .fetch_one(&self.pool)
        .await
        // Two registrations can pass the lookup above at the same time
        .map_err(|e| DbError::from_insert(e, &format!("User '{}'", user.username)))?;

        let id: i64 = result.get("id");

        Ok(UserProfile {
            id,
            email: user.email,
            username: user.username,
            fullname: user.fullname,
            role: user.role,
            created_at: now,
            updated_at: now,
        })
    }

    /// Get a user matching either the username or the email
    pub async fn find_user_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<User>, DbError> {
        let result = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ? OR email = ? LIMIT 1"
        ))
        .bind(username)
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        result.map(|row| User::try_from(&row).map_err(DbError::from)).transpose()
    }

    /// Get a user by email
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DbError> {
        let result = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        result.map(|row| User::try_from(&row).map_err(DbError::from)).transpose()
    }

    /// Get a user by ID
    pub async fn get_user_by_id(&self, id: i64) -> Result<Option<User>, DbError> {
        let result = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        result.map(|row| User::try_from(&row).map_err(DbError::from)).transpose()
    }

    /// Get a user profile by ID; secret columns are never selected
    pub async fn get_user_profile(&self, id: i64) -> Result<Option<UserProfile>, DbError> {
        let result = sqlx::query(&format!("SELECT {PROFILE_COLUMNS} FROM users WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        result
            .map(|row| UserProfile::try_from(&row).map_err(DbError::from))
            .transpose()
    }

    /// List all user profiles
    pub async fn list_user_profiles(&self) -> Result<Vec<UserProfile>, DbError> {
        let rows = sqlx::query(&format!("SELECT {PROFILE_COLUMNS} FROM users ORDER BY username"))
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| UserProfile::try_from(row).map_err(DbError::from))
            .collect()
    }

    /// Set or clear the stored refresh token
    pub async fn set_refresh_token(&self, id: i64, token: Option<&str>) -> Result<bool, DbError> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE users
            SET refresh_token = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(token)
        .bind(now.to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Replace the stored refresh token only if it still equals `expected`
    ///
    /// Returns `false` when another request already rotated or cleared it.
    pub async fn replace_refresh_token(
        &self,
        id: i64,
        expected: &str,
        replacement: &str,
    ) -> Result<bool, DbError> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE users
            SET refresh_token = ?, updated_at = ?
            WHERE id = ? AND refresh_token = ?
            "#,
        )
        .bind(replacement)
        .bind(now.to_rfc3339())
        .bind(id)
        .bind(expected)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Update user password and drop any outstanding refresh token
    pub async fn update_user_password(&self, id: i64, password_hash: &str) -> Result<bool, DbError> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = ?, refresh_token = NULL, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(password_hash)
        .bind(now.to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
