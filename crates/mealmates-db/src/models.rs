//! Database models

use crate::utils::parse_datetime_or_now;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Row;
use std::fmt;
use std::str::FromStr;

/// Error type for parsing models from strings
#[derive(Debug, Clone)]
pub enum ParseError {
    InvalidUserRole(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::InvalidUserRole(s) => write!(f, "Invalid user role: {}", s),
        }
    }
}

impl std::error::Error for ParseError {}

/// User role
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Resident,
    Volunteer,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Resident => "resident",
            UserRole::Volunteer => "volunteer",
            UserRole::Admin => "admin",
        }
    }
}

impl FromStr for UserRole {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "resident" => Ok(UserRole::Resident),
            "volunteer" => Ok(UserRole::Volunteer),
            "admin" => Ok(UserRole::Admin),
            _ => Err(ParseError::InvalidUserRole(s.to_string())),
        }
    }
}

/// Full user record, including credential and session columns.
///
/// Only the credential store works with this type; anything handed to a
/// caller outside the auth layer is a [`UserProfile`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub fullname: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: UserRole,
    #[serde(skip_serializing)]
    pub refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Drop the secret columns
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            email: self.email.clone(),
            username: self.username.clone(),
            fullname: self.fullname.clone(),
            role: self.role,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Public view of a user; has no secret fields at all
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub fullname: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// New user (for insertion)
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub fullname: String,
    pub password_hash: String,
    pub role: UserRole,
}

/// Food complaint submitted by a resident
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Complaint {
    pub id: i64,
    pub locality: String,
    pub food_type: String,
    pub food_description: Option<String>,
    pub image: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub map_api: Option<String>,
    pub date: DateTime<Utc>,
    pub mobile_no: String,
    pub created_at: DateTime<Utc>,
}

/// New complaint (for insertion)
#[derive(Debug, Clone)]
pub struct NewComplaint {
    pub locality: String,
    pub food_type: String,
    pub food_description: Option<String>,
    pub image: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub map_api: Option<String>,
    pub date: DateTime<Utc>,
    pub mobile_no: String,
}

/// Donation recorded against a checkout session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub name: String,
    pub email: String,
    /// Whole rupees
    pub amount: i64,
    pub message: Option<String>,
    pub checkout_session_id: String,
    pub created_at: DateTime<Utc>,
}

/// New payment (for insertion)
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub name: String,
    pub email: String,
    pub amount: i64,
    pub message: Option<String>,
    pub checkout_session_id: String,
}

// ==================== TryFrom Implementations ====================

impl TryFrom<&sqlx::sqlite::SqliteRow> for User {
    type Error = sqlx::Error;

    fn try_from(row: &sqlx::sqlite::SqliteRow) -> Result<Self, Self::Error> {
        let role_str: String = row.try_get("role")?;
        Ok(User {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            username: row.try_get("username")?,
            fullname: row.try_get("fullname")?,
            password_hash: row.try_get("password_hash")?,
            role: UserRole::from_str(&role_str).unwrap_or(UserRole::Resident),
            refresh_token: row.try_get("refresh_token")?,
            created_at: parse_datetime_or_now(&row.try_get::<String, _>("created_at")?),
            updated_at: parse_datetime_or_now(&row.try_get::<String, _>("updated_at")?),
        })
    }
}

impl TryFrom<&sqlx::sqlite::SqliteRow> for UserProfile {
    type Error = sqlx::Error;

    fn try_from(row: &sqlx::sqlite::SqliteRow) -> Result<Self, Self::Error> {
        let role_str: String = row.try_get("role")?;
        Ok(UserProfile {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            username: row.try_get("username")?,
            fullname: row.try_get("fullname")?,
            role: UserRole::from_str(&role_str).unwrap_or(UserRole::Resident),
            created_at: parse_datetime_or_now(&row.try_get::<String, _>("created_at")?),
            updated_at: parse_datetime_or_now(&row.try_get::<String, _>("updated_at")?),
        })
    }
}

impl TryFrom<&sqlx::sqlite::SqliteRow> for Complaint {
    type Error = sqlx::Error;

    fn try_from(row: &sqlx::sqlite::SqliteRow) -> Result<Self, Self::Error> {
        Ok(Complaint {
            id: row.try_get("id")?,
            locality: row.try_get("locality")?,
            food_type: row.try_get("food_type")?,
            food_description: row.try_get("food_description")?,
            image: row.try_get("image")?,
            latitude: row.try_get("latitude")?,
            longitude: row.try_get("longitude")?,
            map_api: row.try_get("map_api")?,
            date: parse_datetime_or_now(&row.try_get::<String, _>("date")?),
            mobile_no: row.try_get("mobile_no")?,
            created_at: parse_datetime_or_now(&row.try_get::<String, _>("created_at")?),
        })
    }
}

impl TryFrom<&sqlx::sqlite::SqliteRow> for Payment {
    type Error = sqlx::Error;

    fn try_from(row: &sqlx::sqlite::SqliteRow) -> Result<Self, Self::Error> {
        Ok(Payment {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            amount: row.try_get("amount")?,
            message: row.try_get("message")?,
            checkout_session_id: row.try_get("checkout_session_id")?,
            created_at: parse_datetime_or_now(&row.try_get::<String, _>("created_at")?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_role_parsing() {
        assert_eq!("resident".parse::<UserRole>().unwrap(), UserRole::Resident);
        assert_eq!(" Volunteer ".parse::<UserRole>().unwrap(), UserRole::Volunteer);
        assert_eq!("ADMIN".parse::<UserRole>().unwrap(), UserRole::Admin);
        assert!("superuser".parse::<UserRole>().is_err());
    }

    #[test]
    fn test_user_serialization_skips_secrets() {
        let now = Utc::now();
        let user = User {
            id: 1,
            email: "a@x.com".to_string(),
            username: "alice".to_string(),
            fullname: "Alice".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            role: UserRole::Resident,
            refresh_token: Some("token".to_string()),
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert!(json.get("refresh_token").is_none());
        assert_eq!(json["role"], "resident");

        let profile = user.profile();
        assert_eq!(profile.username, "alice");
        assert_eq!(profile.role, UserRole::Resident);
    }
}
