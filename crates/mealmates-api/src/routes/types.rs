//! Request/Response DTOs

use mealmates_db::{Complaint, Payment, UserProfile};
use serde::{Deserialize, Serialize};

// ==================== Shared ====================

/// A value clients send either as a JSON number or as a string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NumberOrString {
    Number(serde_json::Number),
    Text(String),
}

impl NumberOrString {
    pub fn as_text(&self) -> String {
        match self {
            NumberOrString::Number(n) => n.to_string(),
            NumberOrString::Text(s) => s.trim().to_string(),
        }
    }
}

// ==================== Auth Types ====================

/// Registration request; missing fields count as blank
#[derive(Deserialize, Default)]
#[serde(default)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub fullname: String,
    pub username: String,
    pub role: String,
}

/// Login request
#[derive(Deserialize, Default)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Refresh request body, for clients that don't send cookies
#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

/// Change password request
#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

/// User response (without password or session token)
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub fullname: String,
    pub role: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<UserProfile> for UserResponse {
    fn from(u: UserProfile) -> Self {
        Self {
            id: u.id,
            email: u.email,
            username: u.username,
            fullname: u.fullname,
            role: u.role.as_str().to_string(),
            created_at: u.created_at.to_rfc3339(),
            updated_at: u.updated_at.to_rfc3339(),
        }
    }
}

/// Login response
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: UserResponse,
    pub access_token: String,
    pub refresh_token: String,
}

// ==================== Complaint Types ====================

/// Food complaint submission
#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct ComplaintRequest {
    pub locality: String,
    pub food_type: String,
    pub food_description: Option<String>,
    #[serde(alias = "selectedImage")]
    pub image: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(rename = "mapAPI")]
    pub map_api: Option<String>,
    pub date: Option<String>,
    pub mobile_no: Option<NumberOrString>,
}

/// Stored complaint
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplaintResponse {
    pub id: i64,
    pub locality: String,
    pub food_type: String,
    pub food_description: Option<String>,
    pub image: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(rename = "mapAPI")]
    pub map_api: Option<String>,
    pub date: String,
    pub mobile_no: String,
    pub created_at: String,
}

impl From<Complaint> for ComplaintResponse {
    fn from(c: Complaint) -> Self {
        Self {
            id: c.id,
            locality: c.locality,
            food_type: c.food_type,
            food_description: c.food_description,
            image: c.image,
            latitude: c.latitude,
            longitude: c.longitude,
            map_api: c.map_api,
            date: c.date.to_rfc3339(),
            mobile_no: c.mobile_no,
            created_at: c.created_at.to_rfc3339(),
        }
    }
}

// ==================== Payment Types ====================

/// Checkout session request
#[derive(Deserialize, Default)]
#[serde(default)]
pub struct CheckoutSessionRequest {
    pub name: String,
    pub email: String,
    pub amount: Option<NumberOrString>,
    pub message: Option<String>,
}

/// Created checkout session
#[derive(Serialize)]
pub struct CheckoutSessionResponse {
    pub id: String,
    pub url: Option<String>,
}

/// Recorded payment
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub amount: i64,
    pub message: Option<String>,
    pub checkout_session_id: String,
    pub created_at: String,
}

impl From<Payment> for PaymentResponse {
    fn from(p: Payment) -> Self {
        Self {
            id: p.id,
            name: p.name,
            email: p.email,
            amount: p.amount,
            message: p.message,
            checkout_session_id: p.checkout_session_id,
            created_at: p.created_at.to_rfc3339(),
        }
    }
}
