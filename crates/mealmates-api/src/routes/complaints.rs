//! Food complaint routes

use axum::{
    Router,
    extract::State,
    routing::{get, post},
};
use chrono::Utc;
use mealmates_db::{NewComplaint, utils::parse_client_date};
use tracing::{debug, info, warn};

use crate::error::ApiError;
use crate::response::{ApiResponse, JsonBody};
use crate::state::AppState;

use super::types::{ComplaintRequest, ComplaintResponse};

const CONFIRMATION_TEXT: &str = "Your food complaint is registered successfully!!";

fn required(value: &str, field: &str) -> Result<String, ApiError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ApiError::BadRequest(format!("{} is required", field)));
    }
    Ok(value.to_string())
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// POST /api/users/register-complaint
///
/// The complaint is stored first; the confirmation SMS goes out in the
/// background and its outcome never reaches the client.
async fn register_complaint(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<ComplaintRequest>,
) -> Result<ApiResponse<ComplaintResponse>, ApiError> {
    let locality = required(&request.locality, "Locality")?;
    let food_type = required(&request.food_type, "Food type")?;
    let mobile_no = required(
        &request.mobile_no.map(|m| m.as_text()).unwrap_or_default(),
        "Mobile number",
    )?;

    let date = match optional(request.date) {
        Some(raw) => parse_client_date(&raw)
            .ok_or_else(|| ApiError::BadRequest(format!("Invalid date: {}", raw)))?,
        None => Utc::now(),
    };

    let complaint = state
        .db
        .insert_complaint(NewComplaint {
            locality,
            food_type,
            food_description: optional(request.food_description),
            image: optional(request.image),
            latitude: request.latitude,
            longitude: request.longitude,
            map_api: optional(request.map_api),
            date,
            mobile_no,
        })
        .await?;

    info!("Registered complaint {} in {}", complaint.id, complaint.locality);

    match state.sms.clone() {
        Some(sms) => {
            let to = complaint.mobile_no.clone();
            tokio::spawn(async move {
                match sms.send(&to, CONFIRMATION_TEXT).await {
                    Ok(()) => debug!("Confirmation SMS sent to {}", to),
                    Err(e) => warn!("Failed to send confirmation SMS to {}: {}", to, e),
                }
            });
        }
        None => debug!("SMS not configured, skipping confirmation"),
    }

    Ok(ApiResponse::ok(
        complaint.into(),
        "Complaint Registered successfully!",
    ))
}

/// GET /api/users/get-complaint
async fn list_complaints(
    State(state): State<AppState>,
) -> Result<ApiResponse<Vec<ComplaintResponse>>, ApiError> {
    let complaints = state.db.list_complaints().await?;

    Ok(ApiResponse::ok(
        complaints.into_iter().map(ComplaintResponse::from).collect(),
        "List of registered complaints by the residents",
    ))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register-complaint", post(register_complaint))
        .route("/get-complaint", get(list_complaints))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_trims() {
        assert_eq!(required("  Andheri ", "Locality").unwrap(), "Andheri");
        assert!(matches!(
            required("   ", "Locality"),
            Err(ApiError::BadRequest(msg)) if msg == "Locality is required"
        ));
    }

    #[test]
    fn test_optional_drops_blank() {
        assert_eq!(optional(Some(" ".to_string())), None);
        assert_eq!(optional(Some(" x ".to_string())).as_deref(), Some("x"));
        assert_eq!(optional(None), None);
    }
}
