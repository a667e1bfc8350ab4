//! Checkout and payment routes

use axum::{
    Router,
    extract::State,
    routing::{get, post},
};
use mealmates_auth::AuthUser;
use mealmates_db::NewPayment;
use mealmates_gateway::CheckoutRequest;
use tracing::{error, info};

use crate::error::ApiError;
use crate::response::{ApiResponse, JsonBody};
use crate::state::AppState;

use super::types::{
    CheckoutSessionRequest, CheckoutSessionResponse, NumberOrString, PaymentResponse,
};

/// Largest single donation accepted, in rupees
const MAX_AMOUNT: i64 = 1_000_000;

/// Parse the donation amount: a whole number of rupees above zero
fn parse_amount(amount: Option<&NumberOrString>) -> Result<i64, ApiError> {
    let text = amount.map(NumberOrString::as_text).unwrap_or_default();
    if text.is_empty() {
        return Err(ApiError::BadRequest("Amount is required".to_string()));
    }

    let amount: i64 = text
        .parse()
        .map_err(|_| ApiError::BadRequest("Amount must be a whole number".to_string()))?;

    match amount {
        a if a <= 0 => Err(ApiError::BadRequest("Amount is required".to_string())),
        a if a > MAX_AMOUNT => Err(ApiError::BadRequest(format!(
            "Amount must not exceed {}",
            MAX_AMOUNT
        ))),
        a => Ok(a),
    }
}

/// POST /api/users/create-checkout-session
async fn create_checkout_session(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<CheckoutSessionRequest>,
) -> Result<ApiResponse<CheckoutSessionResponse>, ApiError> {
    let amount = parse_amount(request.amount.as_ref())?;

    let name = request.name.trim().to_string();
    let email = request.email.trim().to_string();
    if name.is_empty() || email.is_empty() {
        return Err(ApiError::BadRequest("Name and email are required".to_string()));
    }
    let message = request
        .message
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty());

    let checkout = state.checkout.clone().ok_or_else(|| {
        error!("Checkout requested but no payment provider is configured");
        ApiError::Internal("Payment processing is not configured".to_string())
    })?;

    let session = checkout
        .create_session(&CheckoutRequest {
            name: name.clone(),
            email: email.clone(),
            amount,
            message: message.clone(),
        })
        .await?;

    let payment = state
        .db
        .insert_payment(NewPayment {
            name,
            email,
            amount,
            message,
            checkout_session_id: session.id.clone(),
        })
        .await?;

    info!(
        "Created checkout session {} for payment {}",
        session.id, payment.id
    );

    Ok(ApiResponse::ok(
        CheckoutSessionResponse {
            id: session.id,
            url: session.url,
        },
        "Checkout session created",
    ))
}

/// GET /api/users/get-payment-details
async fn list_payments(
    _user: AuthUser,
    State(state): State<AppState>,
) -> Result<ApiResponse<Vec<PaymentResponse>>, ApiError> {
    let payments = state.db.list_payments().await?;

    Ok(ApiResponse::ok(
        payments.into_iter().map(PaymentResponse::from).collect(),
        "Payment Details given by the user",
    ))
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/create-checkout-session", post(create_checkout_session))
}

pub fn protected_routes() -> Router<AppState> {
    Router::new().route("/get-payment-details", get(list_payments))
}
