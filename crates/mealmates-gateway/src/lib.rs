//! Meal Mates external gateways
//!
//! Thin clients for the two third-party services the backend talks to:
//! Vonage for SMS confirmations and Stripe for hosted checkout sessions.

pub mod checkout;
pub mod error;
pub mod sms;

pub use checkout::{CheckoutProvider, CheckoutRequest, CheckoutSession, StripeCheckout, StripeConfig};
pub use error::GatewayError;
pub use sms::{SmsSender, VonageConfig, VonageSms};

use std::time::Duration;

/// Build the shared HTTP client used by the gateways
pub fn http_client(timeout: Duration) -> Result<reqwest::Client, GatewayError> {
    Ok(reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("mealmates/", env!("CARGO_PKG_VERSION")))
        .build()?)
}
