//! Hosted checkout sessions through the Stripe API

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::GatewayError;

/// A one-off donation to be paid through a hosted checkout page
#[derive(Clone, Debug)]
pub struct CheckoutRequest {
    pub name: String,
    pub email: String,
    /// Whole currency units (rupees)
    pub amount: i64,
    pub message: Option<String>,
}

/// A created checkout session
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct CheckoutSession {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// Something that can open a hosted checkout session
#[async_trait]
pub trait CheckoutProvider: Send + Sync {
    async fn create_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession, GatewayError>;
}

/// Stripe client configuration
#[derive(Clone, Debug)]
pub struct StripeConfig {
    pub secret_key: String,
    /// API base URL, e.g. `https://api.stripe.com`
    pub base_url: String,
    /// ISO currency code, lowercase
    pub currency: String,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    #[serde(default)]
    message: Option<String>,
}

/// Stripe Checkout client
pub struct StripeCheckout {
    config: StripeConfig,
    client: Client,
}

impl StripeCheckout {
    pub fn new(config: StripeConfig, client: Client) -> Self {
        info!("Created Stripe checkout client for {}", config.base_url);
        Self { config, client }
    }

    /// Form-encoded body for `POST /v1/checkout/sessions`
    fn form(&self, request: &CheckoutRequest) -> Vec<(&'static str, String)> {
        vec![
            ("mode", "payment".to_string()),
            ("payment_method_types[0]", "card".to_string()),
            ("line_items[0][quantity]", "1".to_string()),
            ("line_items[0][price_data][currency]", self.config.currency.clone()),
            (
                "line_items[0][price_data][product_data][name]",
                "Custom Payment".to_string(),
            ),
            // Stripe amounts are in the smallest currency unit
            ("line_items[0][price_data][unit_amount]", (request.amount * 100).to_string()),
            ("customer_email", request.email.clone()),
            ("metadata[name]", request.name.clone()),
            ("metadata[message]", request.message.clone().unwrap_or_default()),
            ("success_url", self.config.success_url.clone()),
            ("cancel_url", self.config.cancel_url.clone()),
        ]
    }
}

#[async_trait]
impl CheckoutProvider for StripeCheckout {
    async fn create_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession, GatewayError> {
        let url = format!(
            "{}/v1/checkout/sessions",
            self.config.base_url.trim_end_matches('/')
        );
        debug!("Creating checkout session for {}", request.email);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.secret_key)
            .form(&self.form(request))
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<StripeErrorBody>(&body)
                .ok()
                .and_then(|b| b.error.message)
                .unwrap_or(body);
            return Err(GatewayError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        let session: CheckoutSession = response.json().await?;
        info!("Created checkout session {}", session.id);
        Ok(session)
    }
}
