//! SMS delivery through the Vonage SMS API

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::GatewayError;

/// Something that can deliver a text message
#[async_trait]
pub trait SmsSender: Send + Sync {
    /// Send `text` to the phone number `to`
    async fn send(&self, to: &str, text: &str) -> Result<(), GatewayError>;
}

/// Vonage client configuration
#[derive(Clone, Debug)]
pub struct VonageConfig {
    pub api_key: String,
    pub api_secret: String,
    /// Sender ID shown to the recipient
    pub from: String,
    /// API base URL, e.g. `https://rest.nexmo.com`
    pub base_url: String,
}

#[derive(Debug, Deserialize)]
struct SmsResponse {
    #[serde(default)]
    messages: Vec<SmsMessageStatus>,
}

#[derive(Debug, Deserialize)]
struct SmsMessageStatus {
    status: String,
    #[serde(rename = "error-text", default)]
    error_text: Option<String>,
}

/// Vonage SMS client
pub struct VonageSms {
    config: VonageConfig,
    client: Client,
}

impl VonageSms {
    pub fn new(config: VonageConfig, client: Client) -> Self {
        info!("Created Vonage SMS client for {}", config.base_url);
        Self { config, client }
    }

    fn form<'a>(&'a self, to: &'a str, text: &'a str) -> [(&'static str, &'a str); 5] {
        [
            ("api_key", self.config.api_key.as_str()),
            ("api_secret", self.config.api_secret.as_str()),
            ("from", self.config.from.as_str()),
            ("to", to),
            ("text", text),
        ]
    }
}

/// Vonage answers 200 even for rejected messages; status "0" means accepted.
fn check_response(response: SmsResponse) -> Result<(), GatewayError> {
    if response.messages.is_empty() {
        return Err(GatewayError::InvalidResponse(
            "SMS response contained no messages".to_string(),
        ));
    }

    match response.messages.iter().find(|m| m.status != "0") {
        Some(failed) => Err(GatewayError::SmsRejected(format!(
            "status {}: {}",
            failed.status,
            failed.error_text.as_deref().unwrap_or("unknown error")
        ))),
        None => Ok(()),
    }
}

#[async_trait]
impl SmsSender for VonageSms {
    async fn send(&self, to: &str, text: &str) -> Result<(), GatewayError> {
        let url = format!("{}/sms/json", self.config.base_url.trim_end_matches('/'));
        debug!("Sending SMS to {}", to);

        let response = self.client.post(&url).form(&self.form(to, text)).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(GatewayError::Upstream {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        check_response(response.json().await?)
    }
}
