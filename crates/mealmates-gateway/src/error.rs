//! Gateway error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Gateway returned error: {status} - {message}")]
    Upstream { status: u16, message: String },

    #[error("SMS rejected: {0}")]
    SmsRejected(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}
