//! Configuration loading and management

use anyhow::{Context, Result};
use clap::Args;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};
use url::Url;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub payments: PaymentsConfig,
    #[serde(default)]
    pub sms: SmsConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Token signing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_access_secret")]
    pub access_token_secret: String,
    #[serde(default = "default_access_expiry_minutes")]
    pub access_token_expiry_minutes: i64,
    #[serde(default = "default_refresh_secret")]
    pub refresh_token_secret: String,
    #[serde(default = "default_refresh_expiry_days")]
    pub refresh_token_expiry_days: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_token_secret: default_access_secret(),
            access_token_expiry_minutes: default_access_expiry_minutes(),
            refresh_token_secret: default_refresh_secret(),
            refresh_token_expiry_days: default_refresh_expiry_days(),
        }
    }
}

impl AuthConfig {
    pub fn uses_default_secrets(&self) -> bool {
        self.access_token_secret == default_access_secret()
            || self.refresh_token_secret == default_refresh_secret()
    }
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: default_allowed_origins(),
        }
    }
}

/// Stripe checkout configuration; payments are disabled without a secret key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentsConfig {
    #[serde(default)]
    pub stripe_secret_key: Option<String>,
    #[serde(default = "default_stripe_api_base")]
    pub api_base: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_success_url")]
    pub success_url: String,
    #[serde(default = "default_cancel_url")]
    pub cancel_url: String,
}

impl Default for PaymentsConfig {
    fn default() -> Self {
        Self {
            stripe_secret_key: None,
            api_base: default_stripe_api_base(),
            currency: default_currency(),
            success_url: default_success_url(),
            cancel_url: default_cancel_url(),
        }
    }
}

/// Vonage SMS configuration; confirmations are skipped without credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmsConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_secret: Option<String>,
    #[serde(default = "default_sms_from")]
    pub from: String,
    #[serde(default = "default_vonage_api_base")]
    pub api_base: String,
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_secret: None,
            from: default_sms_from(),
            api_base: default_vonage_api_base(),
        }
    }
}

/// Outbound HTTP settings shared by the gateways
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// `pretty` or `json`
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// Default value functions
fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_db_path() -> String {
    "./data/mealmates.db".to_string()
}

fn default_access_secret() -> String {
    "change-me-access-secret".to_string()
}

fn default_refresh_secret() -> String {
    "change-me-refresh-secret".to_string()
}

fn default_access_expiry_minutes() -> i64 {
    60
}

fn default_refresh_expiry_days() -> i64 {
    10
}

fn default_allowed_origins() -> Vec<String> {
    vec!["http://localhost:5173".to_string()]
}

fn default_stripe_api_base() -> String {
    "https://api.stripe.com".to_string()
}

fn default_currency() -> String {
    "inr".to_string()
}

fn default_success_url() -> String {
    "http://localhost:5173/success".to_string()
}

fn default_cancel_url() -> String {
    "http://localhost:5173/cancel".to_string()
}

fn default_sms_from() -> String {
    "Meal Mates Community".to_string()
}

fn default_vonage_api_base() -> String {
    "https://rest.nexmo.com".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

/// Values taken from the command line or environment, applied over the file
#[derive(Args, Debug, Default)]
pub struct Overrides {
    /// Bind address
    #[arg(long, env = "MEALMATES_BIND")]
    pub bind: Option<String>,

    /// Port
    #[arg(short, long, env = "PORT")]
    pub port: Option<u16>,

    /// SQLite database file
    #[arg(long, env = "MEALMATES_DATABASE_PATH")]
    pub database_path: Option<String>,

    /// Access token signing secret
    #[arg(long, env = "ACCESS_TOKEN_SECRET", hide_env_values = true)]
    pub access_token_secret: Option<String>,

    /// Refresh token signing secret
    #[arg(long, env = "REFRESH_TOKEN_SECRET", hide_env_values = true)]
    pub refresh_token_secret: Option<String>,

    /// Allowed CORS origins, comma separated
    #[arg(long, env = "CORS_ORIGIN", value_delimiter = ',')]
    pub cors_origin: Option<Vec<String>>,

    /// Stripe secret key
    #[arg(long, env = "STRIPE_SECRET_KEY", hide_env_values = true)]
    pub stripe_secret_key: Option<String>,

    /// Vonage API key
    #[arg(long, env = "VONAGE_API_KEY", hide_env_values = true)]
    pub vonage_api_key: Option<String>,

    /// Vonage API secret
    #[arg(long, env = "VONAGE_API_SECRET", hide_env_values = true)]
    pub vonage_api_secret: Option<String>,
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &str) -> Result<Self> {
        let config_path = Path::new(path);

        if !config_path.exists() {
            info!("Config file not found at {}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path))?;

        info!("Loaded configuration from {}", path);
        Ok(config)
    }

    /// Apply command line and environment overrides
    pub fn apply_overrides(&mut self, overrides: Overrides) {
        if let Some(bind) = overrides.bind {
            self.server.bind_address = bind;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(path) = overrides.database_path {
            self.database.path = path;
        }
        if let Some(secret) = overrides.access_token_secret {
            self.auth.access_token_secret = secret;
        }
        if let Some(secret) = overrides.refresh_token_secret {
            self.auth.refresh_token_secret = secret;
        }
        if let Some(origins) = overrides.cors_origin {
            self.cors.allowed_origins = origins;
        }
        if let Some(key) = overrides.stripe_secret_key {
            self.payments.stripe_secret_key = Some(key);
        }
        if let Some(key) = overrides.vonage_api_key {
            self.sms.api_key = Some(key);
        }
        if let Some(secret) = overrides.vonage_api_secret {
            self.sms.api_secret = Some(secret);
        }
    }

    /// Reject settings the server cannot start with
    pub fn validate(&self) -> Result<()> {
        let auth = &self.auth;
        if auth.access_token_secret.is_empty() || auth.refresh_token_secret.is_empty() {
            anyhow::bail!("Token secrets must not be empty");
        }
        if auth.access_token_secret == auth.refresh_token_secret {
            anyhow::bail!("Access and refresh tokens must use different secrets");
        }
        if auth.access_token_expiry_minutes <= 0 || auth.refresh_token_expiry_days <= 0 {
            anyhow::bail!("Token lifetimes must be positive");
        }

        for base in [&self.payments.api_base, &self.sms.api_base] {
            Url::parse(base).with_context(|| format!("Invalid gateway URL: {}", base))?;
        }

        Ok(())
    }

    /// Allowed origins in their serialized `scheme://host[:port]` form
    ///
    /// Browsers send the origin without a path or trailing slash, so
    /// configured values are normalized to match.
    pub fn normalized_origins(&self) -> Vec<String> {
        self.cors
            .allowed_origins
            .iter()
            .map(|origin| origin.trim())
            .filter(|origin| !origin.is_empty())
            .filter_map(|origin| match Url::parse(origin) {
                Ok(url) if url.has_host() => Some(url.origin().ascii_serialization()),
                _ => {
                    warn!("Ignoring invalid CORS origin: {}", origin);
                    None
                }
            })
            .collect()
    }
}
