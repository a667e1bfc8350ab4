//! Meal Mates - community food complaint and donation backend

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod config;

use config::{Config, Overrides};
use mealmates_api::{AppState, create_router};
use mealmates_auth::{TokenConfig, TokenService};
use mealmates_db::Database;
use mealmates_gateway::{StripeCheckout, StripeConfig, VonageConfig, VonageSms, http_client};

/// Meal Mates - community food complaint and donation backend
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml")]
    config: String,

    #[command(flatten)]
    overrides: Overrides,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load(&args.config)?;
    config.apply_overrides(args.overrides);

    init_logging(&config.logging.level, &config.logging.format);

    info!("Starting Meal Mates v{}", env!("CARGO_PKG_VERSION"));

    config.validate()?;
    if config.auth.uses_default_secrets() {
        warn!("Using a built-in token secret; set ACCESS_TOKEN_SECRET and REFRESH_TOKEN_SECRET");
    }

    // Create data directory
    if let Some(parent) = Path::new(&config.database.path).parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    // Initialize database
    let db_path = format!("sqlite:{}?mode=rwc", config.database.path);
    let db = Database::new(&db_path).await?;

    let tokens = Arc::new(TokenService::new(&TokenConfig {
        access_secret: config.auth.access_token_secret.clone(),
        refresh_secret: config.auth.refresh_token_secret.clone(),
        access_ttl: chrono::Duration::minutes(config.auth.access_token_expiry_minutes),
        refresh_ttl: chrono::Duration::days(config.auth.refresh_token_expiry_days),
    }));

    let mut state = AppState::new(db, tokens);

    // Initialize gateways
    let client = http_client(Duration::from_secs(config.gateway.timeout_secs))?;

    match (&config.sms.api_key, &config.sms.api_secret) {
        (Some(api_key), Some(api_secret)) => {
            state = state.with_sms(Arc::new(VonageSms::new(
                VonageConfig {
                    api_key: api_key.clone(),
                    api_secret: api_secret.clone(),
                    from: config.sms.from.clone(),
                    base_url: config.sms.api_base.clone(),
                },
                client.clone(),
            )));
        }
        _ => warn!("Vonage credentials not set, complaint confirmations are disabled"),
    }

    match &config.payments.stripe_secret_key {
        Some(secret_key) => {
            state = state.with_checkout(Arc::new(StripeCheckout::new(
                StripeConfig {
                    secret_key: secret_key.clone(),
                    base_url: config.payments.api_base.clone(),
                    currency: config.payments.currency.clone(),
                    success_url: config.payments.success_url.clone(),
                    cancel_url: config.payments.cancel_url.clone(),
                },
                client,
            )));
        }
        None => warn!("Stripe secret key not set, checkout is disabled"),
    }

    let origins = config.normalized_origins();
    info!("Allowed origins: {}", origins.join(", "));

    // Create router
    let app = create_router(state, &origins).layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.server.bind_address, config.server.port)
        .parse()
        .with_context(|| "Invalid bind address")?;

    info!("Listening on {}", addr);

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Initialize logging
fn init_logging(level: &str, format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        "json" => registry.with(fmt::layer().json()).init(),
        _ => registry.with(fmt::layer()).init(),
    }
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
