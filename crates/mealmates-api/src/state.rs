//! Application state

use mealmates_auth::{CredentialStore, SessionGuard, TokenService};
use mealmates_db::Database;
use mealmates_gateway::{CheckoutProvider, SmsSender};
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub credentials: CredentialStore,
    pub tokens: Arc<TokenService>,
    /// Unset when no SMS credentials are configured
    pub sms: Option<Arc<dyn SmsSender>>,
    /// Unset when no payment credentials are configured
    pub checkout: Option<Arc<dyn CheckoutProvider>>,
}

impl AppState {
    pub fn new(db: Database, tokens: Arc<TokenService>) -> Self {
        Self {
            credentials: CredentialStore::new(db.clone()),
            db,
            tokens,
            sms: None,
            checkout: None,
        }
    }

    pub fn with_sms(mut self, sms: Arc<dyn SmsSender>) -> Self {
        self.sms = Some(sms);
        self
    }

    pub fn with_checkout(mut self, checkout: Arc<dyn CheckoutProvider>) -> Self {
        self.checkout = Some(checkout);
        self
    }

    /// State for the session middleware
    pub fn session_guard(&self) -> SessionGuard {
        SessionGuard::new(self.tokens.clone(), self.credentials.clone())
    }
}
