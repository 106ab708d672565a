use std::sync::Arc;

use sqlx::PgPool;

use crate::auth::TokenKeys;
use crate::config::AppConfig;
use crate::services::email::EmailService;
use crate::services::payments::CheckoutClient;

/// Shared per-process state: pool, immutable config, and service handles.
/// Everything here is cheap to clone and immutable after startup.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<AppConfig>,
    pub tokens: TokenKeys,
    pub mailer: Arc<EmailService>,
    pub checkout: Arc<CheckoutClient>,
}

impl AppState {
    pub fn new(db: PgPool, config: AppConfig) -> Self {
        let tokens = TokenKeys::new(&config.jwt);
        let mailer = Arc::new(EmailService::new(config.email.clone()));
        let checkout = Arc::new(CheckoutClient::new(config.checkout.clone()));
        Self {
            db,
            config: Arc::new(config),
            tokens,
            mailer,
            checkout,
        }
    }
}
