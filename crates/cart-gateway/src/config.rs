//! # Gateway Configuration
//!
//! Configuration for the payments API client.
//! Values are loaded from environment variables (and `.env` when present).

use cart_core::{PaymentError, PaymentProvider};
use std::env;
use std::time::Duration;

/// Payments API configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL of the payments API (e.g. "https://api.example.com/v1")
    pub api_base_url: String,

    /// Bearer token for the customer's session, if the API requires one
    pub api_token: Option<String>,

    /// Provider the payments API routes to
    pub provider: PaymentProvider,

    /// Per-request timeout
    pub timeout: Duration,
}

impl GatewayConfig {
    /// Load configuration from environment variables.
    ///
    /// Required env vars:
    /// - `PAYMENT_API_BASE_URL`
    ///
    /// Optional:
    /// - `PAYMENT_API_TOKEN`
    /// - `PAYMENT_PROVIDER` (default `paystack`)
    /// - `PAYMENT_TIMEOUT_SECS` (default 30)
    pub fn from_env() -> Result<Self, PaymentError> {
        dotenvy::dotenv().ok();

        let api_base_url = env::var("PAYMENT_API_BASE_URL").map_err(|_| {
            PaymentError::Configuration("PAYMENT_API_BASE_URL not set".to_string())
        })?;

        let provider = match env::var("PAYMENT_PROVIDER") {
            Ok(raw) => raw.parse().map_err(PaymentError::Configuration)?,
            Err(_) => PaymentProvider::default(),
        };

        let timeout_secs = env::var("PAYMENT_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);

        let config = Self {
            api_base_url,
            api_token: env::var("PAYMENT_API_TOKEN").ok().filter(|t| !t.is_empty()),
            provider,
            timeout: Duration::from_secs(timeout_secs),
        };
        config.validate()?;
        Ok(config)
    }

    /// Create config with explicit values (for testing)
    pub fn new(api_base_url: impl Into<String>, provider: PaymentProvider) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            api_token: None,
            provider,
            timeout: Duration::from_secs(30),
        }
    }

    /// Check the base URL is usable
    pub fn validate(&self) -> Result<(), PaymentError> {
        if !self.api_base_url.starts_with("http://") && !self.api_base_url.starts_with("https://") {
            return Err(PaymentError::Configuration(
                "PAYMENT_API_BASE_URL must start with http:// or https://".to_string(),
            ));
        }
        Ok(())
    }

    /// Builder: set bearer token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    /// Builder: set request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Get authorization header value
    pub fn auth_header(&self) -> Option<String> {
        self.api_token.as_ref().map(|t| format!("Bearer {}", t))
    }

    /// Join a path onto the base URL
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.api_base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}
