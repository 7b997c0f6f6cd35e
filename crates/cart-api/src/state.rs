//! # Application State
//!
//! Shared state for the Axum application.
//! Contains the cart handle, live checkout sessions, payment gateways,
//! pricing and configuration.

use crate::actor::CartHandle;
use crate::sessions::{SessionRegistry, DEFAULT_SESSION_TTL, DEFAULT_SETTLED_TTL};
use anyhow::Context;
use cart_core::{
    BoxedPaymentGateway, CartStore, CheckoutCalculator, GatewaySelector, PersistenceAdapter,
    PricingConfig,
};
use cart_gateway::HttpPaymentGateway;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Environment (development, staging, production)
    pub environment: String,
    /// Directory holding the cart snapshot
    pub data_dir: PathBuf,
    /// Explicit pricing config file, if any
    pub pricing_config: Option<PathBuf>,
    /// Lifetime of an unsettled checkout session
    pub session_ttl: Duration,
    /// Lifetime of a checkout session after its cart lines are settled
    pub settled_session_ttl: Duration,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            data_dir: std::env::var("CART_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data")),
            pricing_config: std::env::var("PRICING_CONFIG").ok().map(PathBuf::from),
            session_ttl: env_secs("CHECKOUT_SESSION_TTL_SECS").unwrap_or(DEFAULT_SESSION_TTL),
            settled_session_ttl: env_secs("CHECKOUT_SETTLED_TTL_SECS")
                .unwrap_or(DEFAULT_SETTLED_TTL),
        }
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<std::net::SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid socket address {}:{}", self.host, self.port))
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn env_secs(key: &str) -> Option<Duration> {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_secs)
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Single-writer cart
    pub cart: CartHandle,
    /// Live checkout sessions
    pub sessions: SessionRegistry,
    /// Payment gateway selector
    pub gateways: GatewaySelector,
    /// Order summary pricing
    pub calculator: CheckoutCalculator,
    /// Application config
    pub config: AppConfig,
}

impl AppState {
    /// Create state from the environment with the HTTP payment gateway
    pub fn new() -> anyhow::Result<Self> {
        let config = AppConfig::from_env();

        let pricing = load_pricing_config(config.pricing_config.as_deref())?;

        let gateway = HttpPaymentGateway::from_env()
            .map_err(|e| anyhow::anyhow!("Failed to initialize payment gateway: {}", e))?;
        let mut gateways = GatewaySelector::new(gateway.config().provider);
        gateways.register(Arc::new(gateway) as BoxedPaymentGateway);

        let persistence = PersistenceAdapter::file(&config.data_dir);

        Ok(Self::with_parts(config, gateways, persistence, pricing))
    }

    /// Assemble state from explicit parts. Must run inside a Tokio runtime.
    pub fn with_parts(
        config: AppConfig,
        gateways: GatewaySelector,
        persistence: PersistenceAdapter,
        pricing: PricingConfig,
    ) -> Self {
        Self {
            cart: CartHandle::spawn(CartStore::new(persistence)),
            sessions: SessionRegistry::with_ttl(config.session_ttl, config.settled_session_ttl),
            gateways,
            calculator: CheckoutCalculator::new(pricing),
            config,
        }
    }
}

/// Load pricing constants from a TOML file, falling back to defaults
fn load_pricing_config(explicit: Option<&std::path::Path>) -> anyhow::Result<PricingConfig> {
    if let Some(path) = explicit {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let pricing = PricingConfig::from_toml(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        tracing::info!("Loaded pricing from {}", path.display());
        return Ok(pricing);
    }

    let config_paths = [
        "config/pricing.toml",
        "../config/pricing.toml",
        "../../config/pricing.toml",
    ];

    for path in config_paths {
        if let Ok(content) = std::fs::read_to_string(path) {
            let pricing = PricingConfig::from_toml(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path, e))?;
            tracing::info!("Loaded pricing from {}", path);
            return Ok(pricing);
        }
    }

    tracing::warn!("No pricing config found, using built-in defaults");
    Ok(PricingConfig::default())
}
