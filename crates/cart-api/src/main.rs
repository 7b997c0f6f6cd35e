//! # Harvest-Cart
//!
//! Cart and checkout service for the produce marketplace.
//!
//! ## Usage
//!
//! ```bash
//! # Set environment variables
//! export PAYMENT_API_BASE_URL=https://orders.example.com/api
//! export PAYMENT_API_TOKEN=...
//! export CART_DATA_DIR=./data
//!
//! # Run the server
//! harvest-cart
//! ```

use cart_api::{routes, sessions, state::AppState};
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    print_banner();

    let state = AppState::new()?;

    let addr = state.config.socket_addr()?;
    let is_prod = state.config.is_production();

    info!("Environment: {}", state.config.environment);
    info!("Cart data: {}", state.config.data_dir.display());
    info!("Payment providers: {:?}", state.gateways.providers());
    info!("Pricing: {:?}", state.calculator.config());

    tokio::spawn(sessions::cleanup_task(
        state.sessions.clone(),
        Duration::from_secs(60),
    ));

    let app = routes::create_router(state);

    info!("Harvest-Cart starting on http://{}", addr);

    if !is_prod {
        info!("Health: http://{}/health", addr);
        info!("Cart: GET http://{}/api/v1/cart", addr);
        info!("Checkout: POST http://{}/api/v1/checkout", addr);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
  Harvest-Cart
  ━━━━━━━━━━━━━━━━━━━━━━━
  Produce marketplace cart & checkout
  Version: {}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
