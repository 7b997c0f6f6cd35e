//! # cart-gateway
//!
//! HTTP payment gateway for harvest-cart.
//!
//! Provides [`HttpPaymentGateway`], a [`cart_core::PaymentGateway`] that talks
//! to the marketplace payments API. That API fronts the provider (Paystack or
//! Flutterwave) and owns the webhook that settles the order record; this
//! client only starts payments and asks for their status.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cart_gateway::HttpPaymentGateway;
//! use cart_core::{CheckoutOrder, PaymentSession};
//! use std::sync::Arc;
//!
//! // PAYMENT_API_BASE_URL=https://api.example.com/v1
//! let gateway = Arc::new(HttpPaymentGateway::from_env()?);
//!
//! let mut session = PaymentSession::new(CheckoutOrder::new("ord-1", 4900.0), gateway);
//! let authorization = session.start_checkout().await?;
//!
//! // Send the customer to authorization.authorization_url
//! ```

pub mod client;
pub mod config;

// Re-exports
pub use client::HttpPaymentGateway;
pub use config::GatewayConfig;
