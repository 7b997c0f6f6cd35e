//! # cart-core
//!
//! Core of the harvest-cart storefront: the shopping-cart store and the
//! checkout payment-confirmation workflow.
//!
//! This crate provides:
//! - `CartStore` over `CartState`/`CartCommand` for the canonical cart
//! - `PersistenceAdapter` and `SnapshotBackend` for durable cart snapshots
//! - `CheckoutCalculator` / `compute_totals` for the order summary
//! - `PaymentGateway` trait and `GatewaySelector` for payment providers
//! - `PaymentSession`, the initialize → confirm → verify state machine
//! - `PaymentError` / `PersistenceError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use cart_core::{CartStore, CheckoutCalculator, CheckoutOrder, PaymentSession, PersistenceAdapter, ProductSnapshot};
//!
//! let mut cart = CartStore::new(PersistenceAdapter::file("./data"));
//! cart.load().await;
//! cart.add(ProductSnapshot::new("p1", "Roma Tomatoes", 300.0), 2).await;
//!
//! let totals = cart.totals(&CheckoutCalculator::default());
//!
//! let mut session = PaymentSession::new(CheckoutOrder::new("ord-1", totals.total), gateway);
//! let authorization = session.start_checkout().await?;
//! // Send the customer to authorization.authorization_url, then:
//! if let VerifyOutcome::Confirmed(success) = session.verify().await {
//!     // finalize the order with the order service
//! }
//! ```

pub mod cart;
pub mod error;
pub mod gateway;
pub mod persistence;
pub mod pricing;
pub mod product;
pub mod session;
pub mod store;

// Re-exports for convenience
pub use cart::{CartCommand, CartItem, CartState};
pub use error::{PaymentError, PaymentResult, PersistenceError};
pub use gateway::{
    BoxedPaymentGateway, GatewaySelector, InitializeRequest, InitializeResponse, PaymentGateway,
    PaymentMethod, PaymentProvider, VerifyResponse, VerifyStatus, SUCCESS_TOKEN,
};
#[cfg(feature = "fs")]
pub use persistence::FileBackend;
pub use persistence::{
    normalize_snapshot, MemoryBackend, PersistenceAdapter, SnapshotBackend, CART_SNAPSHOT_KEY,
};
pub use pricing::{compute_totals, CheckoutCalculator, CheckoutTotals, PricingConfig};
pub use product::{Currency, ProductSnapshot};
pub use session::{
    Authorization, CheckoutOrder, PaymentSession, PaymentSuccess, SessionStatus, SessionView,
    VerifyOutcome,
};
pub use store::CartStore;
