//! # cart-api
//!
//! HTTP API layer for harvest-cart.
//!
//! This crate provides:
//! - Axum-based HTTP server
//! - A single-writer cart task behind a cloneable handle
//! - REST endpoints for the cart and for checkout payment sessions
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |
//! | GET | `/api/v1/cart` | Cart with order summary |
//! | DELETE | `/api/v1/cart` | Clear the cart |
//! | POST | `/api/v1/cart/items` | Add a product |
//! | GET | `/api/v1/cart/items/{id}` | Get a cart line |
//! | PUT | `/api/v1/cart/items/{id}` | Set quantity |
//! | DELETE | `/api/v1/cart/items/{id}` | Remove a cart line |
//! | GET | `/api/v1/cart/summary` | Order summary |
//! | POST | `/api/v1/checkout` | Create payment session |
//! | GET | `/api/v1/checkout/{session_id}` | Session status |
//! | POST | `/api/v1/checkout/{session_id}/start` | Retry a failed start |
//! | POST | `/api/v1/checkout/{session_id}/verify` | Verify payment |
//! | DELETE | `/api/v1/checkout/{session_id}` | Close session |

pub mod actor;
pub mod handlers;
pub mod routes;
pub mod sessions;
pub mod state;

pub use actor::{CartHandle, CartSnapshot};
pub use routes::create_router;
pub use sessions::SessionRegistry;
pub use state::{AppConfig, AppState};
