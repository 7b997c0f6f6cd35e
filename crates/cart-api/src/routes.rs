//! # Routes
//!
//! Axum router configuration for the cart and checkout API.

use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main application router
///
/// Routes:
/// - Cart:
///   - GET/DELETE /api/v1/cart - View or clear the cart
///   - POST /api/v1/cart/items - Add a product
///   - GET/PUT/DELETE /api/v1/cart/items/{id} - One cart line
///   - GET /api/v1/cart/summary - Order summary
///
/// - Checkout:
///   - POST /api/v1/checkout - Create a payment session and start checkout
///   - GET/DELETE /api/v1/checkout/{session_id} - View or close a session
///   - POST /api/v1/checkout/{session_id}/start - Retry a failed start
///   - POST /api/v1/checkout/{session_id}/verify - Verify the payment
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let cart_routes = Router::new()
        .route("/", get(handlers::get_cart).delete(handlers::clear_cart))
        .route("/items", post(handlers::add_item))
        .route(
            "/items/{id}",
            get(handlers::get_item)
                .put(handlers::update_item)
                .delete(handlers::remove_item),
        )
        .route("/summary", get(handlers::cart_summary));

    let checkout_routes = Router::new()
        .route("/", post(handlers::create_checkout))
        .route(
            "/{session_id}",
            get(handlers::get_checkout).delete(handlers::close_checkout),
        )
        .route("/{session_id}/start", post(handlers::start_checkout))
        .route("/{session_id}/verify", post(handlers::verify_checkout));

    let api_routes = Router::new()
        .nest("/cart", cart_routes)
        .nest("/checkout", checkout_routes);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/", get(handlers::health))
        .nest("/api/v1", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppConfig;
    use async_trait::async_trait;
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use cart_core::{
        BoxedPaymentGateway, CartItem, GatewaySelector, InitializeRequest, InitializeResponse,
        MemoryBackend, PaymentGateway, PaymentProvider, PaymentResult, PersistenceAdapter,
        PricingConfig, VerifyResponse, VerifyStatus, CART_SNAPSHOT_KEY,
    };
    use serde_json::{json, Value};
    use std::collections::VecDeque;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Gateway that hands out a fixed authorization and scripted verify statuses
    struct StubGateway {
        statuses: Mutex<VecDeque<VerifyStatus>>,
        fail_initialize: bool,
        verify_calls: AtomicUsize,
    }

    impl StubGateway {
        fn new(statuses: Vec<VerifyStatus>) -> Self {
            Self {
                statuses: Mutex::new(statuses.into()),
                fail_initialize: false,
                verify_calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                fail_initialize: true,
                ..Self::new(Vec::new())
            }
        }
    }

    #[async_trait]
    impl PaymentGateway for StubGateway {
        async fn initialize(&self, request: &InitializeRequest) -> PaymentResult<InitializeResponse> {
            if self.fail_initialize {
                return Err(cart_core::PaymentError::ProviderError {
                    provider: "paystack".to_string(),
                    message: "Card declined".to_string(),
                });
            }
            Ok(InitializeResponse {
                reference: Some(format!("ref-{}", request.order_id)),
                authorization_url: Some("https://pay.example/authorize".to_string()),
                message: None,
            })
        }

        async fn verify(&self, _reference: &str) -> PaymentResult<VerifyResponse> {
            self.verify_calls.fetch_add(1, Ordering::SeqCst);
            let status = self
                .statuses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(VerifyStatus::Pending);
            Ok(VerifyResponse::new(status))
        }

        fn provider(&self) -> PaymentProvider {
            PaymentProvider::Paystack
        }
    }

    fn test_config() -> AppConfig {
        AppConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            environment: "test".to_string(),
            data_dir: PathBuf::from("unused"),
            pricing_config: None,
            session_ttl: crate::sessions::DEFAULT_SESSION_TTL,
            settled_session_ttl: crate::sessions::DEFAULT_SETTLED_TTL,
        }
    }

    fn server_with(gateway: Arc<StubGateway>, backend: Arc<MemoryBackend>) -> TestServer {
        server_with_config(test_config(), gateway, backend)
    }

    fn server_with_config(
        config: AppConfig,
        gateway: Arc<StubGateway>,
        backend: Arc<MemoryBackend>,
    ) -> TestServer {
        let gateways = GatewaySelector::new(PaymentProvider::Paystack)
            .with_gateway(gateway as BoxedPaymentGateway);
        let state = AppState::with_parts(
            config,
            gateways,
            PersistenceAdapter::new(backend),
            PricingConfig::default(),
        );
        TestServer::new(create_router(state)).unwrap()
    }

    fn server() -> TestServer {
        server_with(
            Arc::new(StubGateway::new(Vec::new())),
            Arc::new(MemoryBackend::new()),
        )
    }

    fn tomatoes() -> Value {
        json!({
            "id": "p1",
            "name": "Roma Tomatoes",
            "unitPrice": 300.0,
            "unit": "basket",
            "farmerName": "Ada"
        })
    }

    #[tokio::test]
    async fn test_health() {
        let server = server();
        let response = server.get("/health").await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_add_and_merge_items() {
        let server = server();

        server
            .post("/api/v1/cart/items")
            .json(&json!({ "product": tomatoes(), "quantity": 2 }))
            .await
            .assert_status_ok();

        let response = server
            .post("/api/v1/cart/items")
            .json(&json!({ "product": tomatoes(), "quantity": 3 }))
            .await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(body["items"].as_array().unwrap().len(), 1);
        assert_eq!(body["items"][0]["quantity"], 5);
        assert_eq!(body["items"][0]["totalPrice"], 1500.0);
        assert_eq!(body["item_count"], 5);
        assert_eq!(body["totals"]["shipping"], 500.0);
        assert_eq!(body["totals"]["total"], 2150.0);
    }

    #[tokio::test]
    async fn test_add_defaults_to_one() {
        let server = server();
        let response = server
            .post("/api/v1/cart/items")
            .json(&json!({ "product": tomatoes() }))
            .await;
        let body: Value = response.json();
        assert_eq!(body["items"][0]["quantity"], 1);
    }

    #[tokio::test]
    async fn test_item_lifecycle() {
        let server = server();
        server
            .post("/api/v1/cart/items")
            .json(&json!({ "product": tomatoes(), "quantity": 2 }))
            .await;

        let item: Value = server.get("/api/v1/cart/items/p1").await.json();
        assert_eq!(item["productSnapshot"]["name"], "Roma Tomatoes");

        let updated: Value = server
            .put("/api/v1/cart/items/p1")
            .json(&json!({ "quantity": 4 }))
            .await
            .json();
        assert_eq!(updated["items"][0]["totalPrice"], 1200.0);

        server
            .put("/api/v1/cart/items/p1")
            .json(&json!({ "quantity": 0 }))
            .await
            .assert_status_ok();
        server
            .get("/api/v1/cart/items/p1")
            .await
            .assert_status(StatusCode::NOT_FOUND);

        // Removing a missing line is fine
        server
            .delete("/api/v1/cart/items/p1")
            .await
            .assert_status(StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_update_missing_item() {
        let server = server();
        server
            .put("/api/v1/cart/items/nope")
            .json(&json!({ "quantity": 2 }))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_summary_free_shipping() {
        let server = server();
        server
            .post("/api/v1/cart/items")
            .json(&json!({ "product": tomatoes(), "quantity": 20 }))
            .await;

        let summary: Value = server.get("/api/v1/cart/summary").await.json();
        assert_eq!(summary["subtotal"], 6000.0);
        assert_eq!(summary["shipping"], 0.0);
        assert_eq!(summary["tax"], 600.0);
        assert_eq!(summary["total"], 6600.0);
    }

    #[tokio::test]
    async fn test_cart_is_persisted() {
        let backend = Arc::new(MemoryBackend::new());
        let server = server_with(Arc::new(StubGateway::new(Vec::new())), backend.clone());

        server
            .post("/api/v1/cart/items")
            .json(&json!({ "product": tomatoes(), "quantity": 2 }))
            .await;

        let stored: Vec<CartItem> =
            serde_json::from_str(&backend.get(CART_SNAPSHOT_KEY).await.unwrap()).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].total_price, 600.0);

        server
            .delete("/api/v1/cart")
            .await
            .assert_status(StatusCode::NO_CONTENT);
        assert_eq!(backend.get(CART_SNAPSHOT_KEY).await.unwrap(), "[]");
    }

    #[tokio::test]
    async fn test_checkout_empty_cart_rejected() {
        let server = server();
        server
            .post("/api/v1/checkout")
            .json(&json!({}))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_checkout_unknown_provider() {
        let server = server();
        let response = server
            .post("/api/v1/checkout")
            .json(&json!({ "amount": 1000.0, "provider": "flutterwave" }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);

        server
            .post("/api/v1/checkout")
            .json(&json!({ "amount": 1000.0, "provider": "bitcoin" }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_checkout_pending_then_confirmed() {
        let gateway = Arc::new(StubGateway::new(vec![
            VerifyStatus::Pending,
            VerifyStatus::Success,
        ]));
        let server = server_with(gateway.clone(), Arc::new(MemoryBackend::new()));

        server
            .post("/api/v1/cart/items")
            .json(&json!({ "product": tomatoes(), "quantity": 2 }))
            .await;

        let created = server
            .post("/api/v1/checkout")
            .json(&json!({ "order_id": "ord-1", "item_ids": ["p1"] }))
            .await;
        created.assert_status(StatusCode::CREATED);
        let session: Value = created.json();
        assert_eq!(session["status"], "awaiting_confirmation");
        assert_eq!(session["reference"], "ref-ord-1");
        // 600 subtotal + 500 shipping + 60 tax
        assert_eq!(session["amount"], 1160.0);

        let id = session["session_id"].as_str().unwrap().to_string();
        let verify_path = format!("/api/v1/checkout/{}/verify", id);

        let pending: Value = server.post(&verify_path).await.json();
        assert_eq!(pending["verified"], false);
        assert_eq!(pending["session"]["status"], "awaiting_confirmation");
        let cart: Value = server.get("/api/v1/cart").await.json();
        assert_eq!(cart["item_count"], 2);

        let confirmed: Value = server.post(&verify_path).await.json();
        assert_eq!(confirmed["verified"], true);
        assert_eq!(confirmed["newly_confirmed"], true);
        assert_eq!(confirmed["session"]["status"], "verified");

        let cart: Value = server.get("/api/v1/cart").await.json();
        assert_eq!(cart["item_count"], 0);

        let again: Value = server.post(&verify_path).await.json();
        assert_eq!(again["verified"], true);
        assert_eq!(again["newly_confirmed"], false);
        assert_eq!(gateway.verify_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_confirmed_checkout_keeps_other_items() {
        let gateway = Arc::new(StubGateway::new(vec![VerifyStatus::Success]));
        let server = server_with(gateway, Arc::new(MemoryBackend::new()));

        server
            .post("/api/v1/cart/items")
            .json(&json!({ "product": tomatoes(), "quantity": 1 }))
            .await;
        server
            .post("/api/v1/cart/items")
            .json(&json!({ "product": { "id": "p2", "name": "Yam", "unitPrice": 800.0 } }))
            .await;

        let session: Value = server
            .post("/api/v1/checkout")
            .json(&json!({ "item_ids": ["p1"] }))
            .await
            .json();
        // Only the selected line is charged: 300 + 500 shipping + 30 tax
        assert_eq!(session["amount"], 830.0);
        let id = session["session_id"].as_str().unwrap();

        server
            .post(&format!("/api/v1/checkout/{}/verify", id))
            .await
            .assert_status_ok();

        let cart: Value = server.get("/api/v1/cart").await.json();
        assert_eq!(cart["items"].as_array().unwrap().len(), 1);
        assert_eq!(cart["items"][0]["id"], "p2");
    }

    #[tokio::test]
    async fn test_lines_added_after_checkout_survive_confirmation() {
        let gateway = Arc::new(StubGateway::new(vec![VerifyStatus::Success]));
        let server = server_with(gateway, Arc::new(MemoryBackend::new()));

        server
            .post("/api/v1/cart/items")
            .json(&json!({ "product": tomatoes(), "quantity": 1 }))
            .await;

        let session: Value = server.post("/api/v1/checkout").json(&json!({})).await.json();
        assert_eq!(session["amount"], 830.0);
        let id = session["session_id"].as_str().unwrap().to_string();

        server
            .post("/api/v1/cart/items")
            .json(&json!({ "product": { "id": "p2", "name": "Yam", "unitPrice": 800.0 } }))
            .await;

        let confirmed: Value = server
            .post(&format!("/api/v1/checkout/{}/verify", id))
            .await
            .json();
        assert_eq!(confirmed["verified"], true);

        let cart: Value = server.get("/api/v1/cart").await.json();
        assert_eq!(cart["items"].as_array().unwrap().len(), 1);
        assert_eq!(cart["items"][0]["id"], "p2");
    }

    #[tokio::test]
    async fn test_checkout_rejects_items_not_in_cart() {
        let server = server();
        server
            .post("/api/v1/cart/items")
            .json(&json!({ "product": tomatoes() }))
            .await;

        server
            .post("/api/v1/checkout")
            .json(&json!({ "item_ids": ["p1", "p9"] }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_session_is_not_found() {
        let config = AppConfig {
            session_ttl: std::time::Duration::from_secs(60),
            ..test_config()
        };
        let server = server_with_config(
            config,
            Arc::new(StubGateway::new(Vec::new())),
            Arc::new(MemoryBackend::new()),
        );

        let session: Value = server
            .post("/api/v1/checkout")
            .json(&json!({ "amount": 1000.0 }))
            .await
            .json();
        let path = format!("/api/v1/checkout/{}", session["session_id"].as_str().unwrap());

        server.get(&path).await.assert_status_ok();

        tokio::time::advance(std::time::Duration::from_secs(61)).await;
        server.get(&path).await.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_failed_start_then_close() {
        let server = server_with(Arc::new(StubGateway::failing()), Arc::new(MemoryBackend::new()));

        let response = server
            .post("/api/v1/checkout")
            .json(&json!({ "amount": 2500.0 }))
            .await;
        response.assert_status(StatusCode::BAD_GATEWAY);
        let body: Value = response.json();
        assert_eq!(body["error"], "Card declined");
        let id = body["details"].as_str().unwrap().to_string();

        let session: Value = server.get(&format!("/api/v1/checkout/{}", id)).await.json();
        assert_eq!(session["status"], "failed");
        assert_eq!(session["last_error"], "Card declined");

        server
            .delete(&format!("/api/v1/checkout/{}", id))
            .await
            .assert_status(StatusCode::NO_CONTENT);
        server
            .get(&format!("/api/v1/checkout/{}", id))
            .await
            .assert_status(StatusCode::NOT_FOUND);
        server
            .delete(&format!("/api/v1/checkout/{}", id))
            .await
            .assert_status(StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let server = server();
        server
            .post(&format!("/api/v1/checkout/{}/verify", uuid::Uuid::new_v4()))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }
}
