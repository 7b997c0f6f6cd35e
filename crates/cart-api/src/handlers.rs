//! # Request Handlers
//!
//! Axum request handlers for the cart and checkout API.

use crate::actor::{CartSnapshot, CartUnavailable};
use crate::sessions::{CheckoutEntry, SharedEntry};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use cart_core::{
    CartCommand, CartItem, CheckoutOrder, CheckoutTotals, Currency, PaymentError, PaymentMethod,
    PaymentProvider, PaymentSession, ProductSnapshot, SessionStatus, SessionView, VerifyOutcome,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

// =============================================================================
// Request/Response Types
// =============================================================================

/// Add item request
#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    /// Product as shown to the customer
    pub product: ProductSnapshot,
    /// Quantity to add
    #[serde(default = "default_quantity")]
    pub quantity: i64,
}

fn default_quantity() -> i64 {
    1
}

/// Update item request
#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: i64,
}

/// Full cart view
#[derive(Debug, Serialize)]
pub struct CartResponse {
    #[serde(flatten)]
    pub cart: CartSnapshot,
    pub totals: CheckoutTotals,
}

/// Order summary view
#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub item_count: u64,
    #[serde(flatten)]
    pub totals: CheckoutTotals,
}

/// Create checkout request
#[derive(Debug, Default, Deserialize)]
pub struct CreateCheckoutRequest {
    /// Order id from the order service (optional, generated when absent)
    #[serde(default)]
    pub order_id: Option<String>,
    /// Amount to charge (optional, defaults to the cart total)
    #[serde(default)]
    pub amount: Option<f64>,
    /// Currency code (optional, defaults to NGN)
    #[serde(default)]
    pub currency: Option<String>,
    /// Payment provider (optional, defaults to the configured provider)
    #[serde(default)]
    pub provider: Option<String>,
    /// Payment method (optional, defaults to card)
    #[serde(default)]
    pub method: Option<PaymentMethod>,
    /// Cart lines being paid for (optional, empty means every line currently in the cart)
    #[serde(default)]
    pub item_ids: Vec<String>,
}

/// Verify response
#[derive(Debug, Serialize)]
pub struct VerifyCheckoutResponse {
    /// True when the payment is confirmed
    pub verified: bool,
    /// True only on the call that first confirmed the payment
    pub newly_confirmed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub session: SessionView,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: u16) -> Self {
        Self {
            error: error.into(),
            code,
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn payment_error_to_response(err: PaymentError) -> ApiError {
    let code = err.status_code();
    let response = ErrorResponse::new(err.to_string(), code);
    (
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(response),
    )
}

impl From<CartUnavailable> for ErrorResponse {
    fn from(err: CartUnavailable) -> Self {
        ErrorResponse::new(err.to_string(), 503)
    }
}

fn cart_unavailable(err: CartUnavailable) -> ApiError {
    error!("{}", err);
    (StatusCode::SERVICE_UNAVAILABLE, Json(err.into()))
}

fn item_not_found(id: &str) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse::new(format!("Cart item not found: {}", id), 404)),
    )
}

fn session_not_found(id: Uuid) -> ApiError {
    payment_error_to_response(PaymentError::SessionNotFound {
        session_id: id.to_string(),
    })
}

async fn find_session(state: &AppState, id: Uuid) -> Result<SharedEntry, ApiError> {
    state.sessions.get(id).await.ok_or_else(|| session_not_found(id))
}

// =============================================================================
// Health
// =============================================================================

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "harvest-cart",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now(),
    }))
}

// =============================================================================
// Cart
// =============================================================================

/// Current cart with its order summary
pub async fn get_cart(State(state): State<AppState>) -> Result<Json<CartResponse>, ApiError> {
    let cart = state.cart.snapshot().await.map_err(cart_unavailable)?;
    let totals = state.calculator.compute_totals(cart.subtotal);
    Ok(Json(CartResponse { cart, totals }))
}

/// Empty the cart
#[instrument(skip(state))]
pub async fn clear_cart(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state
        .cart
        .dispatch(CartCommand::Clear)
        .await
        .map_err(cart_unavailable)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Add a product to the cart
#[instrument(skip(state, request), fields(product_id = %request.product.id, quantity = request.quantity))]
pub async fn add_item(
    State(state): State<AppState>,
    Json(request): Json<AddItemRequest>,
) -> Result<Json<CartResponse>, ApiError> {
    if request.product.id.trim().is_empty() {
        return Err(payment_error_to_response(PaymentError::InvalidRequest(
            "product.id must not be empty".to_string(),
        )));
    }

    let outcome = state
        .cart
        .dispatch(CartCommand::Add {
            product: request.product,
            quantity: request.quantity,
        })
        .await
        .map_err(cart_unavailable)?;

    let totals = state.calculator.compute_totals(outcome.cart.subtotal);
    Ok(Json(CartResponse {
        cart: outcome.cart,
        totals,
    }))
}

/// Get one cart line
pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CartItem>, ApiError> {
    let cart = state.cart.snapshot().await.map_err(cart_unavailable)?;
    cart.get(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| item_not_found(&id))
}

/// Set the quantity of a cart line; zero or less removes it
#[instrument(skip(state, request), fields(quantity = request.quantity))]
pub async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateItemRequest>,
) -> Result<Json<CartResponse>, ApiError> {
    let outcome = state
        .cart
        .dispatch(CartCommand::SetQuantity {
            id: id.clone(),
            quantity: request.quantity,
        })
        .await
        .map_err(cart_unavailable)?;

    // Unchanged and absent means the line was never there (or already gone).
    if !outcome.changed && outcome.cart.get(&id).is_none() {
        return Err(item_not_found(&id));
    }

    let totals = state.calculator.compute_totals(outcome.cart.subtotal);
    Ok(Json(CartResponse {
        cart: outcome.cart,
        totals,
    }))
}

/// Remove a cart line (idempotent)
#[instrument(skip(state))]
pub async fn remove_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .cart
        .dispatch(CartCommand::Remove { id })
        .await
        .map_err(cart_unavailable)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Order summary for the current cart
pub async fn cart_summary(State(state): State<AppState>) -> Result<Json<SummaryResponse>, ApiError> {
    let cart = state.cart.snapshot().await.map_err(cart_unavailable)?;
    Ok(Json(SummaryResponse {
        item_count: cart.item_count,
        totals: state.calculator.compute_totals(cart.subtotal),
    }))
}

// =============================================================================
// Checkout
// =============================================================================

/// Create a payment session and start checkout
#[instrument(skip(state, request), fields(provider = ?request.provider, items = request.item_ids.len()))]
pub async fn create_checkout(
    State(state): State<AppState>,
    Json(request): Json<CreateCheckoutRequest>,
) -> Result<(StatusCode, Json<SessionView>), ApiError> {
    let provider = request
        .provider
        .as_deref()
        .map(|p| {
            p.parse::<PaymentProvider>()
                .map_err(|_| PaymentError::UnknownProvider {
                    provider: p.to_string(),
                })
        })
        .transpose()
        .map_err(payment_error_to_response)?;

    let currency = request
        .currency
        .as_deref()
        .map(|c| c.parse::<Currency>().map_err(PaymentError::InvalidRequest))
        .transpose()
        .map_err(payment_error_to_response)?
        .unwrap_or_default();

    let gateway = state
        .gateways
        .get_or_default(provider)
        .cloned()
        .ok_or_else(|| {
            payment_error_to_response(PaymentError::UnknownProvider {
                provider: provider
                    .unwrap_or_else(|| state.gateways.default_provider())
                    .to_string(),
            })
        })?;

    let cart = state.cart.snapshot().await.map_err(cart_unavailable)?;
    let item_ids = select_items(&cart, request.item_ids).map_err(payment_error_to_response)?;

    let amount = match request.amount {
        Some(amount) => amount,
        None => {
            if item_ids.is_empty() {
                return Err(payment_error_to_response(PaymentError::InvalidRequest(
                    "Cart is empty".to_string(),
                )));
            }
            let subtotal = cart
                .items
                .iter()
                .filter(|item| item_ids.contains(&item.id))
                .map(|item| item.total_price)
                .sum();
            state.calculator.compute_totals(subtotal).total
        }
    };
    if !amount.is_finite() || amount <= 0.0 {
        return Err(payment_error_to_response(PaymentError::InvalidRequest(
            "amount must be a positive number".to_string(),
        )));
    }

    let order_id = request
        .order_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| format!("order-{}", Uuid::new_v4()));

    let order = CheckoutOrder::new(order_id, amount)
        .with_currency(currency)
        .with_method(request.method.unwrap_or_default());

    let entry = state
        .sessions
        .insert(PaymentSession::new(order, gateway), item_ids)
        .await;

    let mut entry = entry.lock().await;
    let session_id = entry.session.id();
    info!(%session_id, amount, "Checkout session created");

    match entry.session.start_checkout().await {
        Ok(_) => Ok((StatusCode::CREATED, Json(entry.session.view()))),
        Err(e) => {
            error!(%session_id, "Failed to start checkout: {}", e);
            let (status, Json(body)) = checkout_error(&entry.session, e);
            Err((status, Json(body.with_details(session_id.to_string()))))
        }
    }
}

/// Lines a checkout pays for: the requested ids, or every line in the cart.
/// Requested ids must all be in the cart.
fn select_items(cart: &CartSnapshot, requested: Vec<String>) -> Result<Vec<String>, PaymentError> {
    if requested.is_empty() {
        return Ok(cart.items.iter().map(|item| item.id.clone()).collect());
    }

    let mut ids: Vec<String> = Vec::with_capacity(requested.len());
    for id in requested {
        if cart.get(&id).is_none() {
            return Err(PaymentError::InvalidRequest(format!(
                "Cart item not found: {}",
                id
            )));
        }
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    Ok(ids)
}

/// Error body carrying the customer-facing message when the session has one
fn checkout_error(session: &PaymentSession, err: PaymentError) -> ApiError {
    let (status, Json(mut body)) = payment_error_to_response(err);
    if let Some(message) = session.last_error() {
        body.error = message.to_string();
    }
    (status, Json(body))
}

/// Retry checkout on a failed session, or return the pending authorization
#[instrument(skip(state))]
pub async fn start_checkout(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    let entry = find_session(&state, session_id).await?;
    let mut entry = entry.lock().await;

    match entry.session.start_checkout().await {
        Ok(_) => Ok(Json(entry.session.view())),
        Err(e) => {
            warn!(%session_id, "Checkout restart failed: {}", e);
            Err(checkout_error(&entry.session, e))
        }
    }
}

/// Current state of a payment session
pub async fn get_checkout(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    let entry = find_session(&state, session_id).await?;
    let entry = entry.lock().await;
    Ok(Json(entry.session.view()))
}

/// Verify a payment with the provider
///
/// Once the payment is confirmed the paid lines leave the cart. If that
/// cleanup does not complete, the next verify of the session retries it.
#[instrument(skip(state))]
pub async fn verify_checkout(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<VerifyCheckoutResponse>, ApiError> {
    let entry = find_session(&state, session_id).await?;
    let mut entry = entry.lock().await;

    let outcome = entry.session.verify().await;

    if let VerifyOutcome::Confirmed(success) = &outcome {
        info!(
            %session_id,
            order_id = %entry.session.order().order_id,
            reference = %success.reference,
            provider = %success.provider,
            "Payment confirmed; finalizing order"
        );
    }

    if outcome.success().is_some() && !entry.cart_settled {
        settle_cart(&state, session_id, &mut entry).await?;
    }

    let (verified, newly_confirmed, message) = match &outcome {
        VerifyOutcome::Confirmed(_) => (true, true, None),
        VerifyOutcome::AlreadyVerified(_) => (true, false, None),
        VerifyOutcome::Unconfirmed { reason, .. } => (false, false, Some(reason.clone())),
        VerifyOutcome::Skipped(status) => {
            if *status == SessionStatus::Closed {
                return Err(payment_error_to_response(PaymentError::InvalidState {
                    status: status.to_string(),
                    operation: "verify",
                }));
            }
            (false, false, Some(format!("Nothing to verify (status: {})", status)))
        }
    };

    Ok(Json(VerifyCheckoutResponse {
        verified,
        newly_confirmed,
        message,
        session: entry.session.view(),
    }))
}

/// Remove the paid lines from the cart. The flag is set only after the cart
/// task applied the removal; `RemoveMany` is idempotent so retries are safe.
async fn settle_cart(
    state: &AppState,
    session_id: Uuid,
    entry: &mut CheckoutEntry,
) -> Result<(), ApiError> {
    if !entry.item_ids.is_empty() {
        let ids = entry.item_ids.clone();
        let removed = ids.len();
        state
            .cart
            .dispatch(CartCommand::RemoveMany { ids })
            .await
            .map_err(|e| {
                warn!(%session_id, "Paid cart lines not removed yet: {}", e);
                cart_unavailable(e)
            })?;
        info!(%session_id, removed, "Removed paid lines from cart");
    }

    entry.cart_settled = true;
    state.sessions.mark_settled(session_id).await;
    Ok(())
}

/// Close and discard a payment session (idempotent)
#[instrument(skip(state))]
pub async fn close_checkout(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> StatusCode {
    if let Some(entry) = state.sessions.remove(session_id).await {
        entry.lock().await.session.close();
        info!(%session_id, "Checkout session closed");
    }
    StatusCode::NO_CONTENT
}
