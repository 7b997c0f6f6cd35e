//! # Payment Session
//!
//! Client-side state machine for one checkout attempt.
//!
//! ```text
//!   Idle ──start_checkout()──▶ Initializing ──{reference, url}──▶ AwaitingConfirmation
//!                                   │                               │        ▲
//!                                   └──error / missing field──▶ Failed      │ not success
//!                                                                   verify() │
//!                                                                    ▼       │
//!                                                                 Verifying ─┘
//!                                                                    │ status == "success"
//!                                                                    ▼
//!                                                                 Verified
//!
//!   any state ──close()──▶ Closed
//! ```
//!
//! `Verified` is reached only when the gateway's verify call reports the exact
//! success token. A successful initialize call, or the customer closing the
//! hosted payment page, never confirms a payment on its own. The order
//! service's record (updated by provider webhooks) remains the authority; the
//! session only drives what the customer sees.

use crate::error::{PaymentError, PaymentResult};
use crate::gateway::{
    BoxedPaymentGateway, InitializeRequest, PaymentMethod, PaymentProvider, VerifyStatus,
};
use crate::product::Currency;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

/// Shown when the provider gave no usable message
pub const GENERIC_INITIALIZE_ERROR: &str = "Unable to start payment. Please try again.";
pub const GENERIC_VERIFY_ERROR: &str = "Unable to confirm payment right now. Please try again.";

/// Session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Idle,
    Initializing,
    AwaitingConfirmation,
    Verifying,
    Verified,
    Failed,
    /// Abandoned by the customer; terminal
    Closed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Idle => "idle",
            SessionStatus::Initializing => "initializing",
            SessionStatus::AwaitingConfirmation => "awaiting_confirmation",
            SessionStatus::Verifying => "verifying",
            SessionStatus::Verified => "verified",
            SessionStatus::Failed => "failed",
            SessionStatus::Closed => "closed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Verified | SessionStatus::Closed)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the customer is paying for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutOrder {
    pub order_id: String,
    pub amount: f64,
    #[serde(default)]
    pub currency: Currency,
    #[serde(default)]
    pub method: PaymentMethod,
}

impl CheckoutOrder {
    pub fn new(order_id: impl Into<String>, amount: f64) -> Self {
        Self {
            order_id: order_id.into(),
            amount,
            currency: Currency::default(),
            method: PaymentMethod::default(),
        }
    }

    pub fn with_currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    pub fn with_method(mut self, method: PaymentMethod) -> Self {
        self.method = method;
        self
    }
}

/// Where to send the customer to pay
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Authorization {
    pub reference: String,
    pub authorization_url: String,
}

/// Confirmed payment, handed to the checkout flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSuccess {
    pub reference: String,
    pub method: PaymentMethod,
    pub provider: PaymentProvider,
}

/// Result of [`PaymentSession::verify`]
#[derive(Debug, Clone, PartialEq)]
pub enum VerifyOutcome {
    /// The provider confirmed the payment. Returned once per session.
    Confirmed(PaymentSuccess),
    /// The session was already verified; the gateway was not called again.
    AlreadyVerified(PaymentSuccess),
    /// Not confirmed (yet). The reference is kept; verify can be retried.
    Unconfirmed {
        status: Option<VerifyStatus>,
        reason: String,
    },
    /// Nothing to verify in this state
    Skipped(SessionStatus),
}

impl VerifyOutcome {
    pub fn success(&self) -> Option<&PaymentSuccess> {
        match self {
            VerifyOutcome::Confirmed(success) | VerifyOutcome::AlreadyVerified(success) => {
                Some(success)
            }
            _ => None,
        }
    }
}

/// Serializable snapshot of a session
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub order_id: String,
    pub amount: f64,
    pub currency: Currency,
    pub provider: PaymentProvider,
    pub method: PaymentMethod,
    pub status: SessionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorization_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One checkout attempt
pub struct PaymentSession {
    id: Uuid,
    order: CheckoutOrder,
    gateway: BoxedPaymentGateway,
    status: SessionStatus,
    reference: Option<String>,
    authorization_url: Option<String>,
    last_error: Option<String>,
    success: Option<PaymentSuccess>,
    created_at: DateTime<Utc>,
}

impl PaymentSession {
    pub fn new(order: CheckoutOrder, gateway: BoxedPaymentGateway) -> Self {
        Self {
            id: Uuid::new_v4(),
            order,
            gateway,
            status: SessionStatus::Idle,
            reference: None,
            authorization_url: None,
            last_error: None,
            success: None,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn order(&self) -> &CheckoutOrder {
        &self.order
    }

    pub fn provider(&self) -> PaymentProvider {
        self.gateway.provider()
    }

    pub fn reference(&self) -> Option<&str> {
        self.reference.as_deref()
    }

    pub fn authorization_url(&self) -> Option<&str> {
        self.authorization_url.as_deref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn success(&self) -> Option<&PaymentSuccess> {
        self.success.as_ref()
    }

    fn transition(&mut self, next: SessionStatus) {
        info!(
            session_id = %self.id,
            order_id = %self.order.order_id,
            from = %self.status,
            to = %next,
            "Payment session transition"
        );
        self.status = next;
    }

    fn authorization(&self) -> Option<Authorization> {
        match (&self.reference, &self.authorization_url) {
            (Some(reference), Some(url)) => Some(Authorization {
                reference: reference.clone(),
                authorization_url: url.clone(),
            }),
            _ => None,
        }
    }

    /// Ask the gateway for a payment reference and hosted payment URL.
    ///
    /// Allowed from `Idle` and `Failed` (restart). While awaiting confirmation
    /// the existing authorization is returned instead of starting a second
    /// payment.
    pub async fn start_checkout(&mut self) -> PaymentResult<Authorization> {
        match self.status {
            // A start that was dropped mid-flight leaves Initializing behind.
            SessionStatus::Idle | SessionStatus::Failed | SessionStatus::Initializing => {}
            SessionStatus::AwaitingConfirmation => {
                if let Some(authorization) = self.authorization() {
                    return Ok(authorization);
                }
            }
            status => {
                return Err(PaymentError::InvalidState {
                    status: status.to_string(),
                    operation: "start checkout",
                })
            }
        }

        self.reference = None;
        self.authorization_url = None;
        self.last_error = None;
        self.transition(SessionStatus::Initializing);

        let request = InitializeRequest {
            order_id: self.order.order_id.clone(),
            amount: self.order.amount,
            currency: self.order.currency,
            provider: self.provider(),
            method: self.order.method,
        };

        let response = match self.gateway.initialize(&request).await {
            Ok(response) => response,
            Err(e) => {
                let message = match &e {
                    PaymentError::ProviderError { message, .. } if !message.trim().is_empty() => {
                        message.clone()
                    }
                    _ => GENERIC_INITIALIZE_ERROR.to_string(),
                };
                warn!(session_id = %self.id, "Payment initialize failed: {}", e);
                self.fail(message);
                return Err(e);
            }
        };

        let reference = non_empty(response.reference);
        let authorization_url = non_empty(response.authorization_url);
        let (reference, authorization_url) = match (reference, authorization_url) {
            (Some(reference), Some(url)) => (reference, url),
            (reference, _) => {
                let field = if reference.is_none() {
                    "reference"
                } else {
                    "authorization_url"
                };
                warn!(session_id = %self.id, field, "Initialize response incomplete");
                self.fail(
                    non_empty(response.message).unwrap_or_else(|| GENERIC_INITIALIZE_ERROR.to_string()),
                );
                return Err(PaymentError::MissingField { field });
            }
        };

        self.reference = Some(reference.clone());
        self.authorization_url = Some(authorization_url.clone());
        self.transition(SessionStatus::AwaitingConfirmation);

        Ok(Authorization {
            reference,
            authorization_url,
        })
    }

    fn fail(&mut self, message: String) {
        self.last_error = Some(message);
        self.transition(SessionStatus::Failed);
    }

    /// Check the payment with the provider. Manual; there is no polling.
    pub async fn verify(&mut self) -> VerifyOutcome {
        if self.status == SessionStatus::Closed {
            return VerifyOutcome::Skipped(self.status);
        }
        if let Some(success) = &self.success {
            return VerifyOutcome::AlreadyVerified(success.clone());
        }
        // Verifying here means an earlier verify was dropped mid-flight.
        if !matches!(
            self.status,
            SessionStatus::AwaitingConfirmation | SessionStatus::Verifying
        ) {
            return VerifyOutcome::Skipped(self.status);
        }
        let Some(reference) = self.reference.clone() else {
            return VerifyOutcome::Skipped(self.status);
        };

        self.transition(SessionStatus::Verifying);

        match self.gateway.verify(&reference).await {
            Ok(response) if response.status.is_success() => {
                let success = PaymentSuccess {
                    reference,
                    method: self.order.method,
                    provider: self.provider(),
                };
                self.success = Some(success.clone());
                self.last_error = None;
                self.transition(SessionStatus::Verified);
                VerifyOutcome::Confirmed(success)
            }
            Ok(response) => {
                let reason = non_empty(response.message).unwrap_or_else(|| {
                    format!("Payment not confirmed yet (status: {})", response.status)
                });
                self.last_error = Some(reason.clone());
                self.transition(SessionStatus::AwaitingConfirmation);
                VerifyOutcome::Unconfirmed {
                    status: Some(response.status),
                    reason,
                }
            }
            Err(e) => {
                warn!(session_id = %self.id, "Payment verify failed: {}", e);
                let reason = match e {
                    PaymentError::ProviderError { message, .. } if !message.trim().is_empty() => {
                        message
                    }
                    _ => GENERIC_VERIFY_ERROR.to_string(),
                };
                self.last_error = Some(reason.clone());
                self.transition(SessionStatus::AwaitingConfirmation);
                VerifyOutcome::Unconfirmed {
                    status: None,
                    reason,
                }
            }
        }
    }

    /// Abandon the session. Only local state is discarded.
    pub fn close(&mut self) {
        if self.status == SessionStatus::Closed {
            return;
        }
        self.reference = None;
        self.authorization_url = None;
        self.last_error = None;
        self.success = None;
        self.transition(SessionStatus::Closed);
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            session_id: self.id,
            order_id: self.order.order_id.clone(),
            amount: self.order.amount,
            currency: self.order.currency,
            provider: self.provider(),
            method: self.order.method,
            status: self.status,
            reference: self.reference.clone(),
            authorization_url: self.authorization_url.clone(),
            last_error: self.last_error.clone(),
            created_at: self.created_at,
        }
    }
}

impl std::fmt::Debug for PaymentSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentSession")
            .field("id", &self.id)
            .field("order", &self.order)
            .field("provider", &self.provider())
            .field("status", &self.status)
            .field("reference", &self.reference)
            .finish()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
