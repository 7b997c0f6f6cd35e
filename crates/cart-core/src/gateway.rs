//! # Payment Gateway Trait
//!
//! Client-side seam to the payment provider's initialize/verify endpoints.
//!
//! ## Design Pattern
//!
//! Strategy pattern, one implementation per transport or provider, selected at
//! runtime through [`GatewaySelector`].
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    PaymentGateway (trait)                   │
//! │  ├── initialize()                                           │
//! │  ├── verify()                                               │
//! │  └── provider()                                             │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!          ┌─────────────────┴─────────────────┐
//!  ┌───────┴────────────┐             ┌────────┴───────┐
//!  │ HttpPaymentGateway │             │  test doubles  │
//!  │  (cart-gateway)    │             │                │
//!  └────────────────────┘             └────────────────┘
//! ```
//!
//! Gateways relay what the provider said and nothing more. Deciding whether a
//! payment counts as confirmed is the job of
//! [`PaymentSession`](crate::session::PaymentSession).

use crate::error::PaymentResult;
use crate::product::Currency;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Supported payment providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentProvider {
    #[default]
    Paystack,
    Flutterwave,
}

impl PaymentProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentProvider::Paystack => "paystack",
            PaymentProvider::Flutterwave => "flutterwave",
        }
    }
}

impl std::fmt::Display for PaymentProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PaymentProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "paystack" => Ok(PaymentProvider::Paystack),
            "flutterwave" => Ok(PaymentProvider::Flutterwave),
            other => Err(format!("unknown payment provider: {}", other)),
        }
    }
}

/// Payment channel the customer picked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Card,
    BankTransfer,
    Wallet,
    Ussd,
    Qr,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Card => "card",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Wallet => "wallet",
            PaymentMethod::Ussd => "ussd",
            PaymentMethod::Qr => "qr",
        }
    }
}

/// Payload for starting a payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeRequest {
    pub order_id: String,
    /// Decimal amount in `currency`
    pub amount: f64,
    pub currency: Currency,
    pub provider: PaymentProvider,
    pub method: PaymentMethod,
}

/// Provider reply to initialize, relayed as-is.
///
/// Both fields are optional here; the session refuses to continue without them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResponse {
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub authorization_url: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Status vocabulary reported by verify
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyStatus {
    Success,
    Failed,
    Pending,
    Abandoned,
    /// Anything outside the known vocabulary
    Other(String),
}

/// Exact token the provider uses for a settled payment
pub const SUCCESS_TOKEN: &str = "success";

impl VerifyStatus {
    /// Map a provider status string. Only the exact success token is `Success`.
    pub fn parse(raw: &str) -> Self {
        match raw {
            SUCCESS_TOKEN => VerifyStatus::Success,
            "failed" => VerifyStatus::Failed,
            "pending" | "ongoing" | "processing" => VerifyStatus::Pending,
            "abandoned" => VerifyStatus::Abandoned,
            other => VerifyStatus::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            VerifyStatus::Success => SUCCESS_TOKEN,
            VerifyStatus::Failed => "failed",
            VerifyStatus::Pending => "pending",
            VerifyStatus::Abandoned => "abandoned",
            VerifyStatus::Other(raw) => raw,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, VerifyStatus::Success)
    }
}

impl std::fmt::Display for VerifyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider reply to verify
#[derive(Debug, Clone, PartialEq)]
pub struct VerifyResponse {
    pub status: VerifyStatus,
    pub message: Option<String>,
}

impl VerifyResponse {
    pub fn new(status: VerifyStatus) -> Self {
        Self {
            status,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Client to a payment provider's initialize/verify surface
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Start a payment for an order.
    ///
    /// # Returns
    /// The provider's reference and hosted payment URL, if it returned them.
    async fn initialize(&self, request: &InitializeRequest) -> PaymentResult<InitializeResponse>;

    /// Ask the provider for the current status of a payment.
    async fn verify(&self, reference: &str) -> PaymentResult<VerifyResponse>;

    /// Provider this gateway talks to.
    fn provider(&self) -> PaymentProvider;
}

/// Type alias for a shared gateway (dynamic dispatch)
pub type BoxedPaymentGateway = Arc<dyn PaymentGateway>;

/// Gateway registry keyed by provider
#[derive(Clone)]
pub struct GatewaySelector {
    gateways: HashMap<PaymentProvider, BoxedPaymentGateway>,
    default_provider: PaymentProvider,
}

impl GatewaySelector {
    /// Create a new selector with a default provider
    pub fn new(default_provider: PaymentProvider) -> Self {
        Self {
            gateways: HashMap::new(),
            default_provider,
        }
    }

    /// Register a gateway under its own provider
    pub fn register(&mut self, gateway: BoxedPaymentGateway) {
        self.gateways.insert(gateway.provider(), gateway);
    }

    /// Register with builder pattern
    pub fn with_gateway(mut self, gateway: BoxedPaymentGateway) -> Self {
        self.register(gateway);
        self
    }

    pub fn default_provider(&self) -> PaymentProvider {
        self.default_provider
    }

    pub fn default_gateway(&self) -> Option<&BoxedPaymentGateway> {
        self.gateways.get(&self.default_provider)
    }

    pub fn get(&self, provider: PaymentProvider) -> Option<&BoxedPaymentGateway> {
        self.gateways.get(&provider)
    }

    /// Requested provider, or the default when none was asked for
    pub fn get_or_default(&self, provider: Option<PaymentProvider>) -> Option<&BoxedPaymentGateway> {
        match provider {
            Some(p) => self.get(p),
            None => self.default_gateway(),
        }
    }

    pub fn providers(&self) -> Vec<PaymentProvider> {
        self.gateways.keys().copied().collect()
    }

    pub fn has_provider(&self, provider: PaymentProvider) -> bool {
        self.gateways.contains_key(&provider)
    }
}

impl Default for GatewaySelector {
    fn default() -> Self {
        Self::new(PaymentProvider::Paystack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullGateway(PaymentProvider);

    #[async_trait]
    impl PaymentGateway for NullGateway {
        async fn initialize(&self, _request: &InitializeRequest) -> PaymentResult<InitializeResponse> {
            Ok(InitializeResponse::default())
        }

        async fn verify(&self, _reference: &str) -> PaymentResult<VerifyResponse> {
            Ok(VerifyResponse::new(VerifyStatus::Pending))
        }

        fn provider(&self) -> PaymentProvider {
            self.0
        }
    }

    #[test]
    fn test_verify_status_vocabulary() {
        assert_eq!(VerifyStatus::parse("success"), VerifyStatus::Success);
        assert_eq!(VerifyStatus::parse("pending"), VerifyStatus::Pending);
        assert_eq!(VerifyStatus::parse("failed"), VerifyStatus::Failed);

        // Near misses are never success.
        for raw in ["Success", "SUCCESS", "successful", " success", "paid", "completed", ""] {
            assert!(!VerifyStatus::parse(raw).is_success(), "{raw:?} parsed as success");
        }
        assert_eq!(
            VerifyStatus::parse("reversed"),
            VerifyStatus::Other("reversed".into())
        );
    }

    #[test]
    fn test_provider_and_method_names() {
        assert_eq!("Paystack".parse::<PaymentProvider>().unwrap(), PaymentProvider::Paystack);
        assert!("bitcoin".parse::<PaymentProvider>().is_err());
        assert_eq!(
            serde_json::to_value(PaymentMethod::BankTransfer).unwrap(),
            "bank_transfer"
        );
    }

    #[test]
    fn test_gateway_selector() {
        let selector = GatewaySelector::new(PaymentProvider::Paystack);
        assert!(selector.providers().is_empty());
        assert!(selector.default_gateway().is_none());

        let selector = selector
            .with_gateway(Arc::new(NullGateway(PaymentProvider::Paystack)))
            .with_gateway(Arc::new(NullGateway(PaymentProvider::Flutterwave)));

        assert!(selector.has_provider(PaymentProvider::Flutterwave));
        assert_eq!(
            selector.get_or_default(None).unwrap().provider(),
            PaymentProvider::Paystack
        );
        assert_eq!(
            selector
                .get_or_default(Some(PaymentProvider::Flutterwave))
                .unwrap()
                .provider(),
            PaymentProvider::Flutterwave
        );
    }
}
