//! # HTTP Payment Gateway
//!
//! [`PaymentGateway`] over the marketplace payments API, which fronts the
//! provider's initialize/verify calls.
//!
//! | Method | Path | Body / Reply |
//! |--------|------|--------------|
//! | POST | `/payments/initialize` | `{orderId, provider, paymentMethod, amount, currency}` → `{reference, authorizationUrl}` |
//! | GET | `/payments/verify/{reference}` | → `{status}` |
//!
//! Replies use the envelope `{success, message, data}`. The client relays what
//! it receives; it never decides on its own that a payment went through.

use crate::config::GatewayConfig;
use async_trait::async_trait;
use cart_core::{
    InitializeRequest, InitializeResponse, PaymentError, PaymentGateway, PaymentProvider,
    PaymentResult, VerifyResponse, VerifyStatus,
};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

/// Payments API client
pub struct HttpPaymentGateway {
    config: GatewayConfig,
    client: Client,
}

impl HttpPaymentGateway {
    /// Create a new gateway client
    pub fn new(config: GatewayConfig) -> PaymentResult<Self> {
        config.validate()?;
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PaymentError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Create from environment variables
    pub fn from_env() -> PaymentResult<Self> {
        Self::new(GatewayConfig::from_env()?)
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header("X-Request-Id", Uuid::new_v4().to_string());
        match self.config.auth_header() {
            Some(header) => request.header("Authorization", header),
            None => request,
        }
    }

    fn verify_url(&self, reference: &str) -> PaymentResult<Url> {
        let mut url = Url::parse(&self.config.endpoint("payments/verify"))
            .map_err(|e| PaymentError::Configuration(format!("Invalid payments API URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| PaymentError::Configuration("Payments API URL cannot take a path".to_string()))?
            .push(reference);
        Ok(url)
    }

    /// Send a request and return the body, mapping non-2xx replies to provider errors
    async fn send(&self, request: RequestBuilder) -> PaymentResult<String> {
        let response = request
            .send()
            .await
            .map_err(|e| PaymentError::NetworkError(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PaymentError::NetworkError(e.to_string()))?;

        if !status.is_success() {
            error!("Payments API error: status={}, body={}", status, body);
            return Err(self.provider_error(status, &body));
        }
        Ok(body)
    }

    fn provider_error(&self, status: StatusCode, body: &str) -> PaymentError {
        let message = serde_json::from_str::<ApiEnvelope<serde_json::Value>>(body)
            .ok()
            .and_then(|envelope| envelope.message)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| format!("HTTP {}: {}", status, body));

        PaymentError::ProviderError {
            provider: self.config.provider.to_string(),
            message,
        }
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    #[instrument(skip(self, request), fields(order_id = %request.order_id, provider = %request.provider))]
    async fn initialize(&self, request: &InitializeRequest) -> PaymentResult<InitializeResponse> {
        if request.order_id.trim().is_empty() {
            return Err(PaymentError::InvalidRequest("Order id is required".to_string()));
        }

        let body = ApiInitializeBody {
            order_id: &request.order_id,
            provider: request.provider.as_str(),
            payment_method: request.method.as_str(),
            amount: request.currency.to_smallest_unit(request.amount),
            currency: request.currency.as_str(),
        };

        debug!(
            "Initializing payment: amount={}, method={}",
            body.amount, body.payment_method
        );

        let url = self.config.endpoint("payments/initialize");
        let raw = self.send(self.authorize(self.client.post(&url)).json(&body)).await?;

        let envelope: ApiEnvelope<ApiInitializeData> = serde_json::from_str(&raw).map_err(|e| {
            PaymentError::Serialization(format!("Failed to parse initialize response: {}", e))
        })?;

        if envelope.success == Some(false) {
            return Err(PaymentError::ProviderError {
                provider: self.config.provider.to_string(),
                message: envelope
                    .message
                    .unwrap_or_else(|| "Payment initialization failed".to_string()),
            });
        }

        let data = envelope.data.unwrap_or_default();
        info!(reference = ?data.reference, "Payment initialized");

        Ok(InitializeResponse {
            reference: data.reference,
            authorization_url: data.authorization_url,
            message: envelope.message,
        })
    }

    #[instrument(skip(self))]
    async fn verify(&self, reference: &str) -> PaymentResult<VerifyResponse> {
        if reference.trim().is_empty() {
            return Err(PaymentError::InvalidRequest("Payment reference is required".to_string()));
        }

        let url = self.verify_url(reference)?;
        let raw = self.send(self.authorize(self.client.get(url))).await?;

        let envelope: ApiEnvelope<ApiVerifyData> = serde_json::from_str(&raw).map_err(|e| {
            PaymentError::Serialization(format!("Failed to parse verify response: {}", e))
        })?;

        let status = envelope
            .data
            .and_then(|data| data.status)
            .map(|raw| VerifyStatus::parse(&raw))
            .unwrap_or_else(|| VerifyStatus::Other("unknown".to_string()));

        debug!(%status, "Payment verify reply");

        Ok(VerifyResponse {
            status,
            message: envelope.message,
        })
    }

    fn provider(&self) -> PaymentProvider {
        self.config.provider
    }
}

// =============================================================================
// Payments API Types
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiInitializeBody<'a> {
    order_id: &'a str,
    provider: &'a str,
    payment_method: &'a str,
    /// Smallest currency unit
    amount: i64,
    currency: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    message: Option<String>,
    data: Option<T>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiInitializeData {
    #[serde(default)]
    reference: Option<String>,
    #[serde(default, alias = "authorization_url")]
    authorization_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiVerifyData {
    #[serde(default)]
    status: Option<String>,
}
