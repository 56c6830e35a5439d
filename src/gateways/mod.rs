use crate::config::AppConfig;
use crate::domain::order::{Order, PaymentMethod};
use crate::domain::payment::{Initiation, PaymentDetails, WebhookNotice};
use crate::error::{PaymentError, Result};
use axum::http::HeaderMap;
use std::collections::HashMap;
use std::sync::Arc;

pub mod cod;
pub mod easypaisa;
pub mod jazzcash;
pub mod safepay;
pub mod signing;

/// Wallet providers only accept local mobile numbers of this length.
pub const MOBILE_NUMBER_DIGITS: usize = 11;

#[async_trait::async_trait]
pub trait PaymentGateway: Send + Sync {
    fn method(&self) -> PaymentMethod;

    /// False when the provider's credential set is incomplete.
    fn is_configured(&self) -> bool {
        true
    }

    /// Input checks that must pass before an order row or network call exists.
    fn validate_details(&self, _details: &PaymentDetails) -> Result<()> {
        Ok(())
    }

    async fn initiate(&self, order: &Order, details: &PaymentDetails) -> Result<Initiation>;

    /// Providers without a signature scheme accept every callback here and
    /// rely on the correlation key alone.
    fn verify_webhook(&self, _raw_body: &[u8], _headers: &HeaderMap) -> Result<()> {
        Ok(())
    }

    /// `Ok(None)` when the callback carries no correlation key.
    fn parse_webhook(&self, raw_body: &[u8]) -> Result<Option<WebhookNotice>>;
}

#[derive(Clone, Default)]
pub struct GatewayRegistry {
    adapters: HashMap<PaymentMethod, Arc<dyn PaymentGateway>>,
}

impl GatewayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(cfg: &AppConfig, client: reqwest::Client) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(safepay::SafepayGateway {
            config: cfg.safepay.clone(),
            webhook_secret: cfg.safepay_webhook_secret.clone(),
            frontend_url: cfg.frontend_url.clone(),
            timeout_ms: cfg.gateway_timeout_ms,
            client: client.clone(),
        }));
        registry.register(Arc::new(jazzcash::JazzCashGateway {
            config: cfg.jazzcash.clone(),
            timeout_ms: cfg.gateway_timeout_ms,
            client: client.clone(),
        }));
        registry.register(Arc::new(easypaisa::EasyPaisaGateway {
            config: cfg.easypaisa.clone(),
            frontend_url: cfg.frontend_url.clone(),
            timeout_ms: cfg.gateway_timeout_ms,
            client,
        }));
        registry.register(Arc::new(cod::CashOnDeliveryGateway));
        registry
    }

    /// Replaces any adapter already registered for the same method.
    pub fn register(&mut self, adapter: Arc<dyn PaymentGateway>) {
        self.adapters.insert(adapter.method(), adapter);
    }

    /// Adapter able to start a payment, or `GatewayConfig` when the provider
    /// is missing or lacks credentials.
    pub fn initiator(&self, method: PaymentMethod) -> Result<Arc<dyn PaymentGateway>> {
        match self.adapters.get(&method) {
            Some(adapter) if adapter.is_configured() => Ok(adapter.clone()),
            _ => Err(PaymentError::GatewayConfig {
                provider: method.display_name(),
            }),
        }
    }

    /// Callback handling does not need initiation credentials.
    pub fn webhook_source(&self, method: PaymentMethod) -> Option<Arc<dyn PaymentGateway>> {
        self.adapters.get(&method).cloned()
    }

    pub fn configured_methods(&self) -> Vec<PaymentMethod> {
        PaymentMethod::ALL
            .into_iter()
            .filter(|m| self.adapters.get(m).is_some_and(|a| a.is_configured()))
            .collect()
    }
}

pub(crate) fn validate_mobile_number<'a>(
    provider: &'static str,
    details: &'a PaymentDetails,
) -> Result<&'a str> {
    match details.mobile_number.as_deref() {
        Some(n) if n.len() == MOBILE_NUMBER_DIGITS && n.bytes().all(|b| b.is_ascii_digit()) => Ok(n),
        _ => Err(PaymentError::InvalidInput(format!(
            "Valid {provider} mobile number required ({MOBILE_NUMBER_DIGITS} digits)"
        ))),
    }
}

pub(crate) fn request_error(provider: &'static str, e: reqwest::Error) -> PaymentError {
    if e.is_timeout() {
        PaymentError::GatewayTimeout { provider }
    } else {
        PaymentError::gateway_request(provider, format!("connection error: {e}"))
    }
}

pub(crate) fn form_fields(raw_body: &[u8]) -> Result<HashMap<String, String>> {
    serde_urlencoded::from_bytes(raw_body)
        .map_err(|e| PaymentError::Validation(format!("malformed form payload: {e}")))
}
