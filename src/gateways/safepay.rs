use crate::config::SafepayConfig;
use crate::domain::money::whole_units;
use crate::domain::order::{Order, OrderStatus, PaymentMethod, PaymentStatus};
use crate::domain::payment::{Correlation, Initiation, PaymentDetails, PaymentOutcome, WebhookNotice};
use crate::error::{PaymentError, Result};
use crate::gateways::signing::verify_hex_signature;
use crate::gateways::{request_error, PaymentGateway};
use axum::http::HeaderMap;
use reqwest::StatusCode;
use serde_json::json;

const PROVIDER: &str = "Safepay";
pub const SIGNATURE_HEADER: &str = "x-sfpy-signature";
const CURRENCY: &str = "PKR";

pub struct SafepayGateway {
    pub config: Option<SafepayConfig>,
    pub webhook_secret: Option<String>,
    pub frontend_url: String,
    pub timeout_ms: u64,
    pub client: reqwest::Client,
}

impl SafepayGateway {
    fn checkout_url(environment: &str, frontend_url: &str, tracker: &str, order: &Order) -> String {
        let sandbox = environment == "sandbox";
        format!(
            "https://{host}.getsafepay.com/components?beacon={tracker}&entry_mode=hosted&env={env}&source=custom&redirect_url={frontend_url}/checkout/success?order_id={order_id}&cancel_url={frontend_url}/checkout",
            host = if sandbox { "sandbox" } else { "www" },
            env = if sandbox { "sandbox" } else { "production" },
            order_id = order.id,
        )
    }
}

#[async_trait::async_trait]
impl PaymentGateway for SafepayGateway {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::Safepay
    }

    fn is_configured(&self) -> bool {
        self.config.is_some()
    }

    async fn initiate(&self, order: &Order, _details: &PaymentDetails) -> Result<Initiation> {
        let Some(cfg) = &self.config else {
            return Err(PaymentError::GatewayConfig { provider: PROVIDER });
        };
        let amount = whole_units(order.total)
            .ok_or_else(|| PaymentError::Validation("order total out of range".to_string()))?;

        let url = format!("{}/order/payments/v3/", cfg.base_url.trim_end_matches('/'));
        let body = json!({
            "client": cfg.api_key,
            "amount": amount,
            "currency": CURRENCY,
            "environment": cfg.environment,
        });

        let resp = self
            .client
            .post(url)
            .json(&body)
            .timeout(std::time::Duration::from_millis(self.timeout_ms))
            .send()
            .await
            .map_err(|e| request_error(PROVIDER, e))?;

        let status = resp.status();
        let data: serde_json::Value = resp.json().await.unwrap_or_default();

        if status != StatusCode::OK && status != StatusCode::CREATED {
            let message = data
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("Unknown error");
            return Err(PaymentError::gateway_request(PROVIDER, message));
        }

        let tracker = data
            .pointer("/data/token")
            .and_then(|t| t.as_str())
            .unwrap_or_default();
        if tracker.is_empty() {
            return Err(PaymentError::gateway_request(
                PROVIDER,
                "Safepay did not return a tracker token",
            ));
        }

        Ok(Initiation {
            external_reference: Some(tracker.to_string()),
            redirect_url: Some(Self::checkout_url(
                &cfg.environment,
                &self.frontend_url,
                tracker,
                order,
            )),
            raw_status: "redirect".to_string(),
            message: None,
            payment_status: PaymentStatus::Pending,
            order_status: OrderStatus::Pending,
        })
    }

    fn verify_webhook(&self, raw_body: &[u8], headers: &HeaderMap) -> Result<()> {
        let Some(secret) = &self.webhook_secret else {
            return Ok(());
        };
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|h| h.to_str().ok())
            .unwrap_or("");
        if verify_hex_signature(secret.as_bytes(), raw_body, signature) {
            Ok(())
        } else {
            Err(PaymentError::Authentication)
        }
    }

    fn parse_webhook(&self, raw_body: &[u8]) -> Result<Option<WebhookNotice>> {
        let data: serde_json::Value = serde_json::from_slice(raw_body)
            .map_err(|e| PaymentError::Validation(format!("malformed JSON payload: {e}")))?;

        let tracker = data
            .pointer("/data/token")
            .and_then(|t| t.as_str())
            .unwrap_or_default();
        if tracker.is_empty() {
            return Ok(None);
        }

        let outcome = match data.get("type").and_then(|t| t.as_str()).unwrap_or_default() {
            "payment:created" | "payment:completed" => Some(PaymentOutcome::Paid {
                transaction_id: data
                    .pointer("/data/tracker/id")
                    .and_then(|t| t.as_str())
                    .unwrap_or_default()
                    .to_string(),
            }),
            "payment:failed" => Some(PaymentOutcome::Failed),
            _ => None,
        };

        Ok(Some(WebhookNotice {
            correlation: Correlation::SessionToken(tracker.to_string()),
            outcome,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateways::signing::hmac_sha256_hex;

    fn gateway(secret: Option<&str>) -> SafepayGateway {
        SafepayGateway {
            config: None,
            webhook_secret: secret.map(str::to_string),
            frontend_url: "https://shop.example".to_string(),
            timeout_ms: 1_000,
            client: reqwest::Client::new(),
        }
    }

    #[test]
    fn maps_event_types() {
        let gw = gateway(None);
        let paid = gw
            .parse_webhook(br#"{"type":"payment:completed","data":{"token":"abc123","tracker":{"id":"trk_9"}}}"#)
            .unwrap()
            .unwrap();
        assert_eq!(paid.correlation, Correlation::SessionToken("abc123".into()));
        assert_eq!(
            paid.outcome,
            Some(PaymentOutcome::Paid { transaction_id: "trk_9".into() })
        );

        let failed = gw
            .parse_webhook(br#"{"type":"payment:failed","data":{"token":"abc123"}}"#)
            .unwrap()
            .unwrap();
        assert_eq!(failed.outcome, Some(PaymentOutcome::Failed));

        let other = gw
            .parse_webhook(br#"{"type":"payment:refund_initiated","data":{"token":"abc123"}}"#)
            .unwrap()
            .unwrap();
        assert_eq!(other.outcome, None);
    }

    #[test]
    fn missing_tracker_is_not_correlatable() {
        let gw = gateway(None);
        assert!(gw.parse_webhook(br#"{"type":"payment:completed","data":{}}"#).unwrap().is_none());
        assert!(gw.parse_webhook(b"not json").is_err());
    }

    #[test]
    fn signature_checked_only_with_secret() {
        let body = br#"{"type":"payment:completed","data":{"token":"abc123"}}"#;
        assert!(gateway(None).verify_webhook(body, &HeaderMap::new()).is_ok());

        let gw = gateway(Some("whsec_test"));
        assert!(matches!(
            gw.verify_webhook(body, &HeaderMap::new()),
            Err(PaymentError::Authentication)
        ));

        let mut headers = HeaderMap::new();
        let sig = hmac_sha256_hex(b"whsec_test", body).unwrap();
        headers.insert(SIGNATURE_HEADER, sig.parse().unwrap());
        assert!(gw.verify_webhook(body, &headers).is_ok());
    }

    #[test]
    fn builds_hosted_checkout_url() {
        let order_id = uuid::Uuid::nil();
        let order = crate::service::order_ledger::tests::order_fixture(order_id);
        let url = SafepayGateway::checkout_url("production", "https://shop.example", "abc123", &order);
        assert!(url.starts_with("https://www.getsafepay.com/components?beacon=abc123"));
        assert!(url.contains("&env=production"));
        assert!(url.contains(&format!(
            "&redirect_url=https://shop.example/checkout/success?order_id={order_id}"
        )));
        assert!(url.ends_with("&cancel_url=https://shop.example/checkout"));
    }
}
