use crate::config::EasyPaisaConfig;
use crate::domain::money::two_decimals;
use crate::domain::order::{Order, OrderStatus, PaymentMethod, PaymentStatus};
use crate::domain::payment::{Correlation, Initiation, PaymentDetails, PaymentOutcome, WebhookNotice};
use crate::error::{PaymentError, Result};
use crate::gateways::signing::hmac_sha256_hex;
use crate::gateways::{form_fields, request_error, validate_mobile_number, PaymentGateway};

const PROVIDER: &str = "EasyPaisa";
/// The provider truncates merchant order ids, so references carry this prefix
/// plus the first eight characters of the order id.
pub const ORDER_REF_PREFIX: &str = "MS-";
pub const PAID_STATUSES: [&str; 2] = ["0000", "0001"];

pub struct EasyPaisaGateway {
    pub config: Option<EasyPaisaConfig>,
    pub frontend_url: String,
    pub timeout_ms: u64,
    pub client: reqwest::Client,
}

/// Callbacks go to the storefront's webhook route, which forwards them to
/// `/api/payment/webhook/{gateway}` on this service.
pub fn post_back_url(frontend_url: &str) -> String {
    format!("{frontend_url}/api/payment/webhook?gateway=easypaisa")
}

pub fn provider_order_ref(order: &Order) -> String {
    format!("{ORDER_REF_PREFIX}{}", order.short_id())
}

/// Hash input is `amount ++ orderId ++ storeId` with no separators.
pub fn merchant_hash(cfg: &EasyPaisaConfig, amount: &str, order_ref: &str) -> Option<String> {
    let data = format!("{amount}{order_ref}{}", cfg.store_id);
    hmac_sha256_hex(cfg.hash_key.as_bytes(), data.as_bytes())
}

#[async_trait::async_trait]
impl PaymentGateway for EasyPaisaGateway {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::EasyPaisa
    }

    fn is_configured(&self) -> bool {
        self.config.is_some()
    }

    fn validate_details(&self, details: &PaymentDetails) -> Result<()> {
        validate_mobile_number(PROVIDER, details).map(|_| ())
    }

    async fn initiate(&self, order: &Order, details: &PaymentDetails) -> Result<Initiation> {
        let Some(cfg) = &self.config else {
            return Err(PaymentError::GatewayConfig { provider: PROVIDER });
        };
        let mobile = validate_mobile_number(PROVIDER, details)?;

        let order_ref = provider_order_ref(order);
        let amount = two_decimals(order.total);
        let hashed = merchant_hash(cfg, &amount, &order_ref)
            .ok_or(PaymentError::GatewayConfig { provider: PROVIDER })?;

        let form = [
            ("storeId", cfg.store_id.clone()),
            ("amount", amount),
            ("orderId", order_ref.clone()),
            ("mobileAccountNo", mobile.to_string()),
            ("emailAddress", details.customer_email.clone().unwrap_or_default()),
            ("postBackURL", post_back_url(&self.frontend_url)),
            ("merchantHashedReq", hashed),
        ];

        let resp = self
            .client
            .post(&cfg.base_url)
            .form(&form)
            .timeout(std::time::Duration::from_millis(self.timeout_ms))
            .send()
            .await
            .map_err(|e| request_error(PROVIDER, e))?;

        if !resp.status().is_success() {
            return Err(PaymentError::gateway_request(
                PROVIDER,
                format!("payment initiation failed (HTTP {})", resp.status().as_u16()),
            ));
        }

        Ok(Initiation {
            external_reference: Some(order_ref),
            redirect_url: None,
            raw_status: "pending".to_string(),
            message: Some("Payment request sent to your EasyPaisa account. Please approve.".to_string()),
            payment_status: PaymentStatus::Pending,
            order_status: OrderStatus::Pending,
        })
    }

    fn parse_webhook(&self, raw_body: &[u8]) -> Result<Option<WebhookNotice>> {
        let fields = form_fields(raw_body)?;
        let order_ref = fields.get("orderId").map(String::as_str).unwrap_or_default();
        if order_ref.is_empty() {
            return Ok(None);
        }

        let status = fields.get("status").map(String::as_str).unwrap_or_default();
        let outcome = if PAID_STATUSES.contains(&status) {
            PaymentOutcome::Paid {
                transaction_id: fields.get("transactionId").cloned().unwrap_or_default(),
            }
        } else {
            PaymentOutcome::Failed
        };

        Ok(Some(WebhookNotice {
            correlation: Correlation::ShortOrderId {
                session_token: order_ref.to_string(),
                order_id_prefix: order_ref
                    .strip_prefix(ORDER_REF_PREFIX)
                    .unwrap_or(order_ref)
                    .to_string(),
            },
            outcome: Some(outcome),
        }))
    }
}
