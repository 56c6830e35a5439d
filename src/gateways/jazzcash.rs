use crate::config::JazzCashConfig;
use crate::domain::money::whole_units;
use crate::domain::order::{Order, OrderStatus, PaymentMethod, PaymentStatus};
use crate::domain::payment::{Correlation, Initiation, PaymentDetails, PaymentOutcome, WebhookNotice};
use crate::error::{PaymentError, Result};
use crate::gateways::signing::hmac_sha256_hex;
use crate::gateways::{form_fields, request_error, validate_mobile_number, PaymentGateway};
use chrono::{DateTime, Local};
use reqwest::StatusCode;

const PROVIDER: &str = "JazzCash";
const CURRENCY: &str = "PKR";
/// Initiation accepted; the customer has been sent an approval prompt.
pub const OTP_SENT_CODE: &str = "124";
/// Callback code for a completed wallet debit.
pub const PAID_CODE: &str = "000";

pub struct JazzCashGateway {
    pub config: Option<JazzCashConfig>,
    pub timeout_ms: u64,
    pub client: reqwest::Client,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletCharge {
    pub txn_ref: String,
    pub amount: String,
    pub mobile_number: String,
    pub txn_datetime: String,
    pub expiry: String,
}

impl WalletCharge {
    pub fn new(order: &Order, mobile_number: &str, amount: i64, now: DateTime<Local>) -> Self {
        let stamp = now.format("%Y%m%d%H%M%S").to_string();
        Self {
            txn_ref: format!("MS-{}-{}", order.short_id(), now.timestamp()),
            amount: amount.to_string(),
            mobile_number: mobile_number.to_string(),
            txn_datetime: stamp.clone(),
            expiry: stamp,
        }
    }

    /// Field order is fixed by the provider's integrity contract.
    pub fn canonical_string(&self, cfg: &JazzCashConfig) -> String {
        let parts: [&str; 9] = [
            &cfg.integrity_salt,
            &self.amount,
            &cfg.merchant_id,
            &self.mobile_number,
            &cfg.password,
            &self.txn_datetime,
            &self.expiry,
            &self.txn_ref,
            CURRENCY,
        ];
        parts.join("&")
    }

    pub fn secure_hash(&self, cfg: &JazzCashConfig) -> Result<String> {
        hmac_sha256_hex(
            cfg.integrity_salt.as_bytes(),
            self.canonical_string(cfg).as_bytes(),
        )
        .ok_or_else(|| PaymentError::GatewayConfig { provider: PROVIDER })
    }

    fn form(&self, order: &Order, cfg: &JazzCashConfig, secure_hash: String) -> Vec<(&'static str, String)> {
        vec![
            ("pp_Language", "EN".to_string()),
            ("pp_MerchantID", cfg.merchant_id.clone()),
            ("pp_Password", cfg.password.clone()),
            ("pp_TxnRefNo", self.txn_ref.clone()),
            ("pp_Amount", self.amount.clone()),
            ("pp_TxnCurrency", CURRENCY.to_string()),
            ("pp_TxnDateTime", self.txn_datetime.clone()),
            ("pp_TxnExpiryDateTime", self.expiry.clone()),
            ("pp_BillReference", format!("order-{}", order.short_id())),
            ("pp_Description", format!("Order #{}", order.short_id())),
            ("pp_MobileNumber", self.mobile_number.clone()),
            ("pp_CNIC", String::new()),
            ("pp_SecureHash", secure_hash),
        ]
    }
}

#[async_trait::async_trait]
impl PaymentGateway for JazzCashGateway {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::JazzCash
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
        let amount = whole_units(order.total)
            .ok_or_else(|| PaymentError::Validation("order total out of range".to_string()))?;

        let charge = WalletCharge::new(order, mobile, amount, Local::now());
        let form = charge.form(order, cfg, charge.secure_hash(cfg)?);

        let resp = self
            .client
            .post(&cfg.base_url)
            .form(&form)
            .timeout(std::time::Duration::from_millis(self.timeout_ms))
            .send()
            .await
            .map_err(|e| request_error(PROVIDER, e))?;

        // Non-200 bodies are not trusted; they fall through to a rejection.
        let data: serde_json::Value = if resp.status() == StatusCode::OK {
            resp.json().await.unwrap_or_default()
        } else {
            serde_json::Value::Null
        };

        let code = data
            .get("pp_ResponseCode")
            .and_then(|c| c.as_str())
            .unwrap_or_default();
        if code != OTP_SENT_CODE {
            let message = data
                .get("pp_ResponseMessage")
                .and_then(|m| m.as_str())
                .unwrap_or("JazzCash payment failed");
            return Err(PaymentError::gateway_rejected(PROVIDER, message));
        }

        Ok(Initiation {
            external_reference: Some(charge.txn_ref),
            redirect_url: None,
            raw_status: "otp_sent".to_string(),
            message: Some("Payment request sent to your JazzCash app. Please approve.".to_string()),
            payment_status: PaymentStatus::Pending,
            order_status: OrderStatus::Pending,
        })
    }

    fn parse_webhook(&self, raw_body: &[u8]) -> Result<Option<WebhookNotice>> {
        let fields = form_fields(raw_body)?;
        let txn_ref = fields.get("pp_TxnRefNo").map(String::as_str).unwrap_or_default();
        if txn_ref.is_empty() {
            return Ok(None);
        }

        let outcome = match fields.get("pp_ResponseCode").map(String::as_str) {
            Some(PAID_CODE) => PaymentOutcome::Paid {
                transaction_id: fields
                    .get("pp_RetreivalReferenceNo")
                    .filter(|r| !r.is_empty())
                    .cloned()
                    .unwrap_or_else(|| txn_ref.to_string()),
            },
            _ => PaymentOutcome::Failed,
        };

        Ok(Some(WebhookNotice {
            correlation: Correlation::SessionToken(txn_ref.to_string()),
            outcome: Some(outcome),
        }))
    }
}
