use crate::domain::order::{Order, OrderItem, OrderStatus, PaymentMethod, PaymentStatus, ShippingAddress};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutItem {
    pub product_id: String,
    pub name: String,
    pub price: Decimal,
    pub quantity: i32,
    pub size: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub items: Vec<CheckoutItem>,
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_phone: Option<String>,
    #[serde(default)]
    pub shipping_address: Option<ShippingAddress>,
    #[serde(default)]
    pub promo_code: Option<String>,
    /// Echo of the route's method; the path segment wins when both are present.
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub mobile_number: Option<String>,
}

/// Per-request inputs a gateway needs beyond the persisted order.
#[derive(Debug, Clone, Default)]
pub struct PaymentDetails {
    pub mobile_number: Option<String>,
    pub customer_email: Option<String>,
}

impl From<&CheckoutRequest> for PaymentDetails {
    fn from(req: &CheckoutRequest) -> Self {
        Self {
            mobile_number: req.mobile_number.as_ref().map(|m| m.trim().to_string()),
            customer_email: req.customer_email.clone(),
        }
    }
}

/// Normalized result of a successful gateway initiation.
#[derive(Debug, Clone)]
pub struct Initiation {
    pub external_reference: Option<String>,
    pub redirect_url: Option<String>,
    pub raw_status: String,
    pub message: Option<String>,
    pub payment_status: PaymentStatus,
    pub order_status: OrderStatus,
}

/// Normalized outcome carried by a provider callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    Paid { transaction_id: String },
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Correlation {
    SessionToken(String),
    /// Provider echoes a truncated order id; `session_token` is tried first,
    /// then `order_id_prefix` against the order id.
    ShortOrderId {
        session_token: String,
        order_id_prefix: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookNotice {
    pub correlation: Correlation,
    /// `None` for event types that carry no payment outcome.
    pub outcome: Option<PaymentOutcome>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutResponse {
    pub order_id: Uuid,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkout_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracker_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WebhookAck {
    pub received: bool,
}

impl WebhookAck {
    pub fn received() -> Self {
        Self { received: true }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderView {
    pub id: Uuid,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub transaction_id: Option<String>,
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Order> for OrderView {
    fn from(o: Order) -> Self {
        Self {
            id: o.id,
            status: o.status,
            payment_method: o.payment_method,
            payment_status: o.payment_status,
            transaction_id: o.transaction_id,
            subtotal: o.subtotal,
            shipping: o.shipping,
            discount: o.discount,
            total: o.total,
            items: o.items,
            created_at: o.created_at,
            updated_at: o.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: ErrorPayload,
}

#[derive(Debug, Serialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
}
