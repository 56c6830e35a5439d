use crate::domain::order::{Order, OrderItem, OrderStatus, PaymentMethod, PaymentStatus};
use crate::domain::payment::{CheckoutRequest, Correlation, Initiation, PaymentOutcome};
use crate::error::{PaymentError, Result};
use crate::repo::order_store::{OrderStore, OrderTx};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

/// Sole writer of order rows; every mutation passes through here so the
/// aggregate invariants hold.
#[derive(Clone)]
pub struct OrderLedger {
    pub store: Arc<dyn OrderStore>,
}

impl OrderLedger {
    pub fn new(store: Arc<dyn OrderStore>) -> Self {
        Self { store }
    }

    pub async fn create_pending_order(
        &self,
        tx: &mut dyn OrderTx,
        req: &CheckoutRequest,
        method: PaymentMethod,
    ) -> Result<Order> {
        let order = build_pending_order(req, method, Utc::now())?;
        tx.insert_order(&order).await?;
        tracing::debug!(order_id = %order.id, method = %method, "pending order staged");
        Ok(order)
    }

    /// Records the initiation result: session token (at most once), payment
    /// status and order status.
    pub async fn attach_gateway_session(
        &self,
        tx: &mut dyn OrderTx,
        order: &mut Order,
        initiation: &Initiation,
    ) -> Result<()> {
        apply_initiation(order, initiation, Utc::now())?;
        tx.update_order(order).await?;
        Ok(())
    }

    /// Marks an order whose provider declined at initiation.
    pub async fn record_initiation_failure(&self, tx: &mut dyn OrderTx, order: &mut Order) -> Result<()> {
        if !order.payment_status.can_initiate_to(PaymentStatus::Failed) {
            return Err(PaymentError::Validation(format!(
                "order {} cannot fail from {}",
                order.id,
                order.payment_status.as_str()
            )));
        }
        order.payment_status = PaymentStatus::Failed;
        order.transaction_id = None;
        order.touch(Utc::now());
        tx.update_order(order).await?;
        Ok(())
    }

    /// Applies a webhook outcome as a single-row write. Not a compare-and-swap:
    /// concurrent callbacks for one order resolve last-write-wins.
    pub async fn apply_payment_outcome(&self, mut order: Order, outcome: &PaymentOutcome) -> Result<Order> {
        if !apply_outcome(&mut order, outcome, Utc::now()) {
            return Ok(order);
        }
        self.store.save(&order).await?;
        Ok(order)
    }

    /// Reserved `paid -> refunded` edge.
    pub async fn mark_refunded(&self, order_id: Uuid) -> Result<Order> {
        let mut order = self.get_order(order_id).await?;
        if order.payment_status != PaymentStatus::Paid {
            return Err(PaymentError::Validation(format!(
                "only paid orders can be refunded (order is {})",
                order.payment_status.as_str()
            )));
        }
        order.payment_status = PaymentStatus::Refunded;
        order.transaction_id = None;
        order.touch(Utc::now());
        self.store.save(&order).await?;
        Ok(order)
    }

    pub async fn get_order(&self, order_id: Uuid) -> Result<Order> {
        self.store
            .find_by_id(order_id)
            .await?
            .ok_or(PaymentError::NotFound)
    }

    pub async fn find_for_webhook(&self, correlation: &Correlation) -> Result<Option<Order>> {
        match correlation {
            Correlation::SessionToken(token) => Ok(self.store.find_by_session(token).await?),
            Correlation::ShortOrderId {
                session_token,
                order_id_prefix,
            } => {
                if let Some(order) = self.store.find_by_session(session_token).await? {
                    return Ok(Some(order));
                }
                if !is_id_prefix(order_id_prefix) {
                    return Ok(None);
                }
                let mut matches = self.store.find_by_id_prefix(order_id_prefix).await?;
                if matches.len() > 1 {
                    tracing::warn!(prefix = %order_id_prefix, "ambiguous short order id, ignoring callback");
                    return Ok(None);
                }
                Ok(matches.pop())
            }
        }
    }
}

fn is_id_prefix(prefix: &str) -> bool {
    prefix.len() >= 8 && prefix.bytes().all(|b| b.is_ascii_hexdigit() || b == b'-')
}

/// Validates a checkout request and builds the `(pending, unpaid)` order.
pub fn build_pending_order(req: &CheckoutRequest, method: PaymentMethod, now: DateTime<Utc>) -> Result<Order> {
    validate_checkout(req)?;

    let items = req
        .items
        .iter()
        .map(|item| OrderItem {
            id: Uuid::new_v4(),
            product_id: item.product_id.clone(),
            name: item.name.clone(),
            price: item.price,
            quantity: item.quantity,
            size: item.size.clone(),
            color: item.color.clone(),
        })
        .collect();

    let non_empty = |v: &Option<String>| v.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);

    Ok(Order {
        id: Uuid::new_v4(),
        customer_name: non_empty(&req.customer_name).unwrap_or_else(|| "Guest".to_string()),
        customer_email: non_empty(&req.customer_email).unwrap_or_default(),
        customer_phone: non_empty(&req.customer_phone).unwrap_or_default(),
        status: OrderStatus::Pending,
        subtotal: req.subtotal,
        shipping: req.shipping,
        discount: req.discount,
        total: req.subtotal + req.shipping - req.discount,
        promo_code: non_empty(&req.promo_code),
        payment_method: method,
        payment_status: PaymentStatus::Unpaid,
        transaction_id: None,
        gateway_session_id: None,
        shipping_address: req.shipping_address.clone(),
        items,
        created_at: now,
        updated_at: now,
    })
}

/// Money columns are `NUMERIC(12,2)`.
pub const MAX_AMOUNT_SCALE: u32 = 2;

/// Largest value a `NUMERIC(12,2)` column holds.
pub fn max_amount() -> Decimal {
    Decimal::new(999_999_999_999, MAX_AMOUNT_SCALE)
}

/// Amounts must be stored exactly, otherwise the persisted totals drift from
/// what was validated.
fn check_amount(field: &str, value: Decimal) -> Result<()> {
    if value < Decimal::ZERO {
        return Err(PaymentError::Validation(format!("{field} must not be negative")));
    }
    if value.normalize().scale() > MAX_AMOUNT_SCALE {
        return Err(PaymentError::Validation(format!(
            "{field} must have at most {MAX_AMOUNT_SCALE} decimal places"
        )));
    }
    if value > max_amount() {
        return Err(PaymentError::Validation(format!("{field} exceeds {}", max_amount())));
    }
    Ok(())
}

pub fn validate_checkout(req: &CheckoutRequest) -> Result<()> {
    if req.items.is_empty() {
        return Err(PaymentError::Validation("order must contain at least one item".to_string()));
    }
    for item in &req.items {
        if item.product_id.trim().is_empty() {
            return Err(PaymentError::Validation("item product_id is required".to_string()));
        }
        if item.quantity < 1 {
            return Err(PaymentError::Validation(format!(
                "quantity for {} must be at least 1",
                item.product_id
            )));
        }
        check_amount(&format!("price for {}", item.product_id), item.price)?;
    }

    for (field, value) in [
        ("subtotal", req.subtotal),
        ("shipping", req.shipping),
        ("discount", req.discount),
        ("total", req.total),
    ] {
        check_amount(field, value)?;
    }

    let line_sum: Decimal = req
        .items
        .iter()
        .map(|i| i.price * Decimal::from(i.quantity))
        .sum();
    if line_sum != req.subtotal {
        return Err(PaymentError::Validation(format!(
            "subtotal {} does not match item total {}",
            req.subtotal, line_sum
        )));
    }
    if req.total != req.subtotal + req.shipping - req.discount {
        return Err(PaymentError::Validation(
            "total must equal subtotal + shipping - discount".to_string(),
        ));
    }
    Ok(())
}

pub fn apply_initiation(order: &mut Order, initiation: &Initiation, now: DateTime<Utc>) -> Result<()> {
    if !order.payment_status.can_initiate_to(initiation.payment_status) {
        return Err(PaymentError::Validation(format!(
            "payment status cannot move from {} to {}",
            order.payment_status.as_str(),
            initiation.payment_status.as_str()
        )));
    }
    if let Some(token) = &initiation.external_reference {
        if order.gateway_session_id.is_some() {
            return Err(PaymentError::Validation(format!(
                "order {} already has a gateway session",
                order.id
            )));
        }
        order.gateway_session_id = Some(token.clone());
    }
    order.payment_status = initiation.payment_status;
    order.status = initiation.order_status;
    order.touch(now);
    Ok(())
}

/// Returns false when the order is left untouched.
pub fn apply_outcome(order: &mut Order, outcome: &PaymentOutcome, now: DateTime<Utc>) -> bool {
    // refunds are settled outside the callback path
    if order.payment_status == PaymentStatus::Refunded {
        return false;
    }
    match outcome {
        PaymentOutcome::Paid { transaction_id } => {
            order.payment_status = PaymentStatus::Paid;
            order.status = OrderStatus::Processing;
            order.transaction_id = Some(transaction_id.clone()).filter(|t| !t.is_empty());
        }
        PaymentOutcome::Failed => {
            order.payment_status = PaymentStatus::Failed;
            order.transaction_id = None;
        }
    }
    order.touch(now);
    true
}
