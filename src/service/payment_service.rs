use crate::domain::order::PaymentMethod;
use crate::domain::payment::{CheckoutRequest, CheckoutResponse, PaymentDetails};
use crate::error::{PaymentError, Result};
use crate::gateways::GatewayRegistry;
use crate::repo::order_store::OrderTx;
use crate::service::order_ledger::{validate_checkout, OrderLedger};
use std::time::Instant;

#[derive(Clone)]
pub struct PaymentService {
    pub ledger: OrderLedger,
    pub gateways: GatewayRegistry,
}

impl PaymentService {
    /// Creates the order and starts payment with the chosen provider.
    ///
    /// Checks that need no order (totals, provider credentials, wallet
    /// number) run first. After that the order row and the initiation result
    /// share one transaction: a provider decline is committed as a failed
    /// payment, a timeout keeps the untouched pending order, any other
    /// provider error leaves nothing behind.
    pub async fn create_payment(&self, method: PaymentMethod, req: CheckoutRequest) -> Result<CheckoutResponse> {
        validate_checkout(&req)?;
        if let Some(echo) = req.payment_method.as_deref() {
            if echo.parse::<PaymentMethod>().ok() != Some(method) {
                tracing::debug!(path_method = %method, body_method = %echo, "payment_method in body ignored");
            }
        }

        let gateway = self.gateways.initiator(method)?;
        let details = PaymentDetails::from(&req);
        gateway.validate_details(&details)?;

        let mut tx = self.ledger.store.begin().await?;
        let mut order = match self.ledger.create_pending_order(tx.as_mut(), &req, method).await {
            Ok(order) => order,
            Err(e) => {
                discard(tx).await;
                return Err(e);
            }
        };

        let started = Instant::now();
        let initiation = gateway.initiate(&order, &details).await;
        let latency_ms = started.elapsed().as_millis() as u64;

        match initiation {
            Ok(initiation) => {
                let attached = self
                    .ledger
                    .attach_gateway_session(tx.as_mut(), &mut order, &initiation)
                    .await;
                let recorded = match attached {
                    Ok(()) => tx.commit().await.map_err(PaymentError::from),
                    Err(e) => {
                        discard(tx).await;
                        Err(e)
                    }
                };
                if let Err(e) = recorded {
                    // the provider already holds a live session for this order
                    tracing::error!(
                        order_id = %order.id,
                        method = %method,
                        session = ?initiation.external_reference,
                        "initiated payment could not be recorded, reconcile with provider: {}",
                        e
                    );
                    return Err(e);
                }

                tracing::info!(
                    order_id = %order.id,
                    method = %method,
                    status = %initiation.raw_status,
                    latency_ms,
                    "payment initiated"
                );

                Ok(CheckoutResponse {
                    order_id: order.id,
                    status: initiation.raw_status,
                    checkout_url: initiation.redirect_url,
                    tracker_token: match method {
                        PaymentMethod::Safepay => initiation.external_reference,
                        _ => None,
                    },
                    message: initiation.message,
                })
            }
            Err(rejected @ PaymentError::GatewayRejected { .. }) => {
                self.ledger.record_initiation_failure(tx.as_mut(), &mut order).await?;
                tx.commit().await?;
                tracing::warn!(
                    order_id = %order.id,
                    method = %method,
                    latency_ms,
                    "provider declined payment: {}",
                    rejected
                );
                Err(rejected)
            }
            Err(timeout @ PaymentError::GatewayTimeout { .. }) => {
                // kept as pending/unpaid for manual reconciliation
                tx.commit().await?;
                tracing::warn!(
                    order_id = %order.id,
                    method = %method,
                    latency_ms,
                    "payment initiation timed out, order left for reconciliation"
                );
                Err(timeout)
            }
            Err(e) => {
                discard(tx).await;
                tracing::warn!(method = %method, latency_ms, "payment initiation failed: {}", e);
                Err(e)
            }
        }
    }
}

async fn discard(tx: Box<dyn OrderTx>) {
    if let Err(e) = tx.rollback().await {
        tracing::error!("order rollback failed: {}", e);
    }
}
