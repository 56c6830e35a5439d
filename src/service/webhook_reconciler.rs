use crate::domain::order::PaymentMethod;
use crate::domain::payment::{PaymentOutcome, WebhookAck, WebhookNotice};
use crate::error::Result;
use crate::gateways::GatewayRegistry;
use crate::service::order_ledger::OrderLedger;
use axum::http::HeaderMap;

#[derive(Clone)]
pub struct WebhookReconciler {
    pub ledger: OrderLedger,
    pub gateways: GatewayRegistry,
}

impl WebhookReconciler {
    /// Authenticates, correlates and applies one provider callback.
    ///
    /// Only a signature failure is returned as an error. Everything after
    /// authentication is acknowledged so providers stop redelivering
    /// callbacks the service cannot act on.
    pub async fn handle_webhook(&self, provider: &str, raw_body: &[u8], headers: &HeaderMap) -> Result<WebhookAck> {
        let Ok(method) = provider.parse::<PaymentMethod>() else {
            tracing::warn!(provider, "webhook for unknown provider ignored");
            return Ok(WebhookAck::received());
        };
        let Some(source) = self.gateways.webhook_source(method) else {
            tracing::warn!(provider = %method, "no adapter registered for webhook");
            return Ok(WebhookAck::received());
        };

        if let Err(e) = source.verify_webhook(raw_body, headers) {
            tracing::warn!(provider = %method, "webhook rejected: {}", e);
            return Err(e);
        }

        let notice = match source.parse_webhook(raw_body) {
            Ok(Some(notice)) => notice,
            Ok(None) => {
                tracing::info!(provider = %method, "webhook without correlation key acknowledged");
                return Ok(WebhookAck::received());
            }
            Err(e) => {
                tracing::warn!(provider = %method, "unreadable webhook payload: {}", e);
                return Ok(WebhookAck::received());
            }
        };

        if let Err(e) = self.apply(method, notice).await {
            tracing::error!(provider = %method, "webhook not applied: {}", e);
        }
        Ok(WebhookAck::received())
    }

    async fn apply(&self, method: PaymentMethod, notice: WebhookNotice) -> Result<()> {
        let Some(order) = self.ledger.find_for_webhook(&notice.correlation).await? else {
            tracing::info!(provider = %method, correlation = ?notice.correlation, "webhook for unknown order");
            return Ok(());
        };
        let Some(outcome) = notice.outcome else {
            tracing::debug!(order_id = %order.id, provider = %method, "webhook event carries no outcome");
            return Ok(());
        };

        let order_id = order.id;
        let updated = self.ledger.apply_payment_outcome(order, &outcome).await?;
        tracing::info!(
            order_id = %order_id,
            provider = %method,
            payment_status = updated.payment_status.as_str(),
            paid = matches!(outcome, PaymentOutcome::Paid { .. }),
            "webhook applied"
        );
        Ok(())
    }
}
