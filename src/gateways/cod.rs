use crate::domain::order::{Order, OrderStatus, PaymentMethod, PaymentStatus};
use crate::domain::payment::{Initiation, PaymentDetails, WebhookNotice};
use crate::error::Result;
use crate::gateways::PaymentGateway;

/// Cash on delivery: no provider call, the order goes straight to processing
/// and stays unpaid until the courier collects.
pub struct CashOnDeliveryGateway;

#[async_trait::async_trait]
impl PaymentGateway for CashOnDeliveryGateway {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::Cod
    }

    async fn initiate(&self, _order: &Order, _details: &PaymentDetails) -> Result<Initiation> {
        Ok(Initiation {
            external_reference: None,
            redirect_url: None,
            raw_status: "confirmed".to_string(),
            message: Some("Order placed! Pay on delivery.".to_string()),
            payment_status: PaymentStatus::Unpaid,
            order_status: OrderStatus::Processing,
        })
    }

    fn parse_webhook(&self, _raw_body: &[u8]) -> Result<Option<WebhookNotice>> {
        Ok(None)
    }
}
