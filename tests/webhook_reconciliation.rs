mod common;

use axum::http::HeaderMap;
use chrono::Utc;
use common::{checkout, configured, harness, Harness, WEBHOOK_SECRET};
use rust_decimal_macros::dec;
use storefront_payments::domain::order::{Order, OrderStatus, PaymentMethod, PaymentStatus};
use storefront_payments::error::PaymentError;
use storefront_payments::gateways::safepay::SIGNATURE_HEADER;
use storefront_payments::gateways::signing::hmac_sha256_hex;
use storefront_payments::repo::order_store::{OrderStore, OrderTx};
use storefront_payments::service::order_ledger::build_pending_order;
use uuid::Uuid;

const UNUSED_PROVIDER: &str = "http://127.0.0.1:9";

async fn seed(h: &Harness, method: PaymentMethod, id: Uuid, session: Option<&str>) -> Order {
    let mut order = build_pending_order(&checkout(dec!(2000), 1), method, Utc::now()).unwrap();
    order.id = id;
    order.gateway_session_id = session.map(str::to_string);
    if session.is_some() {
        order.payment_status = PaymentStatus::Pending;
    }
    let mut tx = h.store.begin().await.unwrap();
    tx.insert_order(&order).await.unwrap();
    tx.commit().await.unwrap();
    order
}

fn signed(body: &[u8]) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let sig = hmac_sha256_hex(WEBHOOK_SECRET.as_bytes(), body).unwrap();
    headers.insert(SIGNATURE_HEADER, sig.parse().unwrap());
    headers
}

fn safepay_event(kind: &str, token: &str, tracker: &str) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "type": kind,
        "data": { "token": token, "tracker": { "id": tracker } }
    }))
    .unwrap()
}

#[tokio::test]
async fn replayed_paid_webhook_is_idempotent() {
    let h = harness(&configured(UNUSED_PROVIDER));
    let order = seed(&h, PaymentMethod::Safepay, Uuid::new_v4(), Some("tok_1")).await;
    let body = safepay_event("payment:completed", "tok_1", "trk_1");

    for _ in 0..2 {
        let ack = h.webhooks.handle_webhook("safepay", &body, &signed(&body)).await.unwrap();
        assert!(ack.received);
        let current = h.ledger.get_order(order.id).await.unwrap();
        assert_eq!(current.payment_status, PaymentStatus::Paid);
        assert_eq!(current.status, OrderStatus::Processing);
        assert_eq!(current.transaction_id.as_deref(), Some("trk_1"));
    }
}

#[tokio::test]
async fn tampered_body_is_rejected_without_mutation() {
    let h = harness(&configured(UNUSED_PROVIDER));
    let order = seed(&h, PaymentMethod::Safepay, Uuid::new_v4(), Some("tok_2")).await;
    let body = safepay_event("payment:completed", "tok_2", "trk_2");
    let headers = signed(&body);

    let mut tampered = body.clone();
    let last = tampered.len() - 2;
    tampered[last] ^= 0x01;

    let err = h.webhooks.handle_webhook("safepay", &tampered, &headers).await.unwrap_err();
    assert!(matches!(err, PaymentError::Authentication));

    let err = h
        .webhooks
        .handle_webhook("safepay", &body, &HeaderMap::new())
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::Authentication));

    let current = h.ledger.get_order(order.id).await.unwrap();
    assert_eq!(current.payment_status, PaymentStatus::Pending);
    assert!(current.transaction_id.is_none());
}

#[tokio::test]
async fn unknown_session_is_acknowledged_as_noop() {
    let h = harness(&configured(UNUSED_PROVIDER));
    let order = seed(&h, PaymentMethod::Safepay, Uuid::new_v4(), Some("tok_3")).await;
    let body = safepay_event("payment:completed", "someone-else", "trk_x");

    let ack = h.webhooks.handle_webhook("safepay", &body, &signed(&body)).await.unwrap();
    assert!(ack.received);
    assert_eq!(
        h.ledger.get_order(order.id).await.unwrap().payment_status,
        PaymentStatus::Pending
    );
}

#[tokio::test]
async fn unreadable_or_unroutable_callbacks_are_acknowledged() {
    let h = harness(&configured(UNUSED_PROVIDER));

    let junk = b"not json at all";
    assert!(h.webhooks.handle_webhook("safepay", junk, &signed(junk)).await.unwrap().received);
    assert!(h.webhooks.handle_webhook("paypal", b"{}", &HeaderMap::new()).await.unwrap().received);
    assert!(h.webhooks.handle_webhook("cod", b"anything", &HeaderMap::new()).await.unwrap().received);

    let refund = safepay_event("payment:refund_initiated", "tok_4", "trk_4");
    let order = seed(&h, PaymentMethod::Safepay, Uuid::new_v4(), Some("tok_4")).await;
    assert!(h.webhooks.handle_webhook("safepay", &refund, &signed(&refund)).await.unwrap().received);
    assert_eq!(
        h.ledger.get_order(order.id).await.unwrap().payment_status,
        PaymentStatus::Pending
    );
}

#[tokio::test]
async fn wallet_a_failure_code_marks_failed_and_keeps_order_status() {
    let h = harness(&configured(UNUSED_PROVIDER));
    let order = seed(&h, PaymentMethod::JazzCash, Uuid::new_v4(), Some("MS-0f0f0f0f-1700000000")).await;

    let body = b"pp_TxnRefNo=MS-0f0f0f0f-1700000000&pp_ResponseCode=199&pp_ResponseMessage=Declined";
    let ack = h.webhooks.handle_webhook("jazzcash", body, &HeaderMap::new()).await.unwrap();
    assert!(ack.received);

    let current = h.ledger.get_order(order.id).await.unwrap();
    assert_eq!(current.payment_status, PaymentStatus::Failed);
    assert_eq!(current.status, OrderStatus::Pending);
    assert!(current.transaction_id.is_none());
}

#[tokio::test]
async fn wallet_b_callback_correlates_by_short_order_id() {
    let h = harness(&configured(UNUSED_PROVIDER));
    let id = Uuid::parse_str("1a2b3c4d-5e6f-4a1b-8c2d-3e4f5a6b7c8d").unwrap();
    let order = seed(&h, PaymentMethod::EasyPaisa, id, None).await;

    let body = b"orderId=MS-1a2b3c4d&status=0000&transactionId=EP901";
    h.webhooks.handle_webhook("easypaisa", body, &HeaderMap::new()).await.unwrap();

    let current = h.ledger.get_order(order.id).await.unwrap();
    assert_eq!(current.payment_status, PaymentStatus::Paid);
    assert_eq!(current.transaction_id.as_deref(), Some("EP901"));
}

#[tokio::test]
async fn wallet_b_ambiguous_prefix_is_not_applied() {
    let h = harness(&configured(UNUSED_PROVIDER));
    let a = seed(&h, PaymentMethod::EasyPaisa, Uuid::parse_str("9e9e9e9e-0000-4000-8000-00000000000a").unwrap(), None).await;
    let b = seed(&h, PaymentMethod::EasyPaisa, Uuid::parse_str("9e9e9e9e-0000-4000-8000-00000000000b").unwrap(), None).await;

    let body = b"orderId=MS-9e9e9e9e&status=0000&transactionId=EP1";
    assert!(h.webhooks.handle_webhook("easypaisa", body, &HeaderMap::new()).await.unwrap().received);

    for id in [a.id, b.id] {
        assert_eq!(
            h.ledger.get_order(id).await.unwrap().payment_status,
            PaymentStatus::Unpaid
        );
    }
}

#[tokio::test]
async fn callbacks_resolve_last_write_wins() {
    let h = harness(&configured(UNUSED_PROVIDER));
    let order = seed(&h, PaymentMethod::Safepay, Uuid::new_v4(), Some("tok_5")).await;

    let paid = safepay_event("payment:completed", "tok_5", "trk_5");
    let failed = safepay_event("payment:failed", "tok_5", "trk_5");

    h.webhooks.handle_webhook("safepay", &paid, &signed(&paid)).await.unwrap();
    h.webhooks.handle_webhook("safepay", &failed, &signed(&failed)).await.unwrap();
    let current = h.ledger.get_order(order.id).await.unwrap();
    assert_eq!(current.payment_status, PaymentStatus::Failed);
    assert!(current.transaction_id.is_none());
    // order status is not rolled back by a failure
    assert_eq!(current.status, OrderStatus::Processing);

    h.webhooks.handle_webhook("safepay", &paid, &signed(&paid)).await.unwrap();
    let current = h.ledger.get_order(order.id).await.unwrap();
    assert_eq!(current.payment_status, PaymentStatus::Paid);
    assert!(current.updated_at >= order.updated_at);
}

#[tokio::test]
async fn refunded_orders_are_not_reopened_by_callbacks() {
    let h = harness(&configured(UNUSED_PROVIDER));
    let order = seed(&h, PaymentMethod::Safepay, Uuid::new_v4(), Some("tok_6")).await;

    let paid = safepay_event("payment:completed", "tok_6", "trk_6");
    h.webhooks.handle_webhook("safepay", &paid, &signed(&paid)).await.unwrap();
    let refunded = h.ledger.mark_refunded(order.id).await.unwrap();
    assert_eq!(refunded.payment_status, PaymentStatus::Refunded);

    h.webhooks.handle_webhook("safepay", &paid, &signed(&paid)).await.unwrap();
    let current = h.ledger.get_order(order.id).await.unwrap();
    assert_eq!(current.payment_status, PaymentStatus::Refunded);
    assert!(current.transaction_id.is_none());
}
