#![allow(dead_code)]

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::Arc;
use storefront_payments::config::AppConfig;
use storefront_payments::domain::payment::{CheckoutItem, CheckoutRequest};
use storefront_payments::gateways::GatewayRegistry;
use storefront_payments::repo::memory_store::InMemoryOrderStore;
use storefront_payments::service::order_ledger::OrderLedger;
use storefront_payments::service::payment_service::PaymentService;
use storefront_payments::service::webhook_reconciler::WebhookReconciler;

pub const WEBHOOK_SECRET: &str = "whsec_test";

pub struct Harness {
    pub store: Arc<InMemoryOrderStore>,
    pub ledger: OrderLedger,
    pub payments: PaymentService,
    pub webhooks: WebhookReconciler,
}

/// Every provider configured against `provider_uri` (a wiremock server).
pub fn configured(provider_uri: &str) -> AppConfig {
    let vars: HashMap<&str, String> = [
        ("FRONTEND_URL", "https://shop.example/".to_string()),
        ("GATEWAY_TIMEOUT_MS", "2000".to_string()),
        ("SAFEPAY_API_KEY", "sec_key".to_string()),
        ("SAFEPAY_SECRET_KEY", "sec_secret".to_string()),
        ("SAFEPAY_WEBHOOK_SECRET", WEBHOOK_SECRET.to_string()),
        ("SAFEPAY_BASE_URL", provider_uri.to_string()),
        ("JAZZCASH_MERCHANT_ID", "MC1001".to_string()),
        ("JAZZCASH_PASSWORD", "pw".to_string()),
        ("JAZZCASH_INTEGRITY_SALT", "salt".to_string()),
        ("JAZZCASH_BASE_URL", format!("{provider_uri}/jazzcash")),
        ("EASYPAISA_STORE_ID", "4321".to_string()),
        ("EASYPAISA_HASH_KEY", "hk".to_string()),
        ("EASYPAISA_BASE_URL", format!("{provider_uri}/easypaisa")),
    ]
    .into_iter()
    .collect();
    AppConfig::from_lookup(|key| vars.get(key).cloned())
}

pub fn unconfigured() -> AppConfig {
    AppConfig::from_lookup(|_| None)
}

pub fn harness(cfg: &AppConfig) -> Harness {
    let store = Arc::new(InMemoryOrderStore::new());
    let ledger = OrderLedger::new(store.clone());
    let gateways = GatewayRegistry::from_config(cfg, reqwest::Client::new());
    Harness {
        store,
        payments: PaymentService {
            ledger: ledger.clone(),
            gateways: gateways.clone(),
        },
        webhooks: WebhookReconciler {
            ledger: ledger.clone(),
            gateways,
        },
        ledger,
    }
}

/// One line of `qty` units at `price`, no shipping or discount.
pub fn checkout(price: Decimal, qty: i32) -> CheckoutRequest {
    let subtotal = price * Decimal::from(qty);
    CheckoutRequest {
        items: vec![CheckoutItem {
            product_id: "kurta-22".to_string(),
            name: "Block Print Kurta".to_string(),
            price,
            quantity: qty,
            size: Some("L".to_string()),
            color: Some("indigo".to_string()),
        }],
        subtotal,
        shipping: dec!(0),
        discount: dec!(0),
        total: subtotal,
        customer_email: Some("ayesha@example.com".to_string()),
        customer_name: Some("Ayesha".to_string()),
        customer_phone: Some("03001234567".to_string()),
        shipping_address: None,
        promo_code: None,
        payment_method: None,
        mobile_number: None,
    }
}

pub fn wallet_checkout(mobile: &str) -> CheckoutRequest {
    let mut req = checkout(dec!(1500), 2);
    req.mobile_number = Some(mobile.to_string());
    req
}
