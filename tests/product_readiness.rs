use storefront_payments::config::AppConfig;
use storefront_payments::domain::order::PaymentMethod;
use storefront_payments::gateways::GatewayRegistry;

#[test]
fn defaults_serve_cod_only() {
    let cfg = AppConfig::from_lookup(|_| None);
    assert_eq!(cfg.bind_addr, "0.0.0.0:8000");
    assert_eq!(cfg.gateway_timeout_ms, 30_000);
    assert_eq!(cfg.checkout_rate_limit_per_minute, 30);

    let registry = GatewayRegistry::from_config(&cfg, reqwest::Client::new());
    assert_eq!(registry.configured_methods(), vec![PaymentMethod::Cod]);
}

#[test]
fn wallet_credentials_enable_wallet_checkout() {
    let cfg = AppConfig::from_lookup(|key| match key {
        "JAZZCASH_MERCHANT_ID" => Some("MC1001".to_string()),
        "JAZZCASH_PASSWORD" => Some("pw".to_string()),
        "JAZZCASH_INTEGRITY_SALT" => Some("salt".to_string()),
        _ => None,
    });
    let registry = GatewayRegistry::from_config(&cfg, reqwest::Client::new());
    assert_eq!(
        registry.configured_methods(),
        vec![PaymentMethod::JazzCash, PaymentMethod::Cod]
    );
    assert!(registry.initiator("wallet-a".parse().unwrap()).is_ok());
}

#[test]
fn readiness_endpoints_exist_in_readme() {
    let readme = std::fs::read_to_string("README.md").unwrap_or_default();
    assert!(readme.contains("/ops/readiness"));
    assert!(readme.contains("/ops/liveness"));
    assert!(readme.contains("/api/payment/webhook/:provider"));
}
