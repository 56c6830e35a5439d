use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use storefront_payments::config::AppConfig;
use storefront_payments::gateways::GatewayRegistry;
use storefront_payments::http::handlers::{ops, payments, webhooks};
use storefront_payments::http::middleware::rate_limit::{self, RateLimitState};
use storefront_payments::repo::orders_repo::OrdersRepo;
use storefront_payments::service::order_ledger::OrderLedger;
use storefront_payments::service::payment_service::PaymentService;
use storefront_payments::service::webhook_reconciler::WebhookReconciler;
use storefront_payments::AppState;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env();

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&cfg.database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let redis_client = redis::Client::open(cfg.redis_url.clone())?;

    let ledger = OrderLedger::new(Arc::new(OrdersRepo { pool: pool.clone() }));
    let gateways = GatewayRegistry::from_config(&cfg, reqwest::Client::new());

    let configured: Vec<&str> = gateways
        .configured_methods()
        .into_iter()
        .map(|m| m.as_str())
        .collect();
    tracing::info!("payment methods enabled: {}", configured.join(", "));

    let state = AppState {
        payment_service: PaymentService {
            ledger: ledger.clone(),
            gateways: gateways.clone(),
        },
        webhook_reconciler: WebhookReconciler {
            ledger: ledger.clone(),
            gateways,
        },
        ledger,
        pool,
        redis_client: redis_client.clone(),
    };

    let checkout_routes = Router::new()
        .route("/api/payment/:method/create", post(payments::create_payment))
        .route_layer(from_fn_with_state(
            RateLimitState {
                redis_client,
                max_per_minute: cfg.checkout_rate_limit_per_minute,
            },
            rate_limit::enforce,
        ));

    let app = Router::new()
        .route("/health", get(payments::health))
        .route("/api/payment/webhook/:provider", post(webhooks::handle_webhook))
        .route("/api/payment/orders/:order_id", get(payments::get_order))
        .route("/ops/readiness", get(ops::readiness))
        .route("/ops/liveness", get(ops::liveness))
        .merge(checkout_routes)
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    tracing::info!("listening on {}", cfg.bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}
