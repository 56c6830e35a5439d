pub mod config;
pub mod domain {
    pub mod money;
    pub mod order;
    pub mod payment;
}
pub mod error;
pub mod gateways;
pub mod http {
    pub mod handlers {
        pub mod ops;
        pub mod payments;
        pub mod webhooks;
    }
    pub mod middleware {
        pub mod rate_limit;
    }
}
pub mod repo {
    pub mod memory_store;
    pub mod order_store;
    pub mod orders_repo;
}
pub mod service {
    pub mod order_ledger;
    pub mod payment_service;
    pub mod webhook_reconciler;
}

#[derive(Clone)]
pub struct AppState {
    pub payment_service: service::payment_service::PaymentService,
    pub webhook_reconciler: service::webhook_reconciler::WebhookReconciler,
    pub ledger: service::order_ledger::OrderLedger,
    pub pool: sqlx::PgPool,
    pub redis_client: redis::Client,
}
