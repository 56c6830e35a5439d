use crate::domain::order::Order;
use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

/// Persistence port for the order aggregate. Every write is a single order
/// row (plus its items on insert).
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn OrderTx>>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>>;

    /// Exact match on `gateway_session_id`.
    async fn find_by_session(&self, session_token: &str) -> Result<Option<Order>>;

    /// Orders whose id text starts with `prefix`.
    async fn find_by_id_prefix(&self, prefix: &str) -> Result<Vec<Order>>;

    /// Autocommitted update of the mutable columns of one order.
    async fn save(&self, order: &Order) -> Result<()>;
}

/// Unit of work spanning one checkout request. Dropping it without
/// `commit` discards every write.
#[async_trait]
pub trait OrderTx: Send {
    async fn insert_order(&mut self, order: &Order) -> Result<()>;

    async fn update_order(&mut self, order: &Order) -> Result<()>;

    async fn commit(self: Box<Self>) -> Result<()>;

    async fn rollback(self: Box<Self>) -> Result<()>;
}
