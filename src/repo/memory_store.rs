use crate::domain::order::Order;
use crate::repo::order_store::{OrderStore, OrderTx};
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Process-local `OrderStore`. Transaction writes are staged and applied
/// atomically on commit; session tokens are unique like the Postgres index.
#[derive(Default, Clone)]
pub struct InMemoryOrderStore {
    orders: Arc<RwLock<HashMap<Uuid, Order>>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.orders.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.orders.read().await.is_empty()
    }

    pub async fn all(&self) -> Vec<Order> {
        let mut orders: Vec<Order> = self.orders.read().await.values().cloned().collect();
        orders.sort_by_key(|o| o.created_at);
        orders
    }
}

fn ensure_session_unique(orders: &HashMap<Uuid, Order>, order: &Order) -> Result<()> {
    if let Some(token) = order.gateway_session_id.as_deref() {
        let clash = orders
            .values()
            .any(|o| o.id != order.id && o.gateway_session_id.as_deref() == Some(token));
        if clash {
            bail!("gateway_session_id {token} already attached to another order");
        }
    }
    Ok(())
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn begin(&self) -> Result<Box<dyn OrderTx>> {
        Ok(Box::new(InMemoryOrderTx {
            orders: self.orders.clone(),
            staged: Vec::new(),
        }))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>> {
        Ok(self.orders.read().await.get(&id).cloned())
    }

    async fn find_by_session(&self, session_token: &str) -> Result<Option<Order>> {
        let orders = self.orders.read().await;
        Ok(orders
            .values()
            .find(|o| o.gateway_session_id.as_deref() == Some(session_token))
            .cloned())
    }

    async fn find_by_id_prefix(&self, prefix: &str) -> Result<Vec<Order>> {
        let orders = self.orders.read().await;
        Ok(orders
            .values()
            .filter(|o| o.id.to_string().starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn save(&self, order: &Order) -> Result<()> {
        let mut orders = self.orders.write().await;
        if !orders.contains_key(&order.id) {
            bail!("order {} does not exist", order.id);
        }
        ensure_session_unique(&orders, order)?;
        orders.insert(order.id, order.clone());
        Ok(())
    }
}

struct InMemoryOrderTx {
    orders: Arc<RwLock<HashMap<Uuid, Order>>>,
    staged: Vec<Order>,
}

#[async_trait]
impl OrderTx for InMemoryOrderTx {
    async fn insert_order(&mut self, order: &Order) -> Result<()> {
        if self.orders.read().await.contains_key(&order.id)
            || self.staged.iter().any(|o| o.id == order.id)
        {
            bail!("order {} already exists", order.id);
        }
        self.staged.push(order.clone());
        Ok(())
    }

    async fn update_order(&mut self, order: &Order) -> Result<()> {
        if let Some(staged) = self.staged.iter_mut().find(|o| o.id == order.id) {
            *staged = order.clone();
            return Ok(());
        }
        if !self.orders.read().await.contains_key(&order.id) {
            bail!("order {} does not exist", order.id);
        }
        self.staged.push(order.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let InMemoryOrderTx { orders, staged } = *self;
        let mut orders = orders.write().await;
        for order in &staged {
            ensure_session_unique(&orders, order)?;
        }
        for order in staged {
            orders.insert(order.id, order);
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}
