use crate::domain::order::{Order, OrderItem, ShippingAddress};
use crate::repo::order_store::{OrderStore, OrderTx};
use anyhow::Result;
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

const ORDER_COLUMNS: &str = r#"
    id, customer_name, customer_email, customer_phone, status, subtotal, shipping, discount,
    total, promo_code, payment_method, payment_status, transaction_id, gateway_session_id,
    shipping_address, created_at, updated_at
"#;

#[derive(Clone)]
pub struct OrdersRepo {
    pub pool: PgPool,
}

pub struct PgOrderTx {
    tx: Transaction<'static, Postgres>,
}

impl OrdersRepo {
    async fn load(&self, row: Option<PgRow>) -> Result<Option<Order>> {
        let Some(row) = row else {
            return Ok(None);
        };
        let id: Uuid = row.try_get("id")?;
        let items = load_items(&self.pool, id).await?;
        Ok(Some(order_from_row(&row, items)?))
    }
}

#[async_trait]
impl OrderStore for OrdersRepo {
    async fn begin(&self) -> Result<Box<dyn OrderTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgOrderTx { tx }))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        self.load(row).await
    }

    async fn find_by_session(&self, session_token: &str) -> Result<Option<Order>> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE gateway_session_id = $1"
        ))
        .bind(session_token)
        .fetch_optional(&self.pool)
        .await?;
        self.load(row).await
    }

    async fn find_by_id_prefix(&self, prefix: &str) -> Result<Vec<Order>> {
        // callers only pass hex/hyphen prefixes, so no LIKE escaping is needed
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id::text LIKE $1 ORDER BY created_at ASC LIMIT 2"
        ))
        .bind(format!("{prefix}%"))
        .fetch_all(&self.pool)
        .await?;

        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            if let Some(order) = self.load(Some(row)).await? {
                orders.push(order);
            }
        }
        Ok(orders)
    }

    async fn save(&self, order: &Order) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        update_order_row(&mut conn, order).await
    }
}

#[async_trait]
impl OrderTx for PgOrderTx {
    async fn insert_order(&mut self, order: &Order) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (
                id, customer_name, customer_email, customer_phone, status, subtotal, shipping,
                discount, total, promo_code, payment_method, payment_status, transaction_id,
                gateway_session_id, shipping_address, created_at, updated_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7,
                $8, $9, $10, $11, $12, $13,
                $14, $15, $16, $17
            )
            "#,
        )
        .bind(order.id)
        .bind(&order.customer_name)
        .bind(&order.customer_email)
        .bind(&order.customer_phone)
        .bind(order.status.as_str())
        .bind(order.subtotal)
        .bind(order.shipping)
        .bind(order.discount)
        .bind(order.total)
        .bind(&order.promo_code)
        .bind(order.payment_method.as_str())
        .bind(order.payment_status.as_str())
        .bind(&order.transaction_id)
        .bind(&order.gateway_session_id)
        .bind(order.shipping_address.clone().map(Json))
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(self.tx.as_mut())
        .await?;

        for item in &order.items {
            sqlx::query(
                r#"
                INSERT INTO order_items (id, order_id, product_id, name, price, quantity, size, color)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(item.id)
            .bind(order.id)
            .bind(&item.product_id)
            .bind(&item.name)
            .bind(item.price)
            .bind(item.quantity)
            .bind(&item.size)
            .bind(&item.color)
            .execute(self.tx.as_mut())
            .await?;
        }

        Ok(())
    }

    async fn update_order(&mut self, order: &Order) -> Result<()> {
        update_order_row(self.tx.as_mut(), order).await
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

async fn update_order_row(conn: &mut PgConnection, order: &Order) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE orders
        SET status = $2, payment_status = $3, transaction_id = $4,
            gateway_session_id = $5, updated_at = $6
        WHERE id = $1
        "#,
    )
    .bind(order.id)
    .bind(order.status.as_str())
    .bind(order.payment_status.as_str())
    .bind(&order.transaction_id)
    .bind(&order.gateway_session_id)
    .bind(order.updated_at)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        anyhow::bail!("order {} does not exist", order.id);
    }
    Ok(())
}

async fn load_items(pool: &PgPool, order_id: Uuid) -> Result<Vec<OrderItem>> {
    let rows = sqlx::query(
        "SELECT id, product_id, name, price, quantity, size, color FROM order_items WHERE order_id = $1 ORDER BY id",
    )
    .bind(order_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|r| {
            Ok(OrderItem {
                id: r.try_get("id")?,
                product_id: r.try_get("product_id")?,
                name: r.try_get("name")?,
                price: r.try_get("price")?,
                quantity: r.try_get("quantity")?,
                size: r.try_get("size")?,
                color: r.try_get("color")?,
            })
        })
        .collect()
}

fn order_from_row(r: &PgRow, items: Vec<OrderItem>) -> Result<Order> {
    let status: String = r.try_get("status")?;
    let payment_method: String = r.try_get("payment_method")?;
    let payment_status: String = r.try_get("payment_status")?;
    let shipping_address: Option<Json<ShippingAddress>> = r.try_get("shipping_address")?;

    Ok(Order {
        id: r.try_get("id")?,
        customer_name: r.try_get("customer_name")?,
        customer_email: r.try_get("customer_email")?,
        customer_phone: r.try_get("customer_phone")?,
        status: status.parse()?,
        subtotal: r.try_get("subtotal")?,
        shipping: r.try_get("shipping")?,
        discount: r.try_get("discount")?,
        total: r.try_get("total")?,
        promo_code: r.try_get("promo_code")?,
        payment_method: payment_method.parse()?,
        payment_status: payment_status.parse()?,
        transaction_id: r.try_get("transaction_id")?,
        gateway_session_id: r.try_get("gateway_session_id")?,
        shipping_address: shipping_address.map(|Json(a)| a),
        items,
        created_at: r.try_get("created_at")?,
        updated_at: r.try_get("updated_at")?,
    })
}
