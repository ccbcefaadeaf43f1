//! Order repository for database operations.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::instrument;

use quickbite_core::{
    DeliveryDetails, Money, NewOrder, Order, OrderId, OrderLine, OrderStatus, PaymentMethod,
    ProductId, UserId,
};

use super::quantity_from_db;
use crate::db::RepositoryError;
use crate::models::Stats;

const ORDER_COLUMNS: &str = "id, user_id, total_amount, status, payment_method, address, phone, note, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    user_id: UserId,
    total_amount: Money,
    status: OrderStatus,
    payment_method: PaymentMethod,
    address: String,
    phone: String,
    note: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, lines: Vec<OrderLine>) -> Order {
        Order {
            id: self.id,
            user_id: self.user_id,
            lines,
            total_amount: self.total_amount,
            status: self.status,
            payment_method: self.payment_method,
            delivery: DeliveryDetails {
                address: self.address,
                phone: self.phone,
                note: self.note,
            },
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    order_id: OrderId,
    product_id: ProductId,
    quantity: i64,
    price: Money,
}

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert an order with its lines and take exactly those quantities out
    /// of the owner's cart, in one transaction. Lines added to the cart after
    /// the order was priced stay in the cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any statement fails; nothing is
    /// written in that case.
    #[instrument(skip(self, order), fields(user_id = %order.user_id, total = %order.total_amount))]
    pub async fn place(&self, order: NewOrder) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let (id, created_at): (OrderId, DateTime<Utc>) = sqlx::query_as(
            r"
            INSERT INTO orders (user_id, total_amount, status, payment_method, address, phone, note)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, created_at
            ",
        )
        .bind(order.user_id)
        .bind(order.total_amount)
        .bind(OrderStatus::Pending)
        .bind(order.payment_method)
        .bind(&order.delivery.address)
        .bind(&order.delivery.phone)
        .bind(&order.delivery.note)
        .fetch_one(&mut *tx)
        .await?;

        let positions: Vec<i32> = (0..).take(order.lines.len()).collect();
        let product_ids: Vec<i32> = order.lines.iter().map(|l| l.product_id.as_i32()).collect();
        let quantities: Vec<i64> = order.lines.iter().map(|l| i64::from(l.quantity)).collect();
        let prices: Vec<Decimal> = order.lines.iter().map(|l| l.price.amount()).collect();

        sqlx::query(
            r"
            INSERT INTO order_items (order_id, position, product_id, quantity, price)
            SELECT $1, item.position, item.product_id, item.quantity, item.price
            FROM UNNEST($2::int4[], $3::int4[], $4::int8[], $5::numeric[])
                AS item(position, product_id, quantity, price)
            ",
        )
        .bind(id)
        .bind(&positions)
        .bind(&product_ids)
        .bind(&quantities)
        .bind(&prices)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
            DELETE FROM cart_items c
            USING UNNEST($2::int4[], $3::int8[]) AS item(product_id, quantity)
            WHERE c.user_id = $1
              AND c.product_id = item.product_id
              AND c.quantity <= item.quantity
            ",
        )
        .bind(order.user_id)
        .bind(&product_ids)
        .bind(&quantities)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
            UPDATE cart_items c
            SET quantity = c.quantity - item.quantity
            FROM UNNEST($2::int4[], $3::int8[]) AS item(product_id, quantity)
            WHERE c.user_id = $1 AND c.product_id = item.product_id
            ",
        )
        .bind(order.user_id)
        .bind(&product_ids)
        .bind(&quantities)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
            UPDATE carts
            SET total_amount = COALESCE((
                    SELECT SUM(p.price * ci.quantity)
                    FROM cart_items ci
                    JOIN products p ON p.id = ci.product_id
                    WHERE ci.user_id = $1
                ), 0),
                updated_at = now()
            WHERE user_id = $1
            ",
        )
        .bind(order.user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(order_id = %id, "Order placed");
        Ok(Order::from_new(id, order, created_at))
    }

    /// Get an order with its lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row: Option<OrderRow> =
            sqlx::query_as(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
                .bind(id)
                .fetch_optional(self.pool)
                .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut lines = self.lines_for(&[row.id]).await?;
        let lines = lines.remove(&row.id).unwrap_or_default();
        Ok(Some(row.into_order(lines)))
    }

    /// List orders newest first, for one user or for everyone.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, user_id: Option<UserId>) -> Result<Vec<Order>, RepositoryError> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            r"
            SELECT {ORDER_COLUMNS} FROM orders
            WHERE $1::int4 IS NULL OR user_id = $1
            ORDER BY created_at DESC, id DESC
            "
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        let ids: Vec<OrderId> = rows.iter().map(|r| r.id).collect();
        let mut lines = self.lines_for(&ids).await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let order_lines = lines.remove(&row.id).unwrap_or_default();
                row.into_order(order_lines)
            })
            .collect())
    }

    async fn lines_for(
        &self,
        ids: &[OrderId],
    ) -> Result<HashMap<OrderId, Vec<OrderLine>>, RepositoryError> {
        let ids: Vec<i32> = ids.iter().map(OrderId::as_i32).collect();
        let rows: Vec<OrderItemRow> = sqlx::query_as(
            r"
            SELECT order_id, product_id, quantity, price FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY order_id, position
            ",
        )
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        let mut lines: HashMap<OrderId, Vec<OrderLine>> = HashMap::new();
        for row in rows {
            lines.entry(row.order_id).or_default().push(OrderLine {
                product_id: row.product_id,
                quantity: quantity_from_db(row.quantity)?,
                price: row.price,
            });
        }
        Ok(lines)
    }

    /// Compare-and-set the status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    /// Returns `RepositoryError::Conflict` if the status is no longer `expected`.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        id: OrderId,
        expected: OrderStatus,
        next: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        let updated: Option<(OrderId,)> = sqlx::query_as(
            r"
            UPDATE orders SET status = $3, updated_at = now()
            WHERE id = $1 AND status = $2
            RETURNING id
            ",
        )
        .bind(id)
        .bind(expected)
        .bind(next)
        .fetch_optional(self.pool)
        .await?;

        if updated.is_none() {
            let current: Option<(OrderStatus,)> =
                sqlx::query_as("SELECT status FROM orders WHERE id = $1")
                    .bind(id)
                    .fetch_optional(self.pool)
                    .await?;
            return Err(match current {
                Some((status,)) => RepositoryError::Conflict(format!("order {id} is now {status}")),
                None => RepositoryError::NotFound,
            });
        }

        self.get_by_id(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Delete an order and its lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: OrderId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Dashboard counts and revenue.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn stats(&self) -> Result<Stats, RepositoryError> {
        let (total_orders, total_users, total_products, revenue, gross): (
            i64,
            i64,
            i64,
            Decimal,
            Decimal,
        ) = sqlx::query_as(
            r"
            SELECT
                (SELECT COUNT(*) FROM orders),
                (SELECT COUNT(*) FROM users),
                (SELECT COUNT(*) FROM products),
                (SELECT COALESCE(SUM(total_amount), 0) FROM orders WHERE status = 'Successful'),
                (SELECT COALESCE(SUM(total_amount), 0) FROM orders)
            ",
        )
        .fetch_one(self.pool)
        .await?;

        let by_status: Vec<(OrderStatus, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM orders GROUP BY status")
                .fetch_all(self.pool)
                .await?;

        let money = |amount: Decimal| {
            Money::new(amount)
                .map_err(|e| RepositoryError::DataCorruption(format!("invalid order total: {e}")))
        };

        Ok(Stats {
            total_orders,
            total_users,
            total_products,
            total_revenue: money(revenue)?,
            gross_order_value: money(gross)?,
            orders_by_status: Stats::status_counts(&by_status),
        })
    }
}
