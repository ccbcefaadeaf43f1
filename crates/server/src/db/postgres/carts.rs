//! Cart repository for database operations.

use sqlx::PgPool;
use tracing::instrument;

use quickbite_core::{Cart, CartLine, Money, ProductId, UserId};

use super::quantity_from_db;
use crate::db::RepositoryError;

#[derive(sqlx::FromRow)]
struct CartItemRow {
    product_id: ProductId,
    quantity: i64,
}

/// Repository for cart database operations.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Load a user's cart with its lines in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored quantity is invalid.
    pub async fn get(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError> {
        let total: Option<(Money,)> =
            sqlx::query_as("SELECT total_amount FROM carts WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(self.pool)
                .await?;

        let Some((total,)) = total else {
            return Ok(None);
        };

        let rows: Vec<CartItemRow> = sqlx::query_as(
            r"
            SELECT product_id, quantity FROM cart_items
            WHERE user_id = $1
            ORDER BY position
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        let lines = rows
            .into_iter()
            .map(|row| {
                Ok(CartLine {
                    product_id: row.product_id,
                    quantity: quantity_from_db(row.quantity)?,
                })
            })
            .collect::<Result<Vec<_>, RepositoryError>>()?;

        Ok(Some(Cart::from_parts(user_id, lines, total)))
    }

    /// Upsert the cart and replace its lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the owning user no longer exists.
    /// Returns `RepositoryError::Database` for other database errors.
    #[instrument(skip(self, cart), fields(user_id = %cart.user_id(), lines = cart.line_count()))]
    pub async fn save(&self, cart: &Cart) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r"
            INSERT INTO carts (user_id, total_amount)
            VALUES ($1, $2)
            ON CONFLICT (user_id)
            DO UPDATE SET total_amount = EXCLUDED.total_amount, updated_at = now()
            ",
        )
        .bind(cart.user_id())
        .bind(cart.total_amount())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_foreign_key_violation()
            {
                return RepositoryError::NotFound;
            }
            RepositoryError::Database(e)
        })?;

        sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(cart.user_id())
            .execute(&mut *tx)
            .await?;

        let product_ids: Vec<i32> = cart.lines().iter().map(|l| l.product_id.as_i32()).collect();
        let quantities: Vec<i64> = cart.lines().iter().map(|l| i64::from(l.quantity)).collect();
        let positions: Vec<i32> = (0..).take(product_ids.len()).collect();

        sqlx::query(
            r"
            INSERT INTO cart_items (user_id, product_id, quantity, position)
            SELECT $1, item.product_id, item.quantity, item.position
            FROM UNNEST($2::int4[], $3::int8[], $4::int4[])
                AS item(product_id, quantity, position)
            ",
        )
        .bind(cart.user_id())
        .bind(&product_ids)
        .bind(&quantities)
        .bind(&positions)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Update the cached total only.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn set_total(&self, user_id: UserId, total: Money) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE carts SET total_amount = $2 WHERE user_id = $1")
            .bind(user_id)
            .bind(total)
            .execute(self.pool)
            .await?;
        Ok(())
    }
}
