//! `PostgreSQL` implementation of [`Store`].
//!
//! One repository per table group, each borrowing the pool the way the
//! handlers borrow [`PgStore`]. Queries are checked at runtime (`query_as`
//! with `FromRow` rows) so the crate builds without a live database.

mod carts;
mod orders;
mod products;
mod users;

pub use carts::CartRepository;
pub use orders::OrderRepository;
pub use products::ProductRepository;
pub use users::UserRepository;

use async_trait::async_trait;
use sqlx::PgPool;

use quickbite_core::{
    Cart, Email, Money, NewOrder, Order, OrderId, OrderStatus, ProductId, Role, UserId,
};

use super::{CartStore, OrderStore, ProductStore, RepositoryError, Store, UserStore};
use crate::models::{
    NewProduct, NewUser, Product, ProductFilter, ProductUpdate, ProfileUpdate, Stats, User,
};

/// Store backed by a `PostgreSQL` pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    const fn users(&self) -> UserRepository<'_> {
        UserRepository::new(&self.pool)
    }

    const fn products(&self) -> ProductRepository<'_> {
        ProductRepository::new(&self.pool)
    }

    const fn carts(&self) -> CartRepository<'_> {
        CartRepository::new(&self.pool)
    }

    const fn orders(&self) -> OrderRepository<'_> {
        OrderRepository::new(&self.pool)
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        self.users().create(&user).await
    }

    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        self.users().get_by_id(id).await
    }

    async fn credentials_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        self.users().get_password_hash(email).await
    }

    async fn users_by_ids(&self, ids: &[UserId]) -> Result<Vec<User>, RepositoryError> {
        self.users().get_many(ids).await
    }

    async fn list_users(&self) -> Result<Vec<User>, RepositoryError> {
        self.users().list().await
    }

    async fn update_profile(
        &self,
        id: UserId,
        update: ProfileUpdate,
    ) -> Result<User, RepositoryError> {
        self.users().update_profile(id, &update).await
    }

    async fn set_role(&self, email: &Email, role: Role) -> Result<User, RepositoryError> {
        self.users().set_role(email, role).await
    }

    async fn delete_user(&self, id: UserId) -> Result<(), RepositoryError> {
        self.users().delete(id).await
    }
}

#[async_trait]
impl ProductStore for PgStore {
    async fn create_product(&self, product: NewProduct) -> Result<Product, RepositoryError> {
        self.products().create(&product).await
    }

    async fn product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        self.products().get_by_id(id).await
    }

    async fn products(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError> {
        self.products().list(filter).await
    }

    async fn products_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        self.products().get_many(ids).await
    }

    async fn update_product(
        &self,
        id: ProductId,
        update: ProductUpdate,
    ) -> Result<Product, RepositoryError> {
        self.products().update(id, &update).await
    }

    async fn delete_product(&self, id: ProductId) -> Result<(), RepositoryError> {
        self.products().delete(id).await
    }
}

#[async_trait]
impl CartStore for PgStore {
    async fn load_cart(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError> {
        self.carts().get(user_id).await
    }

    async fn save_cart(&self, cart: &Cart) -> Result<(), RepositoryError> {
        self.carts().save(cart).await
    }

    async fn set_cart_total(&self, user_id: UserId, total: Money) -> Result<(), RepositoryError> {
        self.carts().set_total(user_id, total).await
    }
}

#[async_trait]
impl OrderStore for PgStore {
    async fn place_order(&self, order: NewOrder) -> Result<Order, RepositoryError> {
        self.orders().place(order).await
    }

    async fn order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        self.orders().get_by_id(id).await
    }

    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        self.orders().list(Some(user_id)).await
    }

    async fn all_orders(&self) -> Result<Vec<Order>, RepositoryError> {
        self.orders().list(None).await
    }

    async fn update_order_status(
        &self,
        id: OrderId,
        expected: OrderStatus,
        next: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        self.orders().update_status(id, expected, next).await
    }

    async fn delete_order(&self, id: OrderId) -> Result<(), RepositoryError> {
        self.orders().delete(id).await
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }

    async fn stats(&self) -> Result<Stats, RepositoryError> {
        self.orders().stats().await
    }
}

/// Convert a stored quantity back to the domain type.
fn quantity_from_db(quantity: i64) -> Result<u32, RepositoryError> {
    u32::try_from(quantity)
        .ok()
        .filter(|q| *q > 0)
        .ok_or_else(|| RepositoryError::DataCorruption(format!("invalid quantity {quantity}")))
}
