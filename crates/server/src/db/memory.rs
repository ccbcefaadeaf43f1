//! In-memory [`Store`] for tests and local demos.
//!
//! All data lives behind one `tokio::sync::RwLock`, so every method is
//! atomic with respect to the others. Checkout holds the write lock while it
//! inserts the order and takes the ordered lines out of the cart.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use quickbite_core::{
    Cart, Email, Money, NewOrder, Order, OrderId, OrderStatus, ProductId, Role, UserId,
};

use super::{CartStore, OrderStore, ProductStore, RepositoryError, Store, UserStore};
use crate::models::user::{DEFAULT_AVATAR, DEFAULT_PHONE};
use crate::models::{
    NewProduct, NewUser, Product, ProductFilter, ProductUpdate, ProfileUpdate, Stats, User,
};

struct StoredUser {
    user: User,
    password_hash: String,
}

#[derive(Default)]
struct State {
    users: BTreeMap<UserId, StoredUser>,
    products: BTreeMap<ProductId, Product>,
    carts: HashMap<UserId, Cart>,
    orders: BTreeMap<OrderId, Order>,
    last_user_id: i32,
    last_product_id: i32,
    last_order_id: i32,
}

/// Store that keeps everything in process memory.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn next_id(counter: &mut i32) -> i32 {
    *counter += 1;
    *counter
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, new: NewUser) -> Result<User, RepositoryError> {
        let mut state = self.state.write().await;
        if state.users.values().any(|s| s.user.email == new.email) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        let now = Utc::now();
        let id = UserId::new(next_id(&mut state.last_user_id));
        let user = User {
            id,
            name: new.name,
            email: new.email,
            role: new.role,
            phone: DEFAULT_PHONE.to_owned(),
            address: String::new(),
            image: DEFAULT_AVATAR.to_owned(),
            created_at: now,
            updated_at: now,
        };
        state.users.insert(
            id,
            StoredUser {
                user: user.clone(),
                password_hash: new.password_hash,
            },
        );
        Ok(user)
    }

    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.users.get(&id).map(|s| s.user.clone()))
    }

    async fn credentials_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .find(|s| &s.user.email == email)
            .map(|s| (s.user.clone(), s.password_hash.clone())))
    }

    async fn users_by_ids(&self, ids: &[UserId]) -> Result<Vec<User>, RepositoryError> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.users.get(id))
            .map(|s| s.user.clone())
            .collect())
    }

    async fn list_users(&self) -> Result<Vec<User>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.users.values().rev().map(|s| s.user.clone()).collect())
    }

    async fn update_profile(
        &self,
        id: UserId,
        update: ProfileUpdate,
    ) -> Result<User, RepositoryError> {
        let mut state = self.state.write().await;
        let stored = state.users.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        stored.user.name = update.name;
        stored.user.phone = update.phone;
        stored.user.address = update.address;
        if let Some(image) = update.image {
            stored.user.image = image;
        }
        stored.user.updated_at = Utc::now();
        Ok(stored.user.clone())
    }

    async fn set_role(&self, email: &Email, role: Role) -> Result<User, RepositoryError> {
        let mut state = self.state.write().await;
        let stored = state
            .users
            .values_mut()
            .find(|s| &s.user.email == email)
            .ok_or(RepositoryError::NotFound)?;
        stored.user.role = role;
        stored.user.updated_at = Utc::now();
        Ok(stored.user.clone())
    }

    async fn delete_user(&self, id: UserId) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        state.users.remove(&id).ok_or(RepositoryError::NotFound)?;
        state.carts.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn create_product(&self, new: NewProduct) -> Result<Product, RepositoryError> {
        let mut state = self.state.write().await;
        let now = Utc::now();
        let id = ProductId::new(next_id(&mut state.last_product_id));
        let product = Product {
            id,
            name: new.name,
            description: new.description,
            price: new.price,
            category: new.category,
            stock: new.stock,
            image: new.image,
            created_at: now,
            updated_at: now,
        };
        state.products.insert(id, product.clone());
        Ok(product)
    }

    async fn product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.state.read().await.products.get(&id).cloned())
    }

    async fn products(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .products
            .values()
            .rev()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect())
    }

    async fn products_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.products.get(id))
            .cloned()
            .collect())
    }

    async fn update_product(
        &self,
        id: ProductId,
        update: ProductUpdate,
    ) -> Result<Product, RepositoryError> {
        let mut state = self.state.write().await;
        let product = state.products.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        update.apply_to(product, Utc::now());
        Ok(product.clone())
    }

    async fn delete_product(&self, id: ProductId) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        state
            .products
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }
}

#[async_trait]
impl CartStore for MemoryStore {
    async fn load_cart(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError> {
        Ok(self.state.read().await.carts.get(&user_id).cloned())
    }

    async fn save_cart(&self, cart: &Cart) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        state.carts.insert(cart.user_id(), cart.clone());
        Ok(())
    }

    async fn set_cart_total(&self, user_id: UserId, total: Money) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        if let Some(cart) = state.carts.get_mut(&user_id) {
            cart.set_total_amount(total);
        }
        Ok(())
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn place_order(&self, new: NewOrder) -> Result<Order, RepositoryError> {
        let mut state = self.state.write().await;
        let id = OrderId::new(next_id(&mut state.last_order_id));
        let order = Order::from_new(id, new, Utc::now());
        state.orders.insert(id, order.clone());

        let State { carts, products, .. } = &mut *state;
        if let Some(cart) = carts.get_mut(&order.user_id) {
            for line in &order.lines {
                cart.deduct(line.product_id, line.quantity);
            }
            let remaining = cart.lines().iter().filter_map(|line| {
                products
                    .get(&line.product_id)
                    .map(|p| p.price.times(line.quantity))
            });
            let total = remaining
                .collect::<Result<Vec<_>, _>>()
                .and_then(Money::sum)
                .unwrap_or(Money::ZERO);
            cart.set_total_amount(total);
        }
        Ok(order)
    }

    async fn order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self.state.read().await.orders.get(&id).cloned())
    }

    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .orders
            .values()
            .rev()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn all_orders(&self) -> Result<Vec<Order>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.orders.values().rev().cloned().collect())
    }

    async fn update_order_status(
        &self,
        id: OrderId,
        expected: OrderStatus,
        next: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        let mut state = self.state.write().await;
        let order = state.orders.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        if order.status != expected {
            return Err(RepositoryError::Conflict(format!(
                "order {id} is now {}",
                order.status
            )));
        }
        order.status = next;
        order.updated_at = Utc::now();
        Ok(order.clone())
    }

    async fn delete_order(&self, id: OrderId) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        state
            .orders
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }

    async fn stats(&self) -> Result<Stats, RepositoryError> {
        let state = self.state.read().await;
        let overflow = || RepositoryError::DataCorruption("order totals overflow".to_owned());

        let total_revenue = Money::sum(
            state
                .orders
                .values()
                .filter(|o| o.status == OrderStatus::Successful)
                .map(|o| o.total_amount),
        )
        .map_err(|_| overflow())?;
        let gross_order_value =
            Money::sum(state.orders.values().map(|o| o.total_amount)).map_err(|_| overflow())?;

        let by_status: Vec<(OrderStatus, i64)> =
            state.orders.values().map(|o| (o.status, 1)).collect();

        Ok(Stats {
            total_orders: count(state.orders.len()),
            total_users: count(state.users.len()),
            total_products: count(state.products.len()),
            total_revenue,
            gross_order_value,
            orders_by_status: Stats::status_counts(&by_status),
        })
    }
}

fn count(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use quickbite_core::{DeliveryDetails, PaymentMethod};

    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "Lan".to_owned(),
            email: Email::parse(email).unwrap(),
            password_hash: "hash".to_owned(),
            role: Role::User,
        }
    }

    fn new_product(name: &str, price: i64) -> NewProduct {
        NewProduct {
            name: name.to_owned(),
            description: "test".to_owned(),
            price: Money::from_units(price).unwrap(),
            category: "Noodles".to_owned(),
            stock: 10,
            image: None,
        }
    }

    fn order_for(user_id: UserId, product_id: ProductId) -> NewOrder {
        let mut cart = Cart::new(user_id);
        cart.add(product_id, 1).unwrap();
        NewOrder::from_cart(
            &cart,
            PaymentMethod::Cod,
            DeliveryDetails {
                address: "1 Nguyen Hue".to_owned(),
                phone: "0901".to_owned(),
                note: String::new(),
            },
            |_| Some(Money::from_units(30_000).unwrap()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("a@example.com")).await.unwrap();
        assert_eq!(user.phone, DEFAULT_PHONE);
        assert_eq!(user.image, DEFAULT_AVATAR);

        let err = store.create_user(new_user("A@Example.com")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
        assert_eq!(store.list_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_place_order_empties_cart() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("b@example.com")).await.unwrap();
        let product = store.create_product(new_product("Pho", 30_000)).await.unwrap();

        let mut cart = Cart::new(user.id);
        cart.add(product.id, 1).unwrap();
        store.save_cart(&cart).await.unwrap();

        let order = store.place_order(order_for(user.id, product.id)).await.unwrap();
        assert_eq!(order.status, OrderStatus::Pending);

        let cart = store.load_cart(user.id).await.unwrap().unwrap();
        assert!(cart.is_empty());
        assert_eq!(store.orders_for_user(user.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_place_order_keeps_lines_added_after_pricing() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("c@example.com")).await.unwrap();
        let pho = store.create_product(new_product("Pho", 30_000)).await.unwrap();
        let bun = store.create_product(new_product("Bun", 20_000)).await.unwrap();

        let mut cart = Cart::new(user.id);
        cart.add(pho.id, 1).unwrap();
        store.save_cart(&cart).await.unwrap();

        // Checkout prices the cart, then another request adds a line.
        let pending = order_for(user.id, pho.id);
        cart.add(bun.id, 2).unwrap();
        cart.add(pho.id, 1).unwrap();
        store.save_cart(&cart).await.unwrap();

        let order = store.place_order(pending).await.unwrap();
        assert_eq!(order.lines.len(), 1);
        assert_eq!(order.lines[0].product_id, pho.id);

        let cart = store.load_cart(user.id).await.unwrap().unwrap();
        assert_eq!(cart.line(bun.id).unwrap().quantity, 2);
        assert_eq!(cart.line(pho.id).unwrap().quantity, 1);
        assert_eq!(cart.total_amount(), Money::from_units(70_000).unwrap());
    }

    #[tokio::test]
    async fn test_interleaved_cart_writes_keep_last_save() {
        let store = MemoryStore::new();
        let user_id = UserId::new(1);
        let a = ProductId::new(1);
        let b = ProductId::new(2);

        // Two requests read the same (empty) cart...
        let mut first = store.load_cart(user_id).await.unwrap().unwrap_or_else(|| Cart::new(user_id));
        let mut second = store.load_cart(user_id).await.unwrap().unwrap_or_else(|| Cart::new(user_id));

        // ...mutate their own copies and save in turn.
        first.add(a, 1).unwrap();
        second.add(b, 1).unwrap();
        store.save_cart(&first).await.unwrap();
        store.save_cart(&second).await.unwrap();

        let stored = store.load_cart(user_id).await.unwrap().unwrap();
        assert!(stored.line(a).is_none(), "first write is lost");
        assert!(stored.line(b).is_some());
    }

    #[tokio::test]
    async fn test_status_update_is_compare_and_set() {
        let store = MemoryStore::new();
        let order = store
            .place_order(order_for(UserId::new(1), ProductId::new(1)))
            .await
            .unwrap();

        let updated = store
            .update_order_status(order.id, OrderStatus::Pending, OrderStatus::Accepted)
            .await
            .unwrap();
        assert_eq!(updated.status, OrderStatus::Accepted);

        let err = store
            .update_order_status(order.id, OrderStatus::Pending, OrderStatus::Cancelled)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));

        let err = store
            .update_order_status(OrderId::new(99), OrderStatus::Pending, OrderStatus::Accepted)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_deleting_user_keeps_orders_and_drops_cart() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("c@example.com")).await.unwrap();
        store.save_cart(&Cart::new(user.id)).await.unwrap();
        store
            .place_order(order_for(user.id, ProductId::new(1)))
            .await
            .unwrap();

        store.delete_user(user.id).await.unwrap();

        assert!(store.load_cart(user.id).await.unwrap().is_none());
        assert_eq!(store.orders_for_user(user.id).await.unwrap().len(), 1);
        assert!(matches!(
            store.delete_user(user.id).await,
            Err(RepositoryError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_stats_split_revenue_and_gross() {
        let store = MemoryStore::new();
        let first = store
            .place_order(order_for(UserId::new(1), ProductId::new(1)))
            .await
            .unwrap();
        store
            .place_order(order_for(UserId::new(1), ProductId::new(1)))
            .await
            .unwrap();
        store
            .update_order_status(first.id, OrderStatus::Pending, OrderStatus::Successful)
            .await
            .unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_orders, 2);
        assert_eq!(stats.total_revenue, Money::from_units(30_000).unwrap());
        assert_eq!(stats.gross_order_value, Money::from_units(60_000).unwrap());
        let pending = stats
            .orders_by_status
            .iter()
            .find(|c| c.status == OrderStatus::Pending)
            .unwrap();
        assert_eq!(pending.count, 1);
        assert_eq!(stats.orders_by_status.len(), OrderStatus::ALL.len());
    }

    #[tokio::test]
    async fn test_products_filter_by_category() {
        let store = MemoryStore::new();
        store.create_product(new_product("Pho", 30_000)).await.unwrap();
        let mut drink = new_product("Tra da", 5_000);
        drink.category = "Drinks".to_owned();
        store.create_product(drink).await.unwrap();

        let filter = ProductFilter {
            category: Some("drinks".to_owned()),
        };
        let drinks = store.products(&filter).await.unwrap();
        assert_eq!(drinks.len(), 1);
        assert_eq!(drinks[0].name, "Tra da");
        assert_eq!(store.products(&ProductFilter::default()).await.unwrap().len(), 2);
    }
}
