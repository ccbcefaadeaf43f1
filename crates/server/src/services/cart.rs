//! Per-user cart operations.
//!
//! Every mutation is load, modify, save. Two concurrent requests against
//! the same cart race and the later save wins.

use tracing::instrument;

use quickbite_core::{Action, Cart, CartError, Principal, ProductId, QuantityChange, UserId};

use super::{acting_user, product_map};
use crate::db::Store;
use crate::error::{AppError, Result};
use crate::models::CartView;

const DEFAULT_QUANTITY: i64 = 1;

pub struct CartService<'a> {
    store: &'a dyn Store,
}

impl<'a> CartService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// The caller's cart priced against the live catalog.
    ///
    /// Creates an empty cart on first access and persists the recomputed
    /// total.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the store fails.
    pub async fn get_cart(&self, principal: &Principal) -> Result<CartView> {
        let user_id = acting_user(principal, Action::ManageCart)?;

        let Some(cart) = self.store.load_cart(user_id).await? else {
            let cart = Cart::new(user_id);
            self.store.save_cart(&cart).await?;
            return self.render(&cart).await;
        };

        let view = self.render(&cart).await?;
        if view.total_amount != cart.total_amount() {
            self.store.set_cart_total(user_id, view.total_amount).await?;
        }
        Ok(view)
    }

    /// Add `quantity` (default 1) of a product.
    ///
    /// # Errors
    ///
    /// `Validation` for a missing product id or a quantity below 1,
    /// `NotFound` if the product does not exist.
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        principal: &Principal,
        product_id: Option<ProductId>,
        quantity: Option<i64>,
    ) -> Result<CartView> {
        let user_id = acting_user(principal, Action::ManageCart)?;
        let product_id = product_id.ok_or_else(missing_data)?;

        let quantity = quantity.unwrap_or(DEFAULT_QUANTITY);
        if quantity < 1 {
            return Err(CartError::ZeroQuantity.into());
        }
        let quantity = u32::try_from(quantity).map_err(|_| CartError::QuantityOverflow)?;

        if self.store.product(product_id).await?.is_none() {
            return Err(AppError::NotFound("Product not found".to_string()));
        }

        let mut cart = self
            .store
            .load_cart(user_id)
            .await?
            .unwrap_or_else(|| Cart::new(user_id));
        let line = cart.add(product_id, quantity)?;
        tracing::debug!(product_id = %product_id, quantity = line.quantity, "Cart line added");

        self.save(cart).await
    }

    /// Overwrite a line's quantity; zero removes the line.
    ///
    /// # Errors
    ///
    /// `NotFound` if there is no cart or no line for the product,
    /// `Validation` for a negative quantity.
    #[instrument(skip(self))]
    pub async fn set_quantity(
        &self,
        principal: &Principal,
        product_id: Option<ProductId>,
        quantity: Option<i64>,
    ) -> Result<CartView> {
        let user_id = acting_user(principal, Action::ManageCart)?;
        let (Some(product_id), Some(quantity)) = (product_id, quantity) else {
            return Err(missing_data());
        };

        let mut cart = self.existing_cart(user_id).await?;
        match cart.set_quantity(product_id, quantity)? {
            QuantityChange::Updated(line) => {
                tracing::debug!(product_id = %product_id, quantity = line.quantity, "Cart line updated");
            }
            QuantityChange::Removed(_) => {
                tracing::debug!(product_id = %product_id, "Cart line removed by zero quantity");
            }
        }

        self.save(cart).await
    }

    /// # Errors
    ///
    /// `NotFound` if there is no cart or no line for the product.
    #[instrument(skip(self))]
    pub async fn remove_item(
        &self,
        principal: &Principal,
        product_id: Option<ProductId>,
    ) -> Result<CartView> {
        let user_id = acting_user(principal, Action::ManageCart)?;
        let product_id = product_id.ok_or_else(missing_data)?;

        let mut cart = self.existing_cart(user_id).await?;
        cart.remove(product_id)?;

        self.save(cart).await
    }

    /// Empty the cart, keeping the cart itself.
    ///
    /// # Errors
    ///
    /// `NotFound` if the caller has no cart yet.
    #[instrument(skip(self))]
    pub async fn clear(&self, principal: &Principal) -> Result<CartView> {
        let user_id = acting_user(principal, Action::ManageCart)?;

        let mut cart = self.existing_cart(user_id).await?;
        cart.clear();

        self.save(cart).await
    }

    async fn existing_cart(&self, user_id: UserId) -> Result<Cart> {
        self.store
            .load_cart(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Cart not found".to_string()))
    }

    /// Price, cache the total and persist.
    async fn save(&self, mut cart: Cart) -> Result<CartView> {
        let view = self.render(&cart).await?;
        cart.set_total_amount(view.total_amount);
        self.store.save_cart(&cart).await?;
        Ok(view)
    }

    async fn render(&self, cart: &Cart) -> Result<CartView> {
        let ids: Vec<ProductId> = cart.lines().iter().map(|l| l.product_id).collect();
        let products = product_map(self.store, &ids).await?;
        Ok(CartView::build(cart, &products)?)
    }
}

fn missing_data() -> AppError {
    AppError::Validation("Missing data".to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use quickbite_core::{Money, Role};

    use crate::db::{CartStore, MemoryStore, ProductStore};
    use crate::models::NewProduct;

    async fn seed_product(store: &MemoryStore, name: &str, price: i64) -> ProductId {
        store
            .create_product(NewProduct {
                name: name.to_string(),
                description: String::new(),
                price: Money::from_units(price).unwrap(),
                category: "Rice".to_string(),
                stock: 10,
                image: None,
            })
            .await
            .unwrap()
            .id
    }

    fn customer() -> Principal {
        Principal::user(UserId::new(1), Role::User)
    }

    #[tokio::test]
    async fn test_get_cart_creates_empty_cart() {
        let store = MemoryStore::new();
        let carts = CartService::new(&store);

        let view = carts.get_cart(&customer()).await.unwrap();
        assert!(view.items.is_empty());
        assert_eq!(view.total_amount, Money::ZERO);
        assert!(store.load_cart(UserId::new(1)).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_add_twice_merges_lines() {
        let store = MemoryStore::new();
        let com_tam = seed_product(&store, "Com tam", 35_000).await;
        let carts = CartService::new(&store);

        carts.add_item(&customer(), Some(com_tam), Some(2)).await.unwrap();
        let view = carts.add_item(&customer(), Some(com_tam), None).await.unwrap();

        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].quantity, 3);
        assert_eq!(view.total_amount, Money::from_units(105_000).unwrap());
    }

    #[tokio::test]
    async fn test_add_rejects_bad_input() {
        let store = MemoryStore::new();
        let com_tam = seed_product(&store, "Com tam", 35_000).await;
        let carts = CartService::new(&store);

        assert!(matches!(
            carts.add_item(&customer(), None, Some(1)).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            carts.add_item(&customer(), Some(com_tam), Some(0)).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            carts.add_item(&customer(), Some(ProductId::new(99)), Some(1)).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_quantities_past_line_cap_are_rejected() {
        let store = MemoryStore::new();
        let com_tam = seed_product(&store, "Com tam", 35_000).await;
        let carts = CartService::new(&store);
        let cap = i64::from(quickbite_core::MAX_LINE_QUANTITY);

        let err = carts
            .add_item(&customer(), Some(com_tam), Some(i64::from(u32::MAX)))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "quantity is too large");
        assert!(store.load_cart(UserId::new(1)).await.unwrap().is_none());

        carts.add_item(&customer(), Some(com_tam), Some(cap)).await.unwrap();
        assert!(matches!(
            carts.add_item(&customer(), Some(com_tam), Some(1)).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            carts.set_quantity(&customer(), Some(com_tam), Some(cap + 1)).await,
            Err(AppError::Validation(_))
        ));

        let view = carts.get_cart(&customer()).await.unwrap();
        assert_eq!(view.items[0].quantity, quickbite_core::MAX_LINE_QUANTITY);
    }

    #[tokio::test]
    async fn test_set_quantity_zero_removes_line() {
        let store = MemoryStore::new();
        let a = seed_product(&store, "Banh xeo", 40_000).await;
        let b = seed_product(&store, "Goi cuon", 25_000).await;
        let carts = CartService::new(&store);

        carts.add_item(&customer(), Some(a), None).await.unwrap();
        carts.add_item(&customer(), Some(b), None).await.unwrap();
        let view = carts
            .set_quantity(&customer(), Some(a), Some(0))
            .await
            .unwrap();
        assert_eq!(view.items.len(), 1);

        assert!(matches!(
            carts.set_quantity(&customer(), Some(a), Some(0)).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            carts.set_quantity(&customer(), Some(b), Some(-1)).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_mutations_without_cart_are_not_found() {
        let store = MemoryStore::new();
        let carts = CartService::new(&store);

        assert!(matches!(
            carts.set_quantity(&customer(), Some(ProductId::new(1)), Some(2)).await,
            Err(AppError::NotFound(ref m)) if m == "Cart not found"
        ));
        assert!(matches!(
            carts.clear(&customer()).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_deleted_product_renders_unknown() {
        let store = MemoryStore::new();
        let a = seed_product(&store, "Banh xeo", 40_000).await;
        let b = seed_product(&store, "Goi cuon", 25_000).await;
        let carts = CartService::new(&store);

        carts.add_item(&customer(), Some(a), None).await.unwrap();
        carts.add_item(&customer(), Some(b), Some(2)).await.unwrap();
        store.delete_product(a).await.unwrap();

        let view = carts.get_cart(&customer()).await.unwrap();
        let gone = view.items.iter().find(|i| i.product_id == a).unwrap();
        assert_eq!(gone.name, "Unknown product");
        assert!(!gone.available);
        assert_eq!(view.total_amount, Money::from_units(50_000).unwrap());

        let cached = store.load_cart(UserId::new(1)).await.unwrap().unwrap();
        assert_eq!(cached.total_amount(), view.total_amount);
    }

    #[tokio::test]
    async fn test_operator_has_no_cart() {
        let store = MemoryStore::new();
        let carts = CartService::new(&store);

        assert!(matches!(
            carts.get_cart(&Principal::operator()).await,
            Err(AppError::Forbidden(_))
        ));
    }
}
