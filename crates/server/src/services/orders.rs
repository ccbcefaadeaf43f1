//! Checkout, order history and the status workflow.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::Utc;
use tracing::instrument;

use quickbite_core::{
    Action, DeliveryDetails, NewOrder, Order, OrderError, OrderId, OrderStatus, PaymentMethod,
    Principal, ProductId, TransitionPolicy, UserId, authorize, check_transition,
};

use super::{acting_user, product_map};
use crate::db::{RepositoryError, Store};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::models::{OrderView, User};

/// Checkout input. Blank delivery fields fall back to the profile.
#[derive(Debug, Clone, Default)]
pub struct CheckoutForm {
    pub payment_method: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub note: Option<String>,
}

pub struct OrderService<'a> {
    store: &'a dyn Store,
    policy: TransitionPolicy,
}

impl<'a> OrderService<'a> {
    /// `policy` governs admin status updates; customer cancellation always
    /// follows the workflow.
    #[must_use]
    pub const fn new(store: &'a dyn Store, policy: TransitionPolicy) -> Self {
        Self { store, policy }
    }

    // =========================================================================
    // Customer
    // =========================================================================

    /// Turn the caller's cart into a `Pending` order at current prices.
    ///
    /// The order insert and the deduction of the ordered lines from the cart
    /// happen in one store transaction.
    ///
    /// # Errors
    ///
    /// `Validation` for an empty cart, an unknown payment method, a line
    /// whose product was deleted, or no address/phone from input or profile.
    #[instrument(skip(self, form), fields(payment_method = ?form.payment_method))]
    pub async fn checkout(&self, principal: &Principal, form: CheckoutForm) -> Result<OrderView> {
        let user_id = acting_user(principal, Action::PlaceOrder)?;

        let cart = self
            .store
            .load_cart(user_id)
            .await?
            .filter(|cart| !cart.is_empty())
            .ok_or(OrderError::EmptyCart)?;

        let payment_method = form
            .payment_method
            .as_deref()
            .and_then(|pm| PaymentMethod::from_str(pm).ok())
            .ok_or_else(|| AppError::Validation("Invalid payment method".to_string()))?;

        let profile = self.profile(user_id).await?;
        let delivery = DeliveryDetails::resolve(
            form.address.as_deref(),
            form.phone.as_deref(),
            form.note.as_deref(),
            &profile.address,
            &profile.phone,
        )?;

        let ids: Vec<ProductId> = cart.lines().iter().map(|l| l.product_id).collect();
        let products = product_map(self.store, &ids).await?;
        let new_order = NewOrder::from_cart(&cart, payment_method, delivery, |id| {
            products.get(&id).map(|p| p.price)
        })?;

        let order = self.store.place_order(new_order).await?;

        let order_id = order.id.to_string();
        add_breadcrumb("checkout", "Order placed", Some(&[("order_id", order_id.as_str())]));
        tracing::info!(
            order_id = %order.id,
            user_id = %user_id,
            total = %order.total_amount,
            "Order placed"
        );

        Ok(OrderView::build(order, &products, None)?)
    }

    /// The caller's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the store fails.
    pub async fn list_for_user(&self, principal: &Principal) -> Result<Vec<OrderView>> {
        let user_id = acting_user(principal, Action::ViewOwnOrders)?;
        let orders = self.store.orders_for_user(user_id).await?;
        self.views(orders, false).await
    }

    /// One of the caller's orders.
    ///
    /// # Errors
    ///
    /// `NotFound` unless the order exists and belongs to the caller.
    pub async fn detail(&self, principal: &Principal, order_id: OrderId) -> Result<OrderView> {
        let user_id = acting_user(principal, Action::ViewOwnOrders)?;
        let order = self.owned_order(user_id, order_id).await?;
        self.view(order, None).await
    }

    /// Cancel one of the caller's orders.
    ///
    /// # Errors
    ///
    /// `NotFound` unless owned; `Conflict` if already cancelled, completed,
    /// out for delivery, or moved by someone else meanwhile.
    #[instrument(skip(self))]
    pub async fn cancel(&self, principal: &Principal, order_id: OrderId) -> Result<OrderView> {
        let user_id = acting_user(principal, Action::CancelOwnOrder)?;
        let mut order = self.owned_order(user_id, order_id).await?;

        let previous = order.cancel_by_owner(Utc::now())?;
        let order = self.swap_status(order_id, previous, order.status).await?;

        tracing::info!(order_id = %order_id, from = %previous, "Order cancelled by customer");
        self.view(order, None).await
    }

    // =========================================================================
    // Admin
    // =========================================================================

    /// Every order with its customer, newest first.
    ///
    /// # Errors
    ///
    /// `Forbidden` for non-admins.
    pub async fn list_all(&self, principal: &Principal) -> Result<Vec<OrderView>> {
        authorize(principal.role, Action::ViewAllOrders)?;
        let orders = self.store.all_orders().await?;
        self.views(orders, true).await
    }

    /// # Errors
    ///
    /// `Forbidden` for non-admins; `NotFound` if the order does not exist.
    pub async fn get(&self, principal: &Principal, order_id: OrderId) -> Result<OrderView> {
        authorize(principal.role, Action::ViewAllOrders)?;
        let order = self.find(order_id).await?;
        let customer = self.store.user_by_id(order.user_id).await?;
        self.view(order, customer.as_ref()).await
    }

    /// Move an order to `status`.
    ///
    /// # Errors
    ///
    /// `Validation` for a missing id or unknown status, `NotFound` for a
    /// missing order, `Conflict` if the workflow forbids the change.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        principal: &Principal,
        order_id: Option<OrderId>,
        status: Option<&str>,
    ) -> Result<OrderView> {
        authorize(principal.role, Action::UpdateOrderStatus)?;
        let order_id =
            order_id.ok_or_else(|| AppError::Validation("Missing data".to_string()))?;
        let next = status
            .and_then(|s| OrderStatus::from_str(s).ok())
            .ok_or_else(|| AppError::Validation("Invalid status".to_string()))?;

        let order = self.find(order_id).await?;
        let previous = order.status;
        check_transition(previous, next, self.policy)?;

        let order = self.swap_status(order_id, previous, next).await?;
        tracing::info!(order_id = %order_id, from = %previous, to = %next, "Order status updated");

        let customer = self.store.user_by_id(order.user_id).await?;
        self.view(order, customer.as_ref()).await
    }

    /// # Errors
    ///
    /// `Forbidden` for non-admins; `NotFound` if the order does not exist.
    #[instrument(skip(self))]
    pub async fn delete(&self, principal: &Principal, order_id: Option<OrderId>) -> Result<()> {
        authorize(principal.role, Action::DeleteOrder)?;
        let order_id =
            order_id.ok_or_else(|| AppError::Validation("Missing data".to_string()))?;

        self.store
            .delete_order(order_id)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => order_not_found(),
                other => other.into(),
            })?;

        tracing::info!(order_id = %order_id, "Order deleted");
        Ok(())
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn profile(&self, user_id: UserId) -> Result<User> {
        self.store
            .user_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    async fn find(&self, order_id: OrderId) -> Result<Order> {
        self.store
            .order(order_id)
            .await?
            .ok_or_else(order_not_found)
    }

    async fn owned_order(&self, user_id: UserId, order_id: OrderId) -> Result<Order> {
        let order = self.find(order_id).await?;
        if !order.belongs_to(user_id) {
            return Err(order_not_found());
        }
        Ok(order)
    }

    /// Compare-and-set the status in the store.
    async fn swap_status(
        &self,
        order_id: OrderId,
        expected: OrderStatus,
        next: OrderStatus,
    ) -> Result<Order> {
        self.store
            .update_order_status(order_id, expected, next)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => order_not_found(),
                RepositoryError::Conflict(_) => {
                    AppError::Conflict("Order was updated by someone else, try again".to_string())
                }
                other => other.into(),
            })
    }

    async fn view(&self, order: Order, customer: Option<&User>) -> Result<OrderView> {
        let ids: Vec<ProductId> = order.lines.iter().map(|l| l.product_id).collect();
        let products = product_map(self.store, &ids).await?;
        Ok(OrderView::build(order, &products, customer)?)
    }

    /// Join a batch of orders with one catalog lookup (and one user lookup
    /// when `with_customers`).
    async fn views(&self, orders: Vec<Order>, with_customers: bool) -> Result<Vec<OrderView>> {
        let mut ids: Vec<ProductId> = orders
            .iter()
            .flat_map(|o| o.lines.iter().map(|l| l.product_id))
            .collect();
        ids.sort_unstable();
        ids.dedup();
        let products = product_map(self.store, &ids).await?;

        let customers: HashMap<UserId, User> = if with_customers {
            let mut user_ids: Vec<UserId> = orders.iter().map(|o| o.user_id).collect();
            user_ids.sort_unstable();
            user_ids.dedup();
            self.store
                .users_by_ids(&user_ids)
                .await?
                .into_iter()
                .map(|u| (u.id, u))
                .collect()
        } else {
            HashMap::new()
        };

        orders
            .into_iter()
            .map(|order| {
                let customer = customers.get(&order.user_id);
                Ok(OrderView::build(order, &products, customer)?)
            })
            .collect()
    }
}

fn order_not_found() -> AppError {
    AppError::NotFound("Order not found".to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use quickbite_core::{Email, Money, Role};

    use crate::db::{CartStore, MemoryStore, OrderStore, ProductStore, UserStore};
    use crate::models::{NewProduct, NewUser, ProfileUpdate};
    use crate::services::CartService;

    struct Fixture {
        store: MemoryStore,
        customer: Principal,
        pho: ProductId,
        banh_mi: ProductId,
    }

    async fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let user = store
            .create_user(NewUser {
                name: "Lan".to_string(),
                email: Email::parse("lan@example.vn").unwrap(),
                password_hash: "x".to_string(),
                role: Role::User,
            })
            .await
            .unwrap();
        store
            .update_profile(
                user.id,
                ProfileUpdate {
                    name: "Lan".to_string(),
                    phone: "0901234567".to_string(),
                    address: "12 Ly Thuong Kiet, Ha Noi".to_string(),
                    image: None,
                },
            )
            .await
            .unwrap();

        let mut ids = Vec::new();
        for (name, price) in [("Pho bo", 10_000), ("Banh mi", 20_000)] {
            let product = store
                .create_product(NewProduct {
                    name: name.to_string(),
                    description: String::new(),
                    price: Money::from_units(price).unwrap(),
                    category: "Street food".to_string(),
                    stock: 50,
                    image: None,
                })
                .await
                .unwrap();
            ids.push(product.id);
        }

        Fixture {
            store,
            customer: Principal::user(user.id, Role::User),
            pho: ids[0],
            banh_mi: ids[1],
        }
    }

    fn cod() -> CheckoutForm {
        CheckoutForm {
            payment_method: Some("COD".to_string()),
            ..CheckoutForm::default()
        }
    }

    async fn fill_cart(f: &Fixture) {
        let carts = CartService::new(&f.store);
        carts.add_item(&f.customer, Some(f.pho), Some(1)).await.unwrap();
        carts.add_item(&f.customer, Some(f.banh_mi), Some(2)).await.unwrap();
    }

    #[tokio::test]
    async fn test_checkout_locks_prices_and_empties_cart() {
        let f = fixture().await;
        fill_cart(&f).await;
        let orders = OrderService::new(&f.store, TransitionPolicy::Workflow);

        let order = orders.checkout(&f.customer, cod()).await.unwrap();
        assert_eq!(order.total_amount, Money::from_units(50_000).unwrap());
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.address, "12 Ly Thuong Kiet, Ha Noi");

        let user_id = f.customer.user_id().unwrap();
        let cart = f.store.load_cart(user_id).await.unwrap().unwrap();
        assert!(cart.is_empty());
        assert_eq!(f.store.orders_for_user(user_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_checkout_rejects_empty_cart_and_bad_payment() {
        let f = fixture().await;
        let orders = OrderService::new(&f.store, TransitionPolicy::Workflow);

        assert!(matches!(
            orders.checkout(&f.customer, cod()).await,
            Err(AppError::Validation(ref m)) if m == "Cart is empty"
        ));

        fill_cart(&f).await;
        let card = CheckoutForm {
            payment_method: Some("CARD".to_string()),
            ..CheckoutForm::default()
        };
        assert!(matches!(
            orders.checkout(&f.customer, card).await,
            Err(AppError::Validation(_))
        ));
        assert!(f.store.all_orders().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_checkout_with_deleted_product_fails() {
        let f = fixture().await;
        fill_cart(&f).await;
        f.store.delete_product(f.pho).await.unwrap();
        let orders = OrderService::new(&f.store, TransitionPolicy::Workflow);

        assert!(matches!(
            orders.checkout(&f.customer, cod()).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_admin_workflow_then_customer_cannot_cancel() {
        let f = fixture().await;
        fill_cart(&f).await;
        let orders = OrderService::new(&f.store, TransitionPolicy::Workflow);
        let admin = Principal::operator();

        let placed = orders.checkout(&f.customer, cod()).await.unwrap();
        for status in ["Accepted", "Delivery", "Successful"] {
            let updated = orders
                .update_status(&admin, Some(placed.id), Some(status))
                .await
                .unwrap();
            assert_eq!(updated.status.as_str(), status);
            assert_eq!(updated.customer.as_ref().unwrap().name, "Lan");
        }

        assert!(matches!(
            orders.cancel(&f.customer, placed.id).await,
            Err(AppError::Conflict(ref m)) if m == "cannot cancel a completed order"
        ));
    }

    #[tokio::test]
    async fn test_cancel_twice_conflicts() {
        let f = fixture().await;
        fill_cart(&f).await;
        let orders = OrderService::new(&f.store, TransitionPolicy::Workflow);

        let placed = orders.checkout(&f.customer, cod()).await.unwrap();
        let cancelled = orders.cancel(&f.customer, placed.id).await.unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);

        assert!(matches!(
            orders.cancel(&f.customer, placed.id).await,
            Err(AppError::Conflict(ref m)) if m == "order already cancelled"
        ));
        let stored = f.store.order(placed.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_other_customers_orders_are_not_found() {
        let f = fixture().await;
        fill_cart(&f).await;
        let orders = OrderService::new(&f.store, TransitionPolicy::Workflow);
        let placed = orders.checkout(&f.customer, cod()).await.unwrap();

        let stranger = Principal::user(UserId::new(999), Role::User);
        assert!(matches!(
            orders.detail(&stranger, placed.id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            orders.cancel(&stranger, placed.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_admin_status_rules() {
        let f = fixture().await;
        fill_cart(&f).await;
        let admin = Principal::operator();
        let strict = OrderService::new(&f.store, TransitionPolicy::Workflow);
        let placed = strict.checkout(&f.customer, cod()).await.unwrap();

        assert!(matches!(
            strict.update_status(&admin, Some(placed.id), Some("Shipped")).await,
            Err(AppError::Validation(ref m)) if m == "Invalid status"
        ));
        assert!(matches!(
            strict.update_status(&admin, Some(placed.id), Some("Successful")).await,
            Err(AppError::Conflict(_))
        ));
        assert!(matches!(
            strict.update_status(&admin, Some(OrderId::new(404)), Some("Accepted")).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            strict.update_status(&f.customer, Some(placed.id), Some("Accepted")).await,
            Err(AppError::Forbidden(_))
        ));

        let lenient = OrderService::new(&f.store, TransitionPolicy::Unrestricted);
        let updated = lenient
            .update_status(&admin, Some(placed.id), Some("Successful"))
            .await
            .unwrap();
        assert_eq!(updated.status, OrderStatus::Successful);
    }
}
