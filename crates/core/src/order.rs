//! Order aggregate and checkout.
//!
//! An order is a snapshot of a cart at checkout time: lines carry the unit
//! price that was current when the order was placed, and the total is fixed
//! from those prices. After creation only the status changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cart::Cart;
use crate::types::{Money, MoneyError, OrderId, OrderStatus, PaymentMethod, ProductId, UserId};

/// Errors raised by checkout and status changes.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderError {
    #[error("Cart is empty")]
    EmptyCart,
    #[error("product {0} is no longer available")]
    ProductUnavailable(ProductId),
    #[error("delivery address is required")]
    MissingAddress,
    #[error("phone number is required")]
    MissingPhone,
    #[error("order already cancelled")]
    AlreadyCancelled,
    #[error("cannot cancel a completed order")]
    AlreadyCompleted,
    #[error("cannot change order status from {from} to {to}")]
    IllegalTransition { from: OrderStatus, to: OrderStatus },
    #[error(transparent)]
    Money(#[from] MoneyError),
}

impl OrderError {
    /// Whether the error is a status conflict rather than bad input.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::AlreadyCancelled | Self::AlreadyCompleted | Self::IllegalTransition { .. }
        )
    }
}

/// How strictly status changes are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionPolicy {
    /// Only edges of the fulfillment workflow.
    #[default]
    Workflow,
    /// Any status may be set. Operator escape hatch.
    Unrestricted,
}

/// Check a status change without applying it.
///
/// # Errors
///
/// `IllegalTransition` when `policy` is `Workflow` and `to` is not a next
/// status of `from`.
pub fn check_transition(
    from: OrderStatus,
    to: OrderStatus,
    policy: TransitionPolicy,
) -> Result<(), OrderError> {
    match policy {
        TransitionPolicy::Unrestricted => Ok(()),
        TransitionPolicy::Workflow if from.can_transition_to(to) => Ok(()),
        TransitionPolicy::Workflow => Err(OrderError::IllegalTransition { from, to }),
    }
}

/// One purchased product with its price at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: ProductId,
    pub quantity: u32,
    pub price: Money,
}

impl OrderLine {
    /// `price × quantity`.
    ///
    /// # Errors
    ///
    /// `MoneyError::Overflow` if the product does not fit.
    pub fn subtotal(&self) -> Result<Money, MoneyError> {
        self.price.times(self.quantity)
    }
}

/// Where and how to deliver an order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeliveryDetails {
    pub address: String,
    pub phone: String,
    pub note: String,
}

impl DeliveryDetails {
    /// Combine checkout input with the customer's profile.
    ///
    /// Blank input falls back to the profile value; the note defaults to
    /// empty.
    ///
    /// # Errors
    ///
    /// `MissingAddress` or `MissingPhone` when neither source has a value.
    pub fn resolve(
        address: Option<&str>,
        phone: Option<&str>,
        note: Option<&str>,
        profile_address: &str,
        profile_phone: &str,
    ) -> Result<Self, OrderError> {
        let pick = |input: Option<&str>, fallback: &str| {
            input
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| fallback.trim())
                .to_owned()
        };

        let address = pick(address, profile_address);
        if address.is_empty() {
            return Err(OrderError::MissingAddress);
        }
        let phone = pick(phone, profile_phone);
        if phone.is_empty() {
            return Err(OrderError::MissingPhone);
        }

        Ok(Self {
            address,
            phone,
            note: note.map(str::trim).unwrap_or_default().to_owned(),
        })
    }
}

/// An order ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub user_id: UserId,
    pub lines: Vec<OrderLine>,
    pub total_amount: Money,
    pub payment_method: PaymentMethod,
    pub delivery: DeliveryDetails,
}

impl NewOrder {
    /// Snapshot `cart` into an order, pricing each line with `price_of`.
    ///
    /// The caller persists the order and empties the cart atomically.
    ///
    /// # Errors
    ///
    /// `EmptyCart` for a cart with no lines, `ProductUnavailable` if
    /// `price_of` has no price for a line's product.
    pub fn from_cart<F>(
        cart: &Cart,
        payment_method: PaymentMethod,
        delivery: DeliveryDetails,
        mut price_of: F,
    ) -> Result<Self, OrderError>
    where
        F: FnMut(ProductId) -> Option<Money>,
    {
        if cart.is_empty() {
            return Err(OrderError::EmptyCart);
        }

        let lines = cart
            .lines()
            .iter()
            .map(|line| {
                let price =
                    price_of(line.product_id).ok_or(OrderError::ProductUnavailable(line.product_id))?;
                Ok(OrderLine {
                    product_id: line.product_id,
                    quantity: line.quantity,
                    price,
                })
            })
            .collect::<Result<Vec<_>, OrderError>>()?;

        let total_amount = lines
            .iter()
            .try_fold(Money::ZERO, |total, line| total.checked_add(line.subtotal()?))?;

        Ok(Self {
            user_id: cart.user_id(),
            lines,
            total_amount,
            payment_method,
            delivery,
        })
    }
}

/// A persisted order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub lines: Vec<OrderLine>,
    pub total_amount: Money,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub delivery: DeliveryDetails,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Materialize a freshly inserted order.
    #[must_use]
    pub fn from_new(id: OrderId, new: NewOrder, now: DateTime<Utc>) -> Self {
        Self {
            id,
            user_id: new.user_id,
            lines: new.lines,
            total_amount: new.total_amount,
            status: OrderStatus::Pending,
            payment_method: new.payment_method,
            delivery: new.delivery,
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub fn belongs_to(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }

    /// Move to `next`, returning the previous status.
    ///
    /// # Errors
    ///
    /// `IllegalTransition` if `policy` forbids the change; the order is left
    /// untouched.
    pub fn transition(
        &mut self,
        next: OrderStatus,
        policy: TransitionPolicy,
        now: DateTime<Utc>,
    ) -> Result<OrderStatus, OrderError> {
        check_transition(self.status, next, policy)?;
        let previous = self.status;
        self.status = next;
        self.updated_at = now;
        Ok(previous)
    }

    /// Cancel on behalf of the customer.
    ///
    /// # Errors
    ///
    /// `AlreadyCancelled`, `AlreadyCompleted` for a `Successful` order, and
    /// `IllegalTransition` once the order is out for delivery.
    pub fn cancel_by_owner(&mut self, now: DateTime<Utc>) -> Result<OrderStatus, OrderError> {
        match self.status {
            OrderStatus::Cancelled => Err(OrderError::AlreadyCancelled),
            OrderStatus::Successful => Err(OrderError::AlreadyCompleted),
            _ => self.transition(OrderStatus::Cancelled, TransitionPolicy::Workflow, now),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const USER: UserId = UserId::new(3);
    const A: ProductId = ProductId::new(1);
    const B: ProductId = ProductId::new(2);

    fn units(n: i64) -> Money {
        Money::from_units(n).unwrap()
    }

    fn prices(id: ProductId) -> Option<Money> {
        match id.as_i32() {
            1 => Some(units(10_000)),
            2 => Some(units(20_000)),
            _ => None,
        }
    }

    fn delivery() -> DeliveryDetails {
        DeliveryDetails::resolve(Some("12 Le Loi"), Some("0901234567"), None, "", "").unwrap()
    }

    fn placed_order() -> Order {
        let mut cart = Cart::new(USER);
        cart.add(A, 1).unwrap();
        let new = NewOrder::from_cart(&cart, PaymentMethod::Cod, delivery(), prices).unwrap();
        Order::from_new(OrderId::new(1), new, Utc::now())
    }

    #[test]
    fn test_checkout_totals_snapshot_prices() {
        let mut cart = Cart::new(USER);
        cart.add(A, 1).unwrap();
        cart.add(B, 2).unwrap();

        let order = NewOrder::from_cart(&cart, PaymentMethod::Qr, delivery(), prices).unwrap();

        assert_eq!(order.total_amount, units(50_000));
        assert_eq!(order.lines.len(), 2);
        assert_eq!(order.lines[1].price, units(20_000));
        assert_eq!(order.user_id, USER);
    }

    #[test]
    fn test_checkout_empty_cart() {
        let cart = Cart::new(USER);
        let err = NewOrder::from_cart(&cart, PaymentMethod::Cod, delivery(), prices).unwrap_err();
        assert_eq!(err, OrderError::EmptyCart);
    }

    #[test]
    fn test_checkout_with_deleted_product() {
        let mut cart = Cart::new(USER);
        cart.add(ProductId::new(99), 1).unwrap();
        let err = NewOrder::from_cart(&cart, PaymentMethod::Cod, delivery(), prices).unwrap_err();
        assert_eq!(err, OrderError::ProductUnavailable(ProductId::new(99)));
    }

    #[test]
    fn test_delivery_falls_back_to_profile() {
        let details =
            DeliveryDetails::resolve(Some("  "), None, Some(" ring twice "), "1 Hai Ba Trung", "0909")
                .unwrap();
        assert_eq!(details.address, "1 Hai Ba Trung");
        assert_eq!(details.phone, "0909");
        assert_eq!(details.note, "ring twice");

        assert_eq!(
            DeliveryDetails::resolve(None, Some("0909"), None, "", ""),
            Err(OrderError::MissingAddress)
        );
        assert_eq!(
            DeliveryDetails::resolve(Some("x"), None, None, "", " "),
            Err(OrderError::MissingPhone)
        );
    }

    #[test]
    fn test_admin_walks_workflow_then_cancel_fails() {
        let mut order = placed_order();
        let now = Utc::now();

        for next in [
            OrderStatus::Accepted,
            OrderStatus::Delivery,
            OrderStatus::Successful,
        ] {
            order.transition(next, TransitionPolicy::Workflow, now).unwrap();
            assert_eq!(order.status, next);
        }

        assert_eq!(order.cancel_by_owner(now), Err(OrderError::AlreadyCompleted));
        assert_eq!(order.status, OrderStatus::Successful);
    }

    #[test]
    fn test_second_cancel_conflicts() {
        let mut order = placed_order();
        let now = Utc::now();

        assert_eq!(order.cancel_by_owner(now).unwrap(), OrderStatus::Pending);
        let err = order.cancel_by_owner(now).unwrap_err();
        assert_eq!(err, OrderError::AlreadyCancelled);
        assert!(err.is_conflict());
        assert_eq!(order.status, OrderStatus::Cancelled);
    }

    #[test]
    fn test_cancel_during_delivery_conflicts() {
        let mut order = placed_order();
        order.status = OrderStatus::Delivery;

        let err = order.cancel_by_owner(Utc::now()).unwrap_err();
        assert!(matches!(err, OrderError::IllegalTransition { .. }));
        assert_eq!(order.status, OrderStatus::Delivery);
    }

    #[test]
    fn test_workflow_rejects_skips_but_unrestricted_allows() {
        let mut order = placed_order();
        let now = Utc::now();

        let err = order
            .transition(OrderStatus::Successful, TransitionPolicy::Workflow, now)
            .unwrap_err();
        assert_eq!(
            err,
            OrderError::IllegalTransition {
                from: OrderStatus::Pending,
                to: OrderStatus::Successful
            }
        );

        order
            .transition(OrderStatus::Successful, TransitionPolicy::Unrestricted, now)
            .unwrap();
        assert_eq!(order.status, OrderStatus::Successful);
    }
}
