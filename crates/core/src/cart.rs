//! Cart aggregate.
//!
//! One cart per user. Each product appears on at most one line and every
//! line has a quantity of at least one; a line whose quantity is set to
//! zero is removed rather than kept.

use serde::{Deserialize, Serialize};

use crate::types::{Money, ProductId, UserId};

/// Largest quantity a single line may hold.
pub const MAX_LINE_QUANTITY: u32 = 1_000;

/// Errors raised by cart mutations.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CartError {
    #[error("quantity must be at least 1")]
    ZeroQuantity,
    #[error("quantity cannot be negative")]
    NegativeQuantity,
    #[error("quantity is too large")]
    QuantityOverflow,
    #[error("product {0} is not in the cart")]
    LineNotFound(ProductId),
}

/// One product and how many of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Outcome of [`Cart::set_quantity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityChange {
    Updated(CartLine),
    /// Quantity was set to zero and the line evicted.
    Removed(CartLine),
}

/// A user's cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cart {
    user_id: UserId,
    lines: Vec<CartLine>,
    total_amount: Money,
}

impl Cart {
    /// An empty cart for `user_id`.
    #[must_use]
    pub const fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            lines: Vec::new(),
            total_amount: Money::ZERO,
        }
    }

    /// Rebuild a cart from stored rows.
    ///
    /// Zero-quantity rows are dropped and duplicate products merged, so a
    /// loaded cart always satisfies the line invariants.
    #[must_use]
    pub fn from_parts(
        user_id: UserId,
        lines: impl IntoIterator<Item = CartLine>,
        total_amount: Money,
    ) -> Self {
        let mut cart = Self::new(user_id);
        for line in lines {
            if line.quantity == 0 {
                continue;
            }
            match cart.line_mut(line.product_id) {
                Some(existing) => {
                    existing.quantity = existing.quantity.saturating_add(line.quantity);
                }
                None => cart.lines.push(line),
            }
        }
        cart.total_amount = total_amount;
        cart
    }

    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn line(&self, product_id: ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.product_id == product_id)
    }

    fn line_mut(&mut self, product_id: ProductId) -> Option<&mut CartLine> {
        self.lines.iter_mut().find(|l| l.product_id == product_id)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of distinct products.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Sum of quantities over all lines.
    #[must_use]
    pub fn total_quantity(&self) -> u64 {
        self.lines.iter().map(|l| u64::from(l.quantity)).sum()
    }

    /// Cached total from the last priced read. Not authoritative: checkout
    /// reprices every line.
    #[must_use]
    pub const fn total_amount(&self) -> Money {
        self.total_amount
    }

    pub const fn set_total_amount(&mut self, total: Money) {
        self.total_amount = total;
    }

    /// Add `quantity` of a product, merging into an existing line.
    ///
    /// # Errors
    ///
    /// `ZeroQuantity` for a zero quantity, `QuantityOverflow` if the merged
    /// quantity exceeds [`MAX_LINE_QUANTITY`].
    pub fn add(&mut self, product_id: ProductId, quantity: u32) -> Result<CartLine, CartError> {
        if quantity == 0 {
            return Err(CartError::ZeroQuantity);
        }
        if quantity > MAX_LINE_QUANTITY {
            return Err(CartError::QuantityOverflow);
        }

        if let Some(line) = self.line_mut(product_id) {
            line.quantity = line
                .quantity
                .checked_add(quantity)
                .filter(|q| *q <= MAX_LINE_QUANTITY)
                .ok_or(CartError::QuantityOverflow)?;
            return Ok(*line);
        }

        let line = CartLine {
            product_id,
            quantity,
        };
        self.lines.push(line);
        Ok(line)
    }

    /// Overwrite a line's quantity. Zero evicts the line.
    ///
    /// # Errors
    ///
    /// `NegativeQuantity` below zero, `QuantityOverflow` above
    /// [`MAX_LINE_QUANTITY`], `LineNotFound` if the product is not in the cart.
    pub fn set_quantity(
        &mut self,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<QuantityChange, CartError> {
        if quantity < 0 {
            return Err(CartError::NegativeQuantity);
        }
        let quantity = u32::try_from(quantity)
            .ok()
            .filter(|q| *q <= MAX_LINE_QUANTITY)
            .ok_or(CartError::QuantityOverflow)?;

        if quantity == 0 {
            return self.remove(product_id).map(QuantityChange::Removed);
        }

        let line = self
            .line_mut(product_id)
            .ok_or(CartError::LineNotFound(product_id))?;
        line.quantity = quantity;
        Ok(QuantityChange::Updated(*line))
    }

    /// Remove a product's line.
    ///
    /// # Errors
    ///
    /// `LineNotFound` if the product is not in the cart.
    pub fn remove(&mut self, product_id: ProductId) -> Result<CartLine, CartError> {
        let index = self
            .lines
            .iter()
            .position(|l| l.product_id == product_id)
            .ok_or(CartError::LineNotFound(product_id))?;
        Ok(self.lines.remove(index))
    }

    /// Take `quantity` of a product out of the cart, as checkout does for
    /// each ordered line. The line goes once nothing is left; products not
    /// in the cart are ignored.
    pub fn deduct(&mut self, product_id: ProductId, quantity: u32) {
        let Some(index) = self.lines.iter().position(|l| l.product_id == product_id) else {
            return;
        };
        let line = &mut self.lines[index];
        if line.quantity > quantity {
            line.quantity -= quantity;
        } else {
            self.lines.remove(index);
        }
    }

    /// Empty the cart, keeping the cart itself.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.total_amount = Money::ZERO;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const USER: UserId = UserId::new(1);
    const A: ProductId = ProductId::new(10);
    const B: ProductId = ProductId::new(20);

    #[test]
    fn test_add_merges_into_one_line() {
        let mut cart = Cart::new(USER);
        cart.add(A, 2).unwrap();
        let line = cart.add(A, 3).unwrap();

        assert_eq!(line.quantity, 5);
        assert_eq!(cart.line_count(), 1);
        assert_eq!(cart.line(A).unwrap().quantity, 5);
    }

    #[test]
    fn test_add_distinct_products_appends() {
        let mut cart = Cart::new(USER);
        cart.add(A, 1).unwrap();
        cart.add(B, 2).unwrap();

        assert_eq!(cart.line_count(), 2);
        assert_eq!(cart.total_quantity(), 3);
    }

    #[test]
    fn test_add_zero_is_rejected() {
        let mut cart = Cart::new(USER);
        assert_eq!(cart.add(A, 0), Err(CartError::ZeroQuantity));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_add_overflow_leaves_line_unchanged() {
        let mut cart = Cart::new(USER);
        cart.add(A, MAX_LINE_QUANTITY).unwrap();
        assert_eq!(cart.add(A, 1), Err(CartError::QuantityOverflow));
        assert_eq!(cart.line(A).unwrap().quantity, MAX_LINE_QUANTITY);

        assert_eq!(
            cart.add(B, MAX_LINE_QUANTITY + 1),
            Err(CartError::QuantityOverflow)
        );
        assert_eq!(cart.add(B, u32::MAX), Err(CartError::QuantityOverflow));
        assert!(cart.line(B).is_none());
    }

    #[test]
    fn test_set_quantity_is_capped() {
        let mut cart = Cart::new(USER);
        cart.add(A, 1).unwrap();

        assert!(cart.set_quantity(A, i64::from(MAX_LINE_QUANTITY)).is_ok());
        assert_eq!(
            cart.set_quantity(A, i64::from(MAX_LINE_QUANTITY) + 1),
            Err(CartError::QuantityOverflow)
        );
        assert_eq!(
            cart.set_quantity(A, i64::from(u32::MAX)),
            Err(CartError::QuantityOverflow)
        );
        assert_eq!(cart.line(A).unwrap().quantity, MAX_LINE_QUANTITY);
    }

    #[test]
    fn test_deduct_keeps_lines_added_later() {
        let mut cart = Cart::new(USER);
        cart.add(A, 3).unwrap();
        cart.add(B, 1).unwrap();

        // Two of A were ordered; one more was added after the order was priced.
        cart.deduct(A, 2);
        assert_eq!(cart.line(A).unwrap().quantity, 1);
        assert_eq!(cart.line(B).unwrap().quantity, 1);

        cart.deduct(A, 5);
        assert!(cart.line(A).is_none());

        cart.deduct(ProductId::new(99), 1);
        assert_eq!(cart.line_count(), 1);
    }

    #[test]
    fn test_set_quantity_overwrites() {
        let mut cart = Cart::new(USER);
        cart.add(A, 1).unwrap();

        let change = cart.set_quantity(A, 7).unwrap();
        assert!(matches!(change, QuantityChange::Updated(l) if l.quantity == 7));
        assert_eq!(cart.line(A).unwrap().quantity, 7);
    }

    #[test]
    fn test_set_quantity_zero_evicts_exactly_one_line() {
        let mut cart = Cart::new(USER);
        cart.add(A, 1).unwrap();
        cart.add(B, 4).unwrap();

        let change = cart.set_quantity(B, 0).unwrap();
        assert!(matches!(change, QuantityChange::Removed(l) if l.product_id == B));
        assert_eq!(cart.line_count(), 1);
        assert!(cart.line(B).is_none());
    }

    #[test]
    fn test_set_quantity_on_missing_line() {
        let mut cart = Cart::new(USER);
        cart.add(A, 1).unwrap();

        assert_eq!(cart.set_quantity(B, 0), Err(CartError::LineNotFound(B)));
        assert_eq!(cart.set_quantity(B, 3), Err(CartError::LineNotFound(B)));
        assert_eq!(cart.line_count(), 1);
    }

    #[test]
    fn test_set_quantity_negative() {
        let mut cart = Cart::new(USER);
        cart.add(A, 2).unwrap();

        assert_eq!(cart.set_quantity(A, -1), Err(CartError::NegativeQuantity));
        assert_eq!(cart.line(A).unwrap().quantity, 2);
    }

    #[test]
    fn test_remove_and_clear() {
        let mut cart = Cart::new(USER);
        cart.add(A, 1).unwrap();
        cart.add(B, 1).unwrap();
        cart.set_total_amount(Money::from_units(99).unwrap());

        assert_eq!(cart.remove(A).unwrap().product_id, A);
        assert_eq!(cart.remove(A), Err(CartError::LineNotFound(A)));

        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.total_amount(), Money::ZERO);
        assert_eq!(cart.user_id(), USER);
    }

    #[test]
    fn test_from_parts_restores_invariants() {
        let cart = Cart::from_parts(
            USER,
            [
                CartLine {
                    product_id: A,
                    quantity: 1,
                },
                CartLine {
                    product_id: B,
                    quantity: 0,
                },
                CartLine {
                    product_id: A,
                    quantity: 2,
                },
            ],
            Money::ZERO,
        );

        assert_eq!(cart.line_count(), 1);
        assert_eq!(cart.line(A).unwrap().quantity, 3);
    }
}
