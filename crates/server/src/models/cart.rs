//! Cart read model: lines joined with live product data.

use std::collections::HashMap;

use serde::Serialize;

use quickbite_core::{Cart, Money, MoneyError, ProductId};

use super::product::Product;

/// Name shown for lines whose product has been removed from the catalog.
pub const UNKNOWN_PRODUCT: &str = "Unknown product";

/// One priced cart line.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemView {
    pub product_id: ProductId,
    pub name: String,
    pub image: Option<String>,
    pub price: Money,
    pub quantity: u32,
    pub subtotal: Money,
    /// False when the product no longer exists.
    pub available: bool,
}

/// A cart as shown to its owner.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub total_amount: Money,
}

impl CartView {
    /// Price `cart` against the current catalog.
    ///
    /// Lines for deleted products are kept with a zero price and excluded
    /// from the total.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::Overflow` if the total does not fit.
    pub fn build(cart: &Cart, products: &HashMap<ProductId, Product>) -> Result<Self, MoneyError> {
        let items = cart
            .lines()
            .iter()
            .map(|line| {
                let item = match products.get(&line.product_id) {
                    Some(product) => CartItemView {
                        product_id: line.product_id,
                        name: product.name.clone(),
                        image: product.image.clone(),
                        price: product.price,
                        quantity: line.quantity,
                        subtotal: product.price.times(line.quantity)?,
                        available: true,
                    },
                    None => CartItemView {
                        product_id: line.product_id,
                        name: UNKNOWN_PRODUCT.to_owned(),
                        image: None,
                        price: Money::ZERO,
                        quantity: line.quantity,
                        subtotal: Money::ZERO,
                        available: false,
                    },
                };
                Ok(item)
            })
            .collect::<Result<Vec<_>, MoneyError>>()?;

        let total_amount = Money::sum(items.iter().map(|item| item.subtotal))?;

        Ok(Self {
            items,
            total_amount,
        })
    }
}
