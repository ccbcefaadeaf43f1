//! Order read model: snapshot lines joined with product and customer data.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use quickbite_core::{
    Money, MoneyError, Order, OrderId, OrderStatus, PaymentMethod, ProductId, UserId,
};

use super::cart::UNKNOWN_PRODUCT;
use super::product::Product;
use super::user::{CustomerSummary, User};

/// One purchased line. Price and quantity come from the snapshot; name and
/// image from the live catalog.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemView {
    pub product_id: ProductId,
    pub name: String,
    pub image: Option<String>,
    pub quantity: u32,
    pub price: Money,
    pub subtotal: Money,
}

/// An order as returned by the API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    pub id: OrderId,
    pub user_id: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer: Option<CustomerSummary>,
    pub items: Vec<OrderItemView>,
    pub total_amount: Money,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub address: String,
    pub phone: String,
    pub note: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderView {
    /// Join `order` with catalog data and, for admin listings, the customer.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::Overflow` if a line subtotal does not fit.
    pub fn build(
        order: Order,
        products: &HashMap<ProductId, Product>,
        customer: Option<&User>,
    ) -> Result<Self, MoneyError> {
        let items = order
            .lines
            .iter()
            .map(|line| {
                let product = products.get(&line.product_id);
                Ok(OrderItemView {
                    product_id: line.product_id,
                    name: product.map_or_else(|| UNKNOWN_PRODUCT.to_owned(), |p| p.name.clone()),
                    image: product.and_then(|p| p.image.clone()),
                    quantity: line.quantity,
                    price: line.price,
                    subtotal: line.subtotal()?,
                })
            })
            .collect::<Result<Vec<_>, MoneyError>>()?;

        Ok(Self {
            id: order.id,
            user_id: order.user_id,
            customer: customer.map(CustomerSummary::from),
            items,
            total_amount: order.total_amount,
            status: order.status,
            payment_method: order.payment_method,
            address: order.delivery.address,
            phone: order.delivery.phone,
            note: order.delivery.note,
            created_at: order.created_at,
            updated_at: order.updated_at,
        })
    }
}
