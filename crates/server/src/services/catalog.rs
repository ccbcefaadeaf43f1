//! Product catalog.
//!
//! Listing and lookup are public. Create, update and delete require
//! `Action::ManageCatalog`.

use std::str::FromStr;

use tracing::instrument;

use quickbite_core::{Action, Money, Principal, ProductId, authorize};

use super::or_not_found;
use crate::db::Store;
use crate::error::{AppError, Result};
use crate::media::{MediaStore, Upload};
use crate::models::{NewProduct, Product, ProductFilter, ProductUpdate};

/// Text fields of the product form, as submitted.
///
/// Blank fields count as absent.
#[derive(Debug, Clone, Default)]
pub struct ProductForm {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<String>,
    pub category: Option<String>,
    pub stock: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn parse_price(raw: &str) -> Result<Money> {
    Money::from_str(raw).map_err(|_| AppError::Validation("Invalid price".to_string()))
}

fn parse_stock(raw: &str) -> Result<i32> {
    raw.trim()
        .parse::<i32>()
        .ok()
        .filter(|stock| *stock >= 0)
        .ok_or_else(|| AppError::Validation("Stock must be a non-negative integer".to_string()))
}

impl ProductForm {
    /// Validate a complete product. Stock defaults to 0.
    ///
    /// # Errors
    ///
    /// `Validation` if name, description, price or category is missing, or
    /// price/stock do not parse.
    pub fn into_new(self, image: Option<String>) -> Result<NewProduct> {
        let (Some(name), Some(description), Some(price), Some(category)) = (
            non_blank(self.name),
            non_blank(self.description),
            non_blank(self.price),
            non_blank(self.category),
        ) else {
            return Err(AppError::Validation("Missing details".to_string()));
        };

        Ok(NewProduct {
            name,
            description,
            price: parse_price(&price)?,
            category,
            stock: non_blank(self.stock).map_or(Ok(0), |s| parse_stock(&s))?,
            image,
        })
    }

    /// Validate a partial update. Absent fields stay unchanged.
    ///
    /// # Errors
    ///
    /// `Validation` if a present price or stock does not parse.
    pub fn into_update(self, image: Option<String>) -> Result<ProductUpdate> {
        Ok(ProductUpdate {
            name: non_blank(self.name),
            description: non_blank(self.description),
            price: non_blank(self.price).map(|p| parse_price(&p)).transpose()?,
            category: non_blank(self.category),
            stock: non_blank(self.stock).map(|s| parse_stock(&s)).transpose()?,
            image,
        })
    }
}

pub struct CatalogService<'a> {
    store: &'a dyn Store,
    media: &'a dyn MediaStore,
}

impl<'a> CatalogService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store, media: &'a dyn MediaStore) -> Self {
        Self { store, media }
    }

    /// Products matching `filter`, newest first. An empty catalog is not an error.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the store fails.
    pub async fn list(&self, filter: &ProductFilter) -> Result<Vec<Product>> {
        Ok(self.store.products(filter).await?)
    }

    /// # Errors
    ///
    /// `NotFound` if no product has this id.
    pub async fn get(&self, id: ProductId) -> Result<Product> {
        self.store
            .product(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Product not found".to_string()))
    }

    /// # Errors
    ///
    /// `Forbidden` for non-admins; `Validation` for an incomplete form.
    #[instrument(skip(self, form, image))]
    pub async fn create(
        &self,
        principal: &Principal,
        form: ProductForm,
        image: Option<Upload>,
    ) -> Result<Product> {
        authorize(principal.role, Action::ManageCatalog)?;

        // Validate before storing the image so a bad form leaves no file behind
        form.clone().into_new(None)?;
        let image = self.store_image(image).await?;
        let product = self.store.create_product(form.into_new(image)?).await?;

        tracing::info!(product_id = %product.id, name = %product.name, "Product added");
        Ok(product)
    }

    /// # Errors
    ///
    /// `Forbidden` for non-admins; `NotFound` if the product is gone.
    #[instrument(skip(self, form, image))]
    pub async fn update(
        &self,
        principal: &Principal,
        id: ProductId,
        form: ProductForm,
        image: Option<Upload>,
    ) -> Result<Product> {
        authorize(principal.role, Action::ManageCatalog)?;

        form.clone().into_update(None)?;
        let image = self.store_image(image).await?;
        let product = self
            .store
            .update_product(id, form.into_update(image)?)
            .await
            .map_err(or_not_found("Product"))?;

        tracing::info!(product_id = %product.id, "Product updated");
        Ok(product)
    }

    /// Carts and orders referencing the product keep their lines.
    ///
    /// # Errors
    ///
    /// `Forbidden` for non-admins; `NotFound` if the product is gone.
    #[instrument(skip(self))]
    pub async fn delete(&self, principal: &Principal, id: ProductId) -> Result<()> {
        authorize(principal.role, Action::ManageCatalog)?;
        self.store
            .delete_product(id)
            .await
            .map_err(or_not_found("Product"))?;

        tracing::info!(product_id = %id, "Product deleted");
        Ok(())
    }

    async fn store_image(&self, image: Option<Upload>) -> Result<Option<String>> {
        match image {
            Some(upload) => Ok(Some(self.media.store(upload).await?)),
            None => Ok(None),
        }
    }
}
