//! Public catalog routes.

use axum::extract::State;
use serde::{Deserialize, Serialize};

use quickbite_core::ProductId;

use super::{ApiPath, ApiQuery, Envelope};
use crate::error::Result;
use crate::models::{Product, ProductFilter};
use crate::services::CatalogService;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CatalogQuery {
    pub category: Option<String>,
}

impl From<CatalogQuery> for ProductFilter {
    fn from(query: CatalogQuery) -> Self {
        Self {
            category: query
                .category
                .map(|c| c.trim().to_owned())
                .filter(|c| !c.is_empty()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProductList {
    pub products: Vec<Product>,
}

#[derive(Debug, Serialize)]
pub struct ProductPayload {
    pub product: Product,
}

/// GET /api/user/get-all-products?category=
pub async fn list_products(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<CatalogQuery>,
) -> Result<Envelope<ProductList>> {
    let catalog = CatalogService::new(state.store(), state.media());
    let products = catalog.list(&query.into()).await?;
    Ok(Envelope::ok(ProductList { products }))
}

/// GET /api/user/get-product/{productId}
pub async fn get_product(
    State(state): State<AppState>,
    ApiPath(product_id): ApiPath<ProductId>,
) -> Result<Envelope<ProductPayload>> {
    let catalog = CatalogService::new(state.store(), state.media());
    let product = catalog.get(product_id).await?;
    Ok(Envelope::ok(ProductPayload { product }))
}
