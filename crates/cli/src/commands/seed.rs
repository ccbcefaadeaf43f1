//! Seed the catalog from a YAML file.
//!
//! ```yaml
//! products:
//!   - name: Phở bò
//!     description: Beef noodle soup
//!     price: 45000
//!     category: Noodles
//!     stock: 40
//!     image: /uploads/pho-bo.jpg
//! ```
//!
//! The whole file is validated before the database is touched.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use tracing::{error, info};

use quickbite_core::Money;
use quickbite_server::db::{PgStore, ProductStore};
use quickbite_server::models::{NewProduct, ProductFilter};

use super::{CommandError, connect};

#[derive(Debug, Deserialize)]
pub struct SeedFile {
    pub products: Vec<SeedProduct>,
}

#[derive(Debug, Deserialize)]
pub struct SeedProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Money,
    pub category: String,
    #[serde(default)]
    pub stock: i32,
    #[serde(default)]
    pub image: Option<String>,
}

impl From<SeedProduct> for NewProduct {
    fn from(p: SeedProduct) -> Self {
        Self {
            name: p.name.trim().to_owned(),
            description: p.description.trim().to_owned(),
            price: p.price,
            category: p.category.trim().to_owned(),
            stock: p.stock,
            image: p.image,
        }
    }
}

/// Problems in a seed file, one message per offending entry.
pub fn validate(file: &SeedFile) -> Vec<String> {
    let mut errors = Vec::new();
    let mut names = HashSet::new();

    for (i, p) in file.products.iter().enumerate() {
        let name = p.name.trim();
        if name.is_empty() {
            errors.push(format!("product #{}: name is empty", i + 1));
        } else if !names.insert(name.to_lowercase()) {
            errors.push(format!("product #{}: duplicate name `{name}`", i + 1));
        }
        if p.category.trim().is_empty() {
            errors.push(format!("product #{}: category is empty", i + 1));
        }
        if p.stock < 0 {
            errors.push(format!("product #{}: stock is negative", i + 1));
        }
    }

    errors
}

/// Insert the products listed in `path`.
///
/// Products whose name already exists in the catalog are skipped unless
/// `allow_duplicates` is set.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, fails validation,
/// or a database operation fails.
pub async fn products(path: &Path, allow_duplicates: bool) -> Result<(), CommandError> {
    info!(path = %path.display(), "Loading products from file");

    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CommandError::Read {
            path: path.display().to_string(),
            source,
        })?;
    let file: SeedFile = serde_yaml::from_str(&content)?;

    info!(products = file.products.len(), "Parsed seed file");

    let errors = validate(&file);
    if !errors.is_empty() {
        error!("Seed file validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(CommandError::InvalidSeed(errors.len()));
    }

    let store = PgStore::new(connect().await?);

    let existing: HashSet<String> = if allow_duplicates {
        HashSet::new()
    } else {
        store
            .products(&ProductFilter::default())
            .await?
            .into_iter()
            .map(|p| p.name.to_lowercase())
            .collect()
    };

    let mut inserted = 0_usize;
    let mut skipped = 0_usize;
    for product in file.products {
        if existing.contains(&product.name.trim().to_lowercase()) {
            skipped += 1;
            continue;
        }
        let created = store.create_product(product.into()).await?;
        info!(product_id = %created.id, name = %created.name, "Inserted product");
        inserted += 1;
    }

    info!("Seeding complete!");
    info!("  Products inserted: {inserted}");
    info!("  Products skipped (already exist): {skipped}");

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SAMPLE: &str = r"
products:
  - name: Phở bò
    description: Beef noodle soup
    price: 45000
    category: Noodles
    stock: 40
  - name: Bánh mì
    price: 20000
    category: Bread
";

    #[test]
    fn test_parse_sample_file() {
        let file: SeedFile = serde_yaml::from_str(SAMPLE).unwrap();
        assert_eq!(file.products.len(), 2);
        assert_eq!(file.products[1].stock, 0);
        assert_eq!(file.products[1].price, Money::from_units(20000).unwrap());
        assert!(validate(&file).is_empty());
    }

    #[test]
    fn test_negative_price_is_rejected_at_parse() {
        let yaml = "products:\n  - name: X\n    price: -1\n    category: Y\n";
        assert!(serde_yaml::from_str::<SeedFile>(yaml).is_err());
    }

    #[test]
    fn test_validation_reports_every_problem() {
        let yaml = r"
products:
  - name: ' '
    price: 1
    category: Drinks
  - name: Trà đá
    price: 1
    category: ''
  - name: trà đá
    price: 1
    category: Drinks
    stock: -3
";
        let file: SeedFile = serde_yaml::from_str(yaml).unwrap();
        let errors = validate(&file);
        assert_eq!(errors.len(), 4);
        assert!(errors[2].contains("duplicate"));
    }
}
