//! Catalog seeding from catalog.toml
//!
//! This module provides functionality to load an initial catalog (categories
//! and products) from a TOML configuration file. The entries defined in
//! catalog.toml are used to seed the database on first run; seeding is
//! idempotent and only inserts rows that are missing.

use crate::entities::{Category, Product, category, product};
use crate::errors::{Error, Result};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

/// Configuration structure representing the entire catalog.toml file
#[derive(Debug, Deserialize)]
pub struct CatalogConfig {
    /// List of categories to seed
    #[serde(default)]
    pub categories: Vec<CategorySeed>,
    /// List of products to seed
    #[serde(default)]
    pub products: Vec<ProductSeed>,
}

/// Configuration for a single category
#[derive(Debug, Deserialize, Clone)]
pub struct CategorySeed {
    /// Name of the category
    pub name: String,
    /// Optional description
    pub description: Option<String>,
}

/// Configuration for a single product
#[derive(Debug, Deserialize, Clone)]
pub struct ProductSeed {
    /// Name of the product
    pub name: String,
    /// Optional description
    pub description: Option<String>,
    /// Unit price in the store currency
    pub price: f64,
    /// Initial stock on hand
    pub stock_quantity: i32,
    /// Name of the category this product belongs to, if any
    pub category: Option<String>,
}

/// Loads catalog configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - Required fields are missing
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CatalogConfig> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read catalog file: {e}"),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse catalog.toml: {e}"),
    })
}

/// Loads catalog configuration from the default location (./catalog.toml)
pub fn load_default_config() -> Result<CatalogConfig> {
    load_config("catalog.toml")
}

/// Seeds categories and products that are not already present.
///
/// Rows are matched by name, so running the seed repeatedly never duplicates
/// entries and never touches rows an admin has since edited.
pub async fn seed_catalog(db: &DatabaseConnection, config: &CatalogConfig) -> Result<()> {
    for seed in &config.categories {
        let existing = Category::find()
            .filter(category::Column::Name.eq(seed.name.as_str()))
            .one(db)
            .await?;
        if existing.is_some() {
            continue;
        }

        let now = chrono::Utc::now();
        category::ActiveModel {
            name: Set(seed.name.clone()),
            description: Set(seed.description.clone()),
            image_url: Set(None),
            is_active: Set(true),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await?;
        info!(category = %seed.name, "seeded category");
    }

    for seed in &config.products {
        let existing = Product::find()
            .filter(product::Column::Name.eq(seed.name.as_str()))
            .one(db)
            .await?;
        if existing.is_some() {
            continue;
        }

        let category_id = match &seed.category {
            Some(name) => {
                let found = Category::find()
                    .filter(category::Column::Name.eq(name.as_str()))
                    .one(db)
                    .await?
                    .ok_or_else(|| Error::Config {
                        message: format!("Product {} references unknown category {name}", seed.name),
                    })?;
                Some(found.id)
            }
            None => None,
        };

        let price = Decimal::from_f64_retain(seed.price)
            .ok_or_else(|| Error::Config {
                message: format!("Product {} has an invalid price", seed.name),
            })?
            .round_dp(2);
        if price.is_sign_negative() {
            return Err(Error::Config {
                message: format!("Product {} has a negative price", seed.name),
            });
        }
        if seed.stock_quantity < 0 {
            return Err(Error::Config {
                message: format!("Product {} has negative stock", seed.name),
            });
        }

        let now = chrono::Utc::now();
        product::ActiveModel {
            name: Set(seed.name.clone()),
            description: Set(seed.description.clone()),
            price: Set(price),
            image_url: Set(None),
            stock_quantity: Set(seed.stock_quantity),
            category_id: Set(category_id),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await?;
        info!(product = %seed.name, "seeded product");
    }

    Ok(())
}
