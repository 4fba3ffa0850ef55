//! Shared test utilities for the storefront crate.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    core::{cart, checkout},
    entities::{self, Role},
    errors::Result,
};
use sea_orm::{DatabaseConnection, Set, prelude::*};

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a test user with the given role.
pub async fn create_user_with_role(
    db: &DatabaseConnection,
    username: &str,
    role: Role,
) -> Result<entities::user::Model> {
    let user = entities::user::ActiveModel {
        email: Set(format!("{username}@example.com")),
        username: Set(username.to_string()),
        first_name: Set("Test".to_string()),
        last_name: Set("User".to_string()),
        role: Set(role),
        is_active: Set(true),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    Ok(user.insert(db).await?)
}

/// Creates a test customer account.
pub async fn create_test_user(
    db: &DatabaseConnection,
    username: &str,
) -> Result<entities::user::Model> {
    create_user_with_role(db, username, Role::Customer).await
}

/// Creates a test category with sensible defaults.
pub async fn create_test_category(
    db: &DatabaseConnection,
    name: &str,
) -> Result<entities::category::Model> {
    let category = entities::category::ActiveModel {
        name: Set(name.to_string()),
        description: Set(None),
        image_url: Set(None),
        is_active: Set(true),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    Ok(category.insert(db).await?)
}

/// Creates a test product priced in whole cents.
///
/// # Arguments
/// * `db` - Database connection
/// * `name` - Product name
/// * `price_cents` - Unit price in cents (e.g., 1000 for 10.00)
/// * `stock` - Initial stock on hand
pub async fn create_test_product(
    db: &DatabaseConnection,
    name: &str,
    price_cents: i64,
    stock: i32,
) -> Result<entities::product::Model> {
    let now = chrono::Utc::now();
    let product = entities::product::ActiveModel {
        name: Set(name.to_string()),
        description: Set(None),
        price: Set(Decimal::new(price_cents, 2)),
        image_url: Set(None),
        stock_quantity: Set(stock),
        category_id: Set(None),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    Ok(product.insert(db).await?)
}

/// Adds a product to a user's cart and creates an order from it.
/// Returns the created order with its items, for payment-flow tests.
pub async fn place_test_order(
    db: &DatabaseConnection,
    user_id: i64,
    product_id: i64,
    quantity: i32,
) -> Result<crate::core::order::OrderWithItems> {
    cart::add_to_cart(db, user_id, product_id, quantity).await?;
    checkout::create_order(db, user_id, "1 Test Lane", "1 Test Lane").await
}

/// Sets up a complete test environment with a customer and a stocked product.
/// Returns (db, user, product) for common checkout scenarios.
pub async fn setup_with_product() -> Result<(
    DatabaseConnection,
    entities::user::Model,
    entities::product::Model,
)> {
    let db = setup_test_db().await?;
    let user = create_test_user(&db, "shopper").await?;
    let product = create_test_product(&db, "Test Product", 1000, 10).await?;
    Ok((db, user, product))
}
