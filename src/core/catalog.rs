//! Catalog business logic - products and categories.
//!
//! This module owns the read-mostly product/category store: storefront-facing
//! search and lookup over active entries, admin-facing create/update/soft-delete
//! with explicit patch structs, and the guarded stock decrement that checkout
//! relies on to keep `stock_quantity` from ever going negative. Reads never
//! cache across calls; every operation re-reads current state.

use crate::{
    entities::{Category, Product, category, product},
    errors::{Error, Result},
};
use sea_orm::{Condition, QueryOrder, QuerySelect, Set, prelude::*};

use super::account::Principal;

const MAX_PAGE_SIZE: u64 = 100;

/// Search and pagination parameters for the storefront product listing.
#[derive(Debug, Clone, Default)]
pub struct ProductQuery {
    /// Case-insensitive text matched against name and description
    pub search: Option<String>,
    /// Restrict to one category
    pub category_id: Option<i64>,
    /// Lowest acceptable unit price
    pub min_price: Option<Decimal>,
    /// Highest acceptable unit price
    pub max_price: Option<Decimal>,
    /// 1-based page number; zero is treated as the first page
    pub page: u64,
    /// Page size, clamped to 1..=100; zero selects the default of 20
    pub limit: u64,
}

/// One page of results plus the pagination envelope.
#[derive(Debug, Clone)]
pub struct Page<T> {
    /// The rows on this page
    pub items: Vec<T>,
    /// Total rows matching the query
    pub total: u64,
    /// The page that was returned
    pub page: u64,
    /// The page size that was applied
    pub limit: u64,
    /// Total number of pages
    pub pages: u64,
}

/// Fields accepted when creating a product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    /// Product name
    pub name: String,
    /// Optional longer description
    pub description: Option<String>,
    /// Unit price, non-negative
    pub price: Decimal,
    /// Optional image URL
    pub image_url: Option<String>,
    /// Initial stock, non-negative
    pub stock_quantity: i32,
    /// Category to file the product under, if any
    pub category_id: Option<i64>,
}

/// Mutable product fields for admin updates; `None` leaves a field unchanged.
///
/// Enumerating the fields here (rather than applying arbitrary key/value pairs)
/// is what keeps immutable columns such as timestamps out of reach.
#[derive(Debug, Clone, Default)]
pub struct ProductPatch {
    /// New name
    pub name: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New unit price
    pub price: Option<Decimal>,
    /// New image URL
    pub image_url: Option<String>,
    /// New stock on hand
    pub stock_quantity: Option<i32>,
    /// New category
    pub category_id: Option<i64>,
    /// Activate or deactivate the listing
    pub is_active: Option<bool>,
}

/// Fields accepted when creating a category.
#[derive(Debug, Clone)]
pub struct NewCategory {
    /// Category name
    pub name: String,
    /// Optional longer description
    pub description: Option<String>,
    /// Optional image URL
    pub image_url: Option<String>,
}

/// Mutable category fields for admin updates; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct CategoryPatch {
    /// New name
    pub name: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New image URL
    pub image_url: Option<String>,
    /// Activate or deactivate the category
    pub is_active: Option<bool>,
}

/// Searches active products with optional filters and pagination.
///
/// Matches the storefront listing: text search over name and description,
/// category and price-range filters, page/limit envelope.
pub async fn search_products(
    db: &DatabaseConnection,
    query: &ProductQuery,
) -> Result<Page<product::Model>> {
    let limit = match query.limit {
        0 => 20,
        n => n.min(MAX_PAGE_SIZE),
    };
    let page = query.page.max(1);

    let mut find = Product::find().filter(product::Column::IsActive.eq(true));

    if let Some(text) = query.search.as_deref().filter(|t| !t.trim().is_empty()) {
        find = find.filter(
            Condition::any()
                .add(product::Column::Name.contains(text))
                .add(product::Column::Description.contains(text)),
        );
    }
    if let Some(category_id) = query.category_id {
        find = find.filter(product::Column::CategoryId.eq(category_id));
    }
    if let Some(min_price) = query.min_price {
        find = find.filter(product::Column::Price.gte(min_price));
    }
    if let Some(max_price) = query.max_price {
        find = find.filter(product::Column::Price.lte(max_price));
    }

    let total = find.clone().count(db).await?;
    let items = find
        .order_by_asc(product::Column::Name)
        .offset((page - 1) * limit)
        .limit(limit)
        .all(db)
        .await?;

    Ok(Page {
        items,
        total,
        page,
        limit,
        pages: total.div_ceil(limit),
    })
}

/// Fetches one active product, as seen by the storefront.
pub async fn get_active_product(db: &DatabaseConnection, product_id: i64) -> Result<product::Model> {
    Product::find_by_id(product_id)
        .filter(product::Column::IsActive.eq(true))
        .one(db)
        .await?
        .ok_or(Error::ProductNotFound { product_id })
}

/// Lists every product including inactive ones (admin only).
pub async fn list_all_products(
    db: &DatabaseConnection,
    principal: &Principal,
) -> Result<Vec<product::Model>> {
    principal.require_admin()?;
    Product::find()
        .order_by_asc(product::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::Validation {
            message: "Name cannot be empty".to_string(),
        });
    }
    Ok(())
}

fn validate_price(price: Decimal) -> Result<()> {
    if price.is_sign_negative() {
        return Err(Error::Validation {
            message: format!("Price cannot be negative: {price}"),
        });
    }
    Ok(())
}

fn validate_stock(stock: i32) -> Result<()> {
    if stock < 0 {
        return Err(Error::Validation {
            message: format!("Stock cannot be negative: {stock}"),
        });
    }
    Ok(())
}

async fn ensure_category_exists(db: &DatabaseConnection, category_id: i64) -> Result<()> {
    Category::find_by_id(category_id)
        .filter(category::Column::IsActive.eq(true))
        .one(db)
        .await?
        .map(|_| ())
        .ok_or(Error::CategoryNotFound { category_id })
}

/// Creates a product (admin only).
pub async fn create_product(
    db: &DatabaseConnection,
    principal: &Principal,
    new_product: NewProduct,
) -> Result<product::Model> {
    principal.require_admin()?;
    validate_name(&new_product.name)?;
    validate_price(new_product.price)?;
    validate_stock(new_product.stock_quantity)?;
    if let Some(category_id) = new_product.category_id {
        ensure_category_exists(db, category_id).await?;
    }

    let now = chrono::Utc::now();
    let model = product::ActiveModel {
        name: Set(new_product.name.trim().to_string()),
        description: Set(new_product.description),
        price: Set(new_product.price),
        image_url: Set(new_product.image_url),
        stock_quantity: Set(new_product.stock_quantity),
        category_id: Set(new_product.category_id),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    Ok(model.insert(db).await?)
}

/// Applies a patch to a product (admin only).
///
/// Admins can reach inactive products here, which is how a listing gets
/// reactivated after a soft delete.
pub async fn update_product(
    db: &DatabaseConnection,
    principal: &Principal,
    product_id: i64,
    patch: ProductPatch,
) -> Result<product::Model> {
    principal.require_admin()?;

    let existing = Product::find_by_id(product_id)
        .one(db)
        .await?
        .ok_or(Error::ProductNotFound { product_id })?;

    if let Some(name) = &patch.name {
        validate_name(name)?;
    }
    if let Some(price) = patch.price {
        validate_price(price)?;
    }
    if let Some(stock) = patch.stock_quantity {
        validate_stock(stock)?;
    }
    if let Some(category_id) = patch.category_id {
        ensure_category_exists(db, category_id).await?;
    }

    let mut model: product::ActiveModel = existing.into();
    if let Some(name) = patch.name {
        model.name = Set(name.trim().to_string());
    }
    if let Some(description) = patch.description {
        model.description = Set(Some(description));
    }
    if let Some(price) = patch.price {
        model.price = Set(price);
    }
    if let Some(image_url) = patch.image_url {
        model.image_url = Set(Some(image_url));
    }
    if let Some(stock) = patch.stock_quantity {
        model.stock_quantity = Set(stock);
    }
    if let Some(category_id) = patch.category_id {
        model.category_id = Set(Some(category_id));
    }
    if let Some(is_active) = patch.is_active {
        model.is_active = Set(is_active);
    }
    model.updated_at = Set(chrono::Utc::now());

    Ok(model.update(db).await?)
}

/// Soft-deletes a product (admin only); its rows in past orders are preserved.
pub async fn deactivate_product(
    db: &DatabaseConnection,
    principal: &Principal,
    product_id: i64,
) -> Result<product::Model> {
    update_product(
        db,
        principal,
        product_id,
        ProductPatch {
            is_active: Some(false),
            ..Default::default()
        },
    )
    .await
}

/// Decrements stock if and only if enough is available.
///
/// This is the serialization point for checkout: the check and the decrement
/// are one conditional `UPDATE`, so two concurrent orders can never both pass a
/// read-side stock check and oversell. Zero rows affected means the re-check
/// failed and the caller's transaction must abort.
pub async fn reserve_stock<C>(conn: &C, product_id: i64, quantity: i32) -> Result<()>
where
    C: ConnectionTrait,
{
    use sea_orm::sea_query::Expr;

    let result = Product::update_many()
        .col_expr(
            product::Column::StockQuantity,
            Expr::col(product::Column::StockQuantity).sub(quantity),
        )
        .filter(product::Column::Id.eq(product_id))
        .filter(product::Column::StockQuantity.gte(quantity))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        // Re-read to report how much actually remains
        let available = Product::find_by_id(product_id)
            .one(conn)
            .await?
            .map(|p| p.stock_quantity)
            .ok_or(Error::ProductNotFound { product_id })?;
        return Err(Error::InsufficientStock {
            product_id,
            available,
            requested: quantity,
        });
    }

    Ok(())
}

/// Lists active categories, ordered by name.
pub async fn list_categories(db: &DatabaseConnection) -> Result<Vec<category::Model>> {
    Category::find()
        .filter(category::Column::IsActive.eq(true))
        .order_by_asc(category::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Creates a category (admin only).
pub async fn create_category(
    db: &DatabaseConnection,
    principal: &Principal,
    new_category: NewCategory,
) -> Result<category::Model> {
    principal.require_admin()?;
    validate_name(&new_category.name)?;

    let model = category::ActiveModel {
        name: Set(new_category.name.trim().to_string()),
        description: Set(new_category.description),
        image_url: Set(new_category.image_url),
        is_active: Set(true),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    Ok(model.insert(db).await?)
}

/// Applies a patch to a category (admin only).
pub async fn update_category(
    db: &DatabaseConnection,
    principal: &Principal,
    category_id: i64,
    patch: CategoryPatch,
) -> Result<category::Model> {
    principal.require_admin()?;

    let existing = Category::find_by_id(category_id)
        .one(db)
        .await?
        .ok_or(Error::CategoryNotFound { category_id })?;

    if let Some(name) = &patch.name {
        validate_name(name)?;
    }

    let mut model: category::ActiveModel = existing.into();
    if let Some(name) = patch.name {
        model.name = Set(name.trim().to_string());
    }
    if let Some(description) = patch.description {
        model.description = Set(Some(description));
    }
    if let Some(image_url) = patch.image_url {
        model.image_url = Set(Some(image_url));
    }
    if let Some(is_active) = patch.is_active {
        model.is_active = Set(is_active);
    }
    Ok(model.update(db).await?)
}

/// Soft-deletes a category (admin only).
///
/// Fails with `CategoryInUse` while any product still references the category,
/// matching the admin contract that products must be moved or retired first.
pub async fn delete_category(
    db: &DatabaseConnection,
    principal: &Principal,
    category_id: i64,
) -> Result<()> {
    principal.require_admin()?;

    let existing = Category::find_by_id(category_id)
        .one(db)
        .await?
        .ok_or(Error::CategoryNotFound { category_id })?;

    let product_count = Product::find()
        .filter(product::Column::CategoryId.eq(category_id))
        .count(db)
        .await?;
    if product_count > 0 {
        return Err(Error::CategoryInUse {
            category_id,
            product_count,
        });
    }

    let mut model: category::ActiveModel = existing.into();
    model.is_active = Set(false);
    model.update(db).await?;
    Ok(())
}
