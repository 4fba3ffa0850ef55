//! Store analytics for the admin surface.
//!
//! Counts and revenue summaries are computed by fetching the relevant rows and
//! folding in Rust rather than pushing aggregates into SQL; the admin surface
//! reads these rarely and the store is small. Revenue only counts orders whose
//! payment actually completed.

use crate::{
    entities::{Order, OrderItem, PaymentStatus, Product, User, order, order_item, product, user},
    errors::Result,
};
use sea_orm::prelude::*;
use std::collections::HashMap;

use super::account::Principal;

/// Aggregate counters shown on the admin dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOverview {
    /// All registered accounts
    pub users_total: u64,
    /// Accounts that can currently act
    pub users_active: u64,
    /// All catalog entries, including soft-deleted ones
    pub products_total: u64,
    /// Entries visible to the storefront
    pub products_active: u64,
    /// All orders ever placed
    pub orders_total: u64,
    /// Orders placed in the last 30 days
    pub orders_recent_30_days: u64,
    /// Sum of totals across completed-payment orders
    pub revenue_total: Decimal,
}

/// Sales totals for one product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopProduct {
    /// The product
    pub product_id: i64,
    /// Its current name
    pub name: String,
    /// Units across completed-payment orders
    pub units_sold: i64,
    /// Snapshot-price revenue across completed-payment orders
    pub revenue: Decimal,
}

/// Builds the admin dashboard counters (admin only).
pub async fn store_overview(
    db: &DatabaseConnection,
    principal: &Principal,
) -> Result<StoreOverview> {
    principal.require_admin()?;

    let users_total = User::find().count(db).await?;
    let users_active = User::find()
        .filter(user::Column::IsActive.eq(true))
        .count(db)
        .await?;
    let products_total = Product::find().count(db).await?;
    let products_active = Product::find()
        .filter(product::Column::IsActive.eq(true))
        .count(db)
        .await?;
    let orders_total = Order::find().count(db).await?;

    let thirty_days_ago = chrono::Utc::now() - chrono::Duration::days(30);
    let orders_recent_30_days = Order::find()
        .filter(order::Column::CreatedAt.gte(thirty_days_ago))
        .count(db)
        .await?;

    let completed = Order::find()
        .filter(order::Column::PaymentStatus.eq(PaymentStatus::Completed))
        .all(db)
        .await?;
    let revenue_total = completed
        .iter()
        .fold(Decimal::ZERO, |sum, o| sum + o.total_amount);

    Ok(StoreOverview {
        users_total,
        users_active,
        products_total,
        products_active,
        orders_total,
        orders_recent_30_days,
        revenue_total,
    })
}

/// Ranks products by units sold across completed-payment orders (admin only).
pub async fn top_products(
    db: &DatabaseConnection,
    principal: &Principal,
    limit: usize,
) -> Result<Vec<TopProduct>> {
    principal.require_admin()?;

    let completed_ids: Vec<i64> = Order::find()
        .filter(order::Column::PaymentStatus.eq(PaymentStatus::Completed))
        .all(db)
        .await?
        .into_iter()
        .map(|o| o.id)
        .collect();
    if completed_ids.is_empty() {
        return Ok(Vec::new());
    }

    let items = OrderItem::find()
        .filter(order_item::Column::OrderId.is_in(completed_ids))
        .all(db)
        .await?;

    // units and revenue per product, from the frozen line prices
    let mut totals: HashMap<i64, (i64, Decimal)> = HashMap::new();
    for item in items {
        let entry = totals.entry(item.product_id).or_insert((0, Decimal::ZERO));
        entry.0 += i64::from(item.quantity);
        entry.1 += item.price * Decimal::from(item.quantity);
    }

    let products = Product::find()
        .filter(product::Column::Id.is_in(totals.keys().copied().collect::<Vec<_>>()))
        .all(db)
        .await?;
    let names: HashMap<i64, String> = products.into_iter().map(|p| (p.id, p.name)).collect();

    let mut ranked: Vec<TopProduct> = totals
        .into_iter()
        .map(|(product_id, (units_sold, revenue))| TopProduct {
            product_id,
            name: names.get(&product_id).cloned().unwrap_or_default(),
            units_sold,
            revenue,
        })
        .collect();
    ranked.sort_by(|a, b| b.units_sold.cmp(&a.units_sold).then(a.product_id.cmp(&b.product_id)));
    ranked.truncate(limit);
    Ok(ranked)
}
