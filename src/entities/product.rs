//! Product entity - Represents catalog entries with price and stock.
//!
//! `price` is authoritative only at order-creation time; checkout snapshots it
//! into order items, so later edits never touch existing orders.
//! `stock_quantity` must never go negative - checkout decrements it through a
//! guarded conditional update.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Product database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    /// Unique identifier for the product
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Name of the product
    pub name: String,
    /// Optional longer description
    pub description: Option<String>,
    /// Current unit price in the store currency
    #[sea_orm(column_type = "Decimal(Some((16, 2)))")]
    pub price: Decimal,
    /// Optional image shown in product listings
    pub image_url: Option<String>,
    /// Units currently in stock, never negative
    pub stock_quantity: i32,
    /// Category this product belongs to, if any
    pub category_id: Option<i64>,
    /// Soft delete flag - if false, product is hidden but data is preserved
    pub is_active: bool,
    /// When the product was created
    pub created_at: DateTimeUtc,
    /// When the product was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Product and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each product may belong to one category
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id"
    )]
    Category,
    /// A product appears in many cart items
    #[sea_orm(has_many = "super::cart_item::Entity")]
    CartItem,
    /// A product appears in many order items
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItem,
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::cart_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CartItem.def()
    }
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItem.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
