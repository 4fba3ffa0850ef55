//! Category entity - Groups products for catalog browsing.
//!
//! Categories are soft-deleted via the `is_active` flag so historical products
//! keep a valid reference.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Category database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "categories")]
pub struct Model {
    /// Unique identifier for the category
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Name of the category (e.g., "Electronics")
    pub name: String,
    /// Optional longer description
    pub description: Option<String>,
    /// Optional image shown in category listings
    pub image_url: Option<String>,
    /// Soft delete flag - if false, category is hidden but data is preserved
    pub is_active: bool,
    /// When the category was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Category and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// A category groups many products
    #[sea_orm(has_many = "super::product::Entity")]
    Product,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
