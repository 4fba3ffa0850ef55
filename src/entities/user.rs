//! User entity - Represents registered storefront accounts.
//!
//! Credential storage and token issuance are handled by the external identity
//! service; this table only carries the profile and role attributes the
//! storefront needs for ownership checks and admin gating.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Role attribute carried by an authenticated principal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular shopper
    #[sea_orm(string_value = "customer")]
    Customer,
    /// Back-office administrator
    #[sea_orm(string_value = "admin")]
    Admin,
}

/// User database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Unique identifier for the user
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Email address, unique across accounts
    #[sea_orm(unique)]
    pub email: String,
    /// Display name, unique across accounts
    #[sea_orm(unique)]
    pub username: String,
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
    /// Role used for admin gating
    pub role: Role,
    /// Deactivated accounts keep their history but cannot act
    pub is_active: bool,
    /// When the account was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between User and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// A user owns many cart items
    #[sea_orm(has_many = "super::cart_item::Entity")]
    CartItem,
    /// A user owns many orders
    #[sea_orm(has_many = "super::order::Entity")]
    Order,
}

impl Related<super::cart_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CartItem.def()
    }
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
