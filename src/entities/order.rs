//! Order entity - An immutable record of a completed purchase intent.
//!
//! `total_amount` is computed once at checkout from snapshotted item prices and
//! never recomputed. Only the two status columns and the payment reference ever
//! change after creation: `status` through admin action or payment
//! reconciliation, `payment_status` through reconciliation alone.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Fulfillment status of an order.
///
/// `pending -> processing -> shipped -> delivered`, with `cancelled` reachable
/// from `pending` or `processing`. Payment reconciliation drives the first hop;
/// admins may override to any enumerated status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Created, awaiting payment
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Payment confirmed, being prepared
    #[sea_orm(string_value = "processing")]
    Processing,
    /// Handed to the carrier
    #[sea_orm(string_value = "shipped")]
    Shipped,
    /// Received by the customer
    #[sea_orm(string_value = "delivered")]
    Delivered,
    /// Abandoned or payment failed
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

/// Payment outcome of an order, independent of fulfillment.
///
/// `pending` is the only non-terminal state; once `completed` or `failed` the
/// value never changes, which is what makes webhook replay a no-op.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// No payment outcome yet
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Terminal success
    #[sea_orm(string_value = "completed")]
    Completed,
    /// Terminal failure
    #[sea_orm(string_value = "failed")]
    Failed,
}

impl PaymentStatus {
    /// Whether this payment status can still change.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Order database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    /// Unique identifier for the order
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning user
    pub user_id: i64,
    /// Sum of item price x quantity at creation time, never recomputed
    #[sea_orm(column_type = "Decimal(Some((16, 2)))")]
    pub total_amount: Decimal,
    /// Fulfillment status
    pub status: OrderStatus,
    /// Payment outcome
    pub payment_status: PaymentStatus,
    /// Where the order ships to
    pub shipping_address: String,
    /// Where the invoice goes
    pub billing_address: String,
    /// Identifier of the payment intent at the external provider
    pub payment_reference: Option<String>,
    /// When the order was created
    pub created_at: DateTimeUtc,
    /// When a status column last changed
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Order and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each order belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
    /// An order carries many items
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItem,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItem.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
