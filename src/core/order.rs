//! Order ledger - queries and status transitions.
//!
//! Orders are immutable after checkout except for their two status columns and
//! the payment reference. Payment-driven transitions go through
//! [`apply_payment_outcome`], whose terminal-state guard is the sole mechanism
//! that makes duplicate and out-of-order webhook delivery safe. Admin overrides
//! go through [`set_order_status`] and deliberately skip further business-rule
//! checks.

use crate::{
    entities::{Order, OrderItem, OrderStatus, PaymentStatus, order, order_item},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};

use super::account::Principal;

/// An order together with its immutable lines.
#[derive(Debug, Clone)]
pub struct OrderWithItems {
    /// The order row
    pub order: order::Model,
    /// Its lines, with prices frozen at creation time
    pub items: Vec<order_item::Model>,
}

/// Outcome reported by the payment provider for an order's intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentOutcome {
    /// The charge went through
    Succeeded,
    /// The charge was declined or errored
    Failed,
}

/// Result of applying a payment outcome to an order.
#[derive(Debug, Clone)]
pub enum Applied {
    /// The transition was performed
    Updated(order::Model),
    /// The order was already in a terminal payment state; nothing changed
    AlreadyFinal(order::Model),
}

/// Parses a status string from the admin surface into the enumerated set.
pub fn parse_status(status: &str) -> Result<OrderStatus> {
    match status {
        "pending" => Ok(OrderStatus::Pending),
        "processing" => Ok(OrderStatus::Processing),
        "shipped" => Ok(OrderStatus::Shipped),
        "delivered" => Ok(OrderStatus::Delivered),
        "cancelled" => Ok(OrderStatus::Cancelled),
        other => Err(Error::InvalidStatus {
            status: other.to_string(),
        }),
    }
}

/// Lists a user's own orders, newest first.
pub async fn list_orders_for_user(
    db: &DatabaseConnection,
    user_id: i64,
) -> Result<Vec<order::Model>> {
    Order::find()
        .filter(order::Column::UserId.eq(user_id))
        .order_by_desc(order::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Fetches one order visible to the principal, with its items.
///
/// Customers only see their own orders; an order owned by someone else reads
/// as missing rather than forbidden, so ids can't be probed.
pub async fn get_order_with_items(
    db: &DatabaseConnection,
    principal: &Principal,
    order_id: i64,
) -> Result<OrderWithItems> {
    let mut find = Order::find_by_id(order_id);
    if !principal.is_admin() {
        find = find.filter(order::Column::UserId.eq(principal.user_id));
    }
    let order = find
        .one(db)
        .await?
        .ok_or(Error::OrderNotFound { order_id })?;

    let items = OrderItem::find()
        .filter(order_item::Column::OrderId.eq(order.id))
        .order_by_asc(order_item::Column::Id)
        .all(db)
        .await?;

    Ok(OrderWithItems { order, items })
}

/// Lists every order in the store, newest first (admin only).
pub async fn list_all_orders(
    db: &DatabaseConnection,
    principal: &Principal,
) -> Result<Vec<order::Model>> {
    principal.require_admin()?;
    Order::find()
        .order_by_desc(order::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Mutable order fields for owner/admin updates; `None` leaves a field
/// unchanged. `total_amount`, addresses, and items are deliberately absent -
/// they are frozen at checkout.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderPatch {
    /// New fulfillment status
    pub status: Option<OrderStatus>,
    /// New payment status
    pub payment_status: Option<PaymentStatus>,
}

/// Applies a patch to an order the principal owns or administers.
pub async fn update_order(
    db: &DatabaseConnection,
    principal: &Principal,
    order_id: i64,
    patch: OrderPatch,
) -> Result<order::Model> {
    let order = Order::find_by_id(order_id)
        .one(db)
        .await?
        .ok_or(Error::OrderNotFound { order_id })?;
    principal.require_owner_or_admin(order.user_id)?;

    let mut model: order::ActiveModel = order.into();
    if let Some(status) = patch.status {
        model.status = Set(status);
    }
    if let Some(payment_status) = patch.payment_status {
        model.payment_status = Set(payment_status);
    }
    model.updated_at = Set(chrono::Utc::now());
    Ok(model.update(db).await?)
}

/// Sets an order's status from the admin surface.
///
/// The target comes in as a string constrained to the enumerated set; anything
/// else fails with `InvalidStatus`. This is an override - no transition-table
/// check is applied beyond enum membership.
pub async fn set_order_status(
    db: &DatabaseConnection,
    principal: &Principal,
    order_id: i64,
    status: &str,
) -> Result<order::Model> {
    principal.require_admin()?;
    let status = parse_status(status)?;

    let order = Order::find_by_id(order_id)
        .one(db)
        .await?
        .ok_or(Error::OrderNotFound { order_id })?;

    let mut model: order::ActiveModel = order.into();
    model.status = Set(status);
    model.updated_at = Set(chrono::Utc::now());
    Ok(model.update(db).await?)
}

/// Applies a payment outcome to an order under the terminal-state guard.
///
/// If `payment_status` is already `completed` or `failed` the order is returned
/// untouched: replaying the same provider event, or receiving a late
/// contradictory one, must change nothing. Callers run this inside the same
/// transaction that looked the order up.
pub async fn apply_payment_outcome<C>(
    conn: &C,
    order: order::Model,
    outcome: PaymentOutcome,
) -> Result<Applied>
where
    C: ConnectionTrait,
{
    if order.payment_status.is_terminal() {
        return Ok(Applied::AlreadyFinal(order));
    }

    let (payment_status, status) = match outcome {
        PaymentOutcome::Succeeded => (PaymentStatus::Completed, OrderStatus::Processing),
        PaymentOutcome::Failed => (PaymentStatus::Failed, OrderStatus::Cancelled),
    };

    let mut model: order::ActiveModel = order.into();
    model.payment_status = Set(payment_status);
    model.status = Set(status);
    model.updated_at = Set(chrono::Utc::now());
    Ok(Applied::Updated(model.update(conn).await?))
}
