//! Checkout business logic - converts a cart into a priced order.
//!
//! `create_order` is the only writer that touches carts, orders, and stock
//! together, and it does all of it inside one transaction: validate every cart
//! line against the current catalog, snapshot prices into order items,
//! decrement stock through the guarded conditional update, and clear the cart.
//! Any failure before commit rolls the whole unit back, so a rejected order
//! never leaves a partial stock decrement or a half-written order behind.

use crate::{
    entities::{CartItem, OrderStatus, PaymentStatus, Product, cart_item, order, order_item},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::info;

use super::catalog;
use super::order::OrderWithItems;

/// Creates an order from the user's cart.
///
/// Preconditions, all evaluated against current data inside the transaction:
/// the cart is non-empty, every referenced product is active, and every
/// requested quantity is coverable by current stock. The order total is the sum
/// of current price x quantity per line, and those prices are frozen into the
/// order items. Stock is decremented through [`catalog::reserve_stock`], which
/// re-validates availability at write time so concurrent checkouts against the
/// same product cannot oversell.
pub async fn create_order(
    db: &DatabaseConnection,
    user_id: i64,
    shipping_address: &str,
    billing_address: &str,
) -> Result<OrderWithItems> {
    if shipping_address.trim().is_empty() || billing_address.trim().is_empty() {
        return Err(Error::Validation {
            message: "Shipping and billing addresses are required".to_string(),
        });
    }

    // Dropping the transaction on any early return rolls everything back
    let txn = db.begin().await?;

    let cart_items = CartItem::find()
        .filter(cart_item::Column::UserId.eq(user_id))
        .order_by_asc(cart_item::Column::ProductId)
        .all(&txn)
        .await?;
    if cart_items.is_empty() {
        return Err(Error::EmptyCart);
    }

    // Price and validate every line before writing anything
    let mut total_amount = Decimal::ZERO;
    let mut lines = Vec::with_capacity(cart_items.len());
    for item in &cart_items {
        let product = Product::find_by_id(item.product_id)
            .one(&txn)
            .await?
            .ok_or(Error::ProductNotFound {
                product_id: item.product_id,
            })?;

        if !product.is_active {
            return Err(Error::ProductUnavailable {
                product_id: product.id,
            });
        }
        if product.stock_quantity < item.quantity {
            return Err(Error::InsufficientStock {
                product_id: product.id,
                available: product.stock_quantity,
                requested: item.quantity,
            });
        }

        total_amount += product.price * Decimal::from(item.quantity);
        lines.push((product.id, item.quantity, product.price));
    }

    let now = chrono::Utc::now();
    let created = order::ActiveModel {
        user_id: Set(user_id),
        total_amount: Set(total_amount),
        status: Set(OrderStatus::Pending),
        payment_status: Set(PaymentStatus::Pending),
        shipping_address: Set(shipping_address.trim().to_string()),
        billing_address: Set(billing_address.trim().to_string()),
        payment_reference: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let mut items = Vec::with_capacity(lines.len());
    for (product_id, quantity, price) in lines {
        let line = order_item::ActiveModel {
            order_id: Set(created.id),
            product_id: Set(product_id),
            quantity: Set(quantity),
            price: Set(price),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        // Re-validated at write time; a miss here aborts the whole order
        catalog::reserve_stock(&txn, product_id, quantity).await?;
        items.push(line);
    }

    CartItem::delete_many()
        .filter(cart_item::Column::UserId.eq(user_id))
        .exec(&txn)
        .await?;

    txn.commit().await?;
    info!(
        order_id = created.id,
        user_id,
        total = %created.total_amount,
        "order created"
    );

    Ok(OrderWithItems {
        order: created,
        items,
    })
}
