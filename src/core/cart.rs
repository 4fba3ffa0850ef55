//! Cart business logic - per-user mutable line items.
//!
//! A cart row pairs one user with one product; adding a product that is already
//! in the cart merges quantities instead of inserting a second row. Stock is
//! checked against the catalog on every mutation so a cart can't silently hold
//! more units than exist, but the authoritative check-and-decrement only
//! happens later, inside checkout's transaction.

use crate::{
    entities::{CartItem, cart_item},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};

use super::catalog;

fn validate_quantity(quantity: i32) -> Result<()> {
    if quantity <= 0 {
        return Err(Error::Validation {
            message: format!("Quantity must be positive: {quantity}"),
        });
    }
    Ok(())
}

/// Retrieves all cart items for a user, oldest first.
pub async fn get_cart(db: &DatabaseConnection, user_id: i64) -> Result<Vec<cart_item::Model>> {
    CartItem::find()
        .filter(cart_item::Column::UserId.eq(user_id))
        .order_by_asc(cart_item::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Counts the line items in a user's cart.
pub async fn cart_count(db: &DatabaseConnection, user_id: i64) -> Result<u64> {
    CartItem::find()
        .filter(cart_item::Column::UserId.eq(user_id))
        .count(db)
        .await
        .map_err(Into::into)
}

/// Adds a product to a user's cart, merging with any existing line.
///
/// The product must exist and be active. The merged quantity is checked
/// against current stock so the cart can't grow past what the catalog holds.
pub async fn add_to_cart(
    db: &DatabaseConnection,
    user_id: i64,
    product_id: i64,
    quantity: i32,
) -> Result<cart_item::Model> {
    validate_quantity(quantity)?;
    let product = catalog::get_active_product(db, product_id).await?;

    let existing = CartItem::find()
        .filter(cart_item::Column::UserId.eq(user_id))
        .filter(cart_item::Column::ProductId.eq(product_id))
        .one(db)
        .await?;

    let now = chrono::Utc::now();
    if let Some(item) = existing {
        let merged = item.quantity + quantity;
        if merged > product.stock_quantity {
            return Err(Error::InsufficientStock {
                product_id,
                available: product.stock_quantity,
                requested: merged,
            });
        }
        let mut model: cart_item::ActiveModel = item.into();
        model.quantity = Set(merged);
        model.updated_at = Set(now);
        return Ok(model.update(db).await?);
    }

    if quantity > product.stock_quantity {
        return Err(Error::InsufficientStock {
            product_id,
            available: product.stock_quantity,
            requested: quantity,
        });
    }

    let model = cart_item::ActiveModel {
        user_id: Set(user_id),
        product_id: Set(product_id),
        quantity: Set(quantity),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    Ok(model.insert(db).await?)
}

/// Replaces the quantity of a cart line the user owns.
pub async fn update_cart_item(
    db: &DatabaseConnection,
    user_id: i64,
    item_id: i64,
    quantity: i32,
) -> Result<cart_item::Model> {
    validate_quantity(quantity)?;

    let item = CartItem::find_by_id(item_id)
        .filter(cart_item::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or(Error::CartItemNotFound { item_id })?;

    let product = catalog::get_active_product(db, item.product_id).await?;
    if quantity > product.stock_quantity {
        return Err(Error::InsufficientStock {
            product_id: product.id,
            available: product.stock_quantity,
            requested: quantity,
        });
    }

    let mut model: cart_item::ActiveModel = item.into();
    model.quantity = Set(quantity);
    model.updated_at = Set(chrono::Utc::now());
    Ok(model.update(db).await?)
}

/// Removes one line from the user's cart.
pub async fn remove_from_cart(db: &DatabaseConnection, user_id: i64, item_id: i64) -> Result<()> {
    let item = CartItem::find_by_id(item_id)
        .filter(cart_item::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or(Error::CartItemNotFound { item_id })?;

    item.delete(db).await?;
    Ok(())
}

/// Empties the user's cart.
pub async fn clear_cart(db: &DatabaseConnection, user_id: i64) -> Result<()> {
    CartItem::delete_many()
        .filter(cart_item::Column::UserId.eq(user_id))
        .exec(db)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::account::Principal;
    use crate::core::catalog::{ProductPatch, deactivate_product};
    use crate::test_utils::{create_test_product, create_test_user, setup_with_product};

    #[tokio::test]
    async fn test_add_to_cart_merges_quantities() -> Result<()> {
        let (db, user, product) = setup_with_product().await?;

        let first = add_to_cart(&db, user.id, product.id, 2).await?;
        let second = add_to_cart(&db, user.id, product.id, 3).await?;

        assert_eq!(first.id, second.id);
        assert_eq!(second.quantity, 5);
        assert_eq!(cart_count(&db, user.id).await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_add_to_cart_checks_stock() -> Result<()> {
        let (db, user, product) = setup_with_product().await?;

        // Product has stock 10; a fresh add of 11 is refused
        let result = add_to_cart(&db, user.id, product.id, 11).await;
        assert!(matches!(
            result,
            Err(Error::InsufficientStock {
                available: 10,
                requested: 11,
                ..
            })
        ));

        // 6 then 5 would merge to 11, also refused
        add_to_cart(&db, user.id, product.id, 6).await?;
        let result = add_to_cart(&db, user.id, product.id, 5).await;
        assert!(matches!(
            result,
            Err(Error::InsufficientStock {
                requested: 11,
                ..
            })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_add_to_cart_rejects_inactive_product() -> Result<()> {
        let (db, user, product) = setup_with_product().await?;
        deactivate_product(&db, &Principal::admin(1), product.id).await?;

        let result = add_to_cart(&db, user.id, product.id, 1).await;
        assert!(matches!(result, Err(Error::ProductNotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_add_to_cart_rejects_bad_quantity() -> Result<()> {
        let (db, user, product) = setup_with_product().await?;

        let result = add_to_cart(&db, user.id, product.id, 0).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        let result = add_to_cart(&db, user.id, product.id, -2).await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_cart_item_scoped_to_owner() -> Result<()> {
        let (db, user, product) = setup_with_product().await?;
        let other = create_test_user(&db, "other").await?;
        let item = add_to_cart(&db, user.id, product.id, 2).await?;

        // Another user cannot see or edit the line
        let result = update_cart_item(&db, other.id, item.id, 1).await;
        assert!(matches!(result, Err(Error::CartItemNotFound { .. })));

        let updated = update_cart_item(&db, user.id, item.id, 4).await?;
        assert_eq!(updated.quantity, 4);

        let result = update_cart_item(&db, user.id, item.id, 99).await;
        assert!(matches!(result, Err(Error::InsufficientStock { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_remove_and_clear_cart() -> Result<()> {
        let (db, user, product) = setup_with_product().await?;
        let second = create_test_product(&db, "Another", 500, 5).await?;

        let item = add_to_cart(&db, user.id, product.id, 1).await?;
        add_to_cart(&db, user.id, second.id, 1).await?;

        remove_from_cart(&db, user.id, item.id).await?;
        assert_eq!(cart_count(&db, user.id).await?, 1);

        let result = remove_from_cart(&db, user.id, item.id).await;
        assert!(matches!(result, Err(Error::CartItemNotFound { .. })));

        clear_cart(&db, user.id).await?;
        assert_eq!(cart_count(&db, user.id).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_stock_patch_does_not_shrink_cart() -> Result<()> {
        // Lowering stock after an add leaves the cart line alone; checkout is
        // where the authoritative re-check happens.
        let (db, user, product) = setup_with_product().await?;
        add_to_cart(&db, user.id, product.id, 8).await?;

        crate::core::catalog::update_product(
            &db,
            &Principal::admin(1),
            product.id,
            ProductPatch {
                stock_quantity: Some(3),
                ..Default::default()
            },
        )
        .await?;

        let items = get_cart(&db, user.id).await?;
        assert_eq!(items[0].quantity, 8);
        Ok(())
    }
}
