//! Authenticated principal and user administration.
//!
//! Signup, login, and token issuance happen in the external identity service;
//! by the time a request reaches this crate it has been resolved to a
//! [`Principal`] carrying the user id and role. Operations that §6-style admin
//! endpoints expose take the principal explicitly and enforce role or ownership
//! before touching data.

use crate::{
    entities::{Role, User, user},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};

/// The authenticated caller of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    /// Id of the authenticated user
    pub user_id: i64,
    /// Role attribute resolved by the identity service
    pub role: Role,
}

impl Principal {
    /// A customer principal.
    #[must_use]
    pub const fn customer(user_id: i64) -> Self {
        Self {
            user_id,
            role: Role::Customer,
        }
    }

    /// An admin principal.
    #[must_use]
    pub const fn admin(user_id: i64) -> Self {
        Self {
            user_id,
            role: Role::Admin,
        }
    }

    /// Whether the caller carries the admin role.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }

    /// Fails with `Forbidden` unless the caller is an admin.
    pub const fn require_admin(&self) -> Result<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(Error::Forbidden)
        }
    }

    /// Fails with `Forbidden` unless the caller owns the resource or is an admin.
    pub const fn require_owner_or_admin(&self, owner_id: i64) -> Result<()> {
        if self.user_id == owner_id || self.is_admin() {
            Ok(())
        } else {
            Err(Error::Forbidden)
        }
    }
}

/// Lists every account, newest first (admin only).
pub async fn list_users(db: &DatabaseConnection, principal: &Principal) -> Result<Vec<user::Model>> {
    principal.require_admin()?;
    User::find()
        .order_by_desc(user::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Activates or deactivates an account (admin only).
///
/// Deactivation is the storefront's only user-level kill switch; the account
/// row and its order history are preserved.
pub async fn set_user_active(
    db: &DatabaseConnection,
    principal: &Principal,
    user_id: i64,
    active: bool,
) -> Result<user::Model> {
    principal.require_admin()?;

    let user = User::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or(Error::UserNotFound { user_id })?;

    let mut model: user::ActiveModel = user.into();
    model.is_active = Set(active);
    model.update(db).await.map_err(Into::into)
}
