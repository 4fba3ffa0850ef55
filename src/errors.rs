//! Unified error types for the storefront core.
//!
//! Every business-rule violation gets its own variant carrying the context a
//! caller needs to build a response. [`Error::http_status`] maps each variant to
//! the status code the hosting HTTP layer should answer with, so translation at
//! the boundary stays mechanical.

use thiserror::Error;

/// All error conditions surfaced by the storefront core.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration is missing or malformed
    #[error("Configuration error: {message}")]
    Config {
        /// What was wrong with the configuration
        message: String,
    },

    /// Underlying database failure
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Input failed shape or range validation
    #[error("Validation error: {message}")]
    Validation {
        /// What was invalid about the input
        message: String,
    },

    /// No active product with this id
    #[error("Product {product_id} not found")]
    ProductNotFound {
        /// The product id that was requested
        product_id: i64,
    },

    /// No active category with this id
    #[error("Category {category_id} not found")]
    CategoryNotFound {
        /// The category id that was requested
        category_id: i64,
    },

    /// No cart item with this id in the caller's cart
    #[error("Cart item {item_id} not found")]
    CartItemNotFound {
        /// The cart item id that was requested
        item_id: i64,
    },

    /// No order with this id visible to the caller
    #[error("Order {order_id} not found")]
    OrderNotFound {
        /// The order id that was requested
        order_id: i64,
    },

    /// No user with this id
    #[error("User {user_id} not found")]
    UserNotFound {
        /// The user id that was requested
        user_id: i64,
    },

    /// Checkout was attempted with no items in the cart
    #[error("Cart is empty")]
    EmptyCart,

    /// A cart item references a product that has been deactivated
    #[error("Product {product_id} is no longer available")]
    ProductUnavailable {
        /// The deactivated product
        product_id: i64,
    },

    /// Requested quantity exceeds what is in stock
    #[error(
        "Not enough stock for product {product_id}: available {available}, requested {requested}"
    )]
    InsufficientStock {
        /// The product that ran short
        product_id: i64,
        /// Units currently in stock
        available: i32,
        /// Units the caller asked for
        requested: i32,
    },

    /// A category cannot be deleted while products reference it
    #[error("Cannot delete category {category_id} with {product_count} products")]
    CategoryInUse {
        /// The category that was targeted
        category_id: i64,
        /// How many products still reference it
        product_count: u64,
    },

    /// A status string outside the enumerated order statuses
    #[error("Invalid status: {status}")]
    InvalidStatus {
        /// The unrecognized status string
        status: String,
    },

    /// The order is not in the payment state the operation requires
    #[error("Order {order_id} payment status is not pending")]
    InvalidOrderState {
        /// The order in the wrong state
        order_id: i64,
    },

    /// The principal lacks the role or ownership the operation requires
    #[error("Not enough permissions")]
    Forbidden,

    /// The external payment provider rejected the call or was unreachable
    #[error("Payment gateway error: {message}")]
    PaymentGateway {
        /// Provider-reported failure detail
        message: String,
    },

    /// Webhook payload could not be authenticated
    #[error("Webhook signature verification failed: {reason}")]
    SignatureVerification {
        /// Why verification failed
        reason: String,
    },
}

impl Error {
    /// HTTP status code the hosting layer should answer with for this error.
    ///
    /// Unexpected internals (`Config`, `Database`) map to 500 and are expected to
    /// be logged in full at the boundary and surfaced as a generic internal
    /// error, never with their detail.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::ProductNotFound { .. }
            | Self::CategoryNotFound { .. }
            | Self::CartItemNotFound { .. }
            | Self::OrderNotFound { .. }
            | Self::UserNotFound { .. } => 404,
            Self::Forbidden => 403,
            Self::PaymentGateway { .. } => 502,
            Self::Config { .. } | Self::Database(_) => 500,
            Self::Validation { .. }
            | Self::EmptyCart
            | Self::ProductUnavailable { .. }
            | Self::InsufficientStock { .. }
            | Self::CategoryInUse { .. }
            | Self::InvalidStatus { .. }
            | Self::InvalidOrderState { .. }
            | Self::SignatureVerification { .. } => 400,
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
