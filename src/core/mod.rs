//! Core business logic for the storefront.
//!
//! Each submodule owns one component: catalog and cart stores, checkout (the
//! order builder), the order ledger, the payment boundary (intent gateway and
//! webhook reconciler), account administration, and reporting. All functions
//! are async, framework-agnostic, and return the crate-wide `Result`.

/// Authenticated principal plus user administration
pub mod account;
/// Per-user mutable cart operations
pub mod cart;
/// Product and category store, including the guarded stock decrement
pub mod catalog;
/// Cart-to-order conversion with atomic stock decrement
pub mod checkout;
/// Order ledger queries and status transitions
pub mod order;
/// Payment intent gateway and webhook reconciler
pub mod payment;
/// Administrative store analytics
pub mod report;
