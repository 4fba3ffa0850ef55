//! Configuration management.
//!
//! All configuration is carried in explicit structs built at startup and
//! injected into the operations that need them; nothing reads credentials from
//! module-level state.

/// Initial catalog seeding from catalog.toml
pub mod catalog;

/// Database configuration and connection management
pub mod database;

/// Payment provider credentials and limits from environment variables
pub mod payments;
