//! Payment provider configuration.
//!
//! Credentials and limits for the external payment boundary are read from the
//! environment once and carried in an explicit [`PaymentConfig`] injected into
//! the intent gateway and the webhook reconciler. The shared webhook secret is
//! the only required value.

use crate::errors::{Error, Result};
use std::time::Duration;

const DEFAULT_CURRENCY: &str = "usd";
const DEFAULT_GATEWAY_TIMEOUT_SECS: u64 = 10;

/// Configuration for the payment provider boundary.
#[derive(Debug, Clone)]
pub struct PaymentConfig {
    /// Shared secret used to verify webhook signatures
    pub webhook_secret: String,
    /// ISO currency code sent with intent-creation requests
    pub currency: String,
    /// Upper bound on any single call to the external provider
    pub gateway_timeout: Duration,
}

impl PaymentConfig {
    /// Builds a configuration with defaults for everything but the secret.
    pub fn new(webhook_secret: impl Into<String>) -> Result<Self> {
        Self::build(webhook_secret.into(), None, None)
    }

    /// Loads the configuration from environment variables.
    ///
    /// Reads `PAYMENT_WEBHOOK_SECRET` (required), `PAYMENT_CURRENCY`, and
    /// `PAYMENT_GATEWAY_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self> {
        let secret = std::env::var("PAYMENT_WEBHOOK_SECRET").map_err(|_| Error::Config {
            message: "PAYMENT_WEBHOOK_SECRET is not set".to_string(),
        })?;
        Self::build(
            secret,
            std::env::var("PAYMENT_CURRENCY").ok(),
            std::env::var("PAYMENT_GATEWAY_TIMEOUT_SECS").ok(),
        )
    }

    fn build(
        webhook_secret: String,
        currency: Option<String>,
        timeout_secs: Option<String>,
    ) -> Result<Self> {
        if webhook_secret.trim().is_empty() {
            return Err(Error::Config {
                message: "Webhook secret cannot be empty".to_string(),
            });
        }

        let timeout_secs = match timeout_secs {
            Some(raw) => raw.parse::<u64>().map_err(|_| Error::Config {
                message: format!("Invalid PAYMENT_GATEWAY_TIMEOUT_SECS: {raw}"),
            })?,
            None => DEFAULT_GATEWAY_TIMEOUT_SECS,
        };

        Ok(Self {
            webhook_secret,
            currency: currency.unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            gateway_timeout: Duration::from_secs(timeout_secs),
        })
    }
}
