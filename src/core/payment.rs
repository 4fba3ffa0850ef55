//! Payment boundary - intent gateway and webhook reconciler.
//!
//! The external provider is reached through the [`PaymentProvider`] trait so
//! the storefront never links against a concrete SDK. Outbound: an intent is
//! created for a pending order and its reference persisted. Inbound: provider
//! events arrive over an at-least-once webhook, are authenticated with an
//! HMAC-SHA256 signature header, and are reconciled against the order ledger
//! through the terminal-state guard, which makes duplicates and late
//! contradictory events harmless.

use crate::{
    config::payments::PaymentConfig,
    entities::{Order, PaymentStatus, order},
    errors::{Error, Result},
};
use hmac::{Hmac, Mac};
use rust_decimal::prelude::ToPrimitive;
use sea_orm::{Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::{info, warn};

use super::order::{Applied, PaymentOutcome};

type HmacSha256 = Hmac<Sha256>;

/// Event type the provider sends when a charge succeeds.
pub const EVENT_PAYMENT_SUCCEEDED: &str = "payment_intent.succeeded";
/// Event type the provider sends when a charge fails.
pub const EVENT_PAYMENT_FAILED: &str = "payment_intent.payment_failed";

/// Request handed to the provider when creating an intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentRequest {
    /// Local order the charge is for
    pub order_id: i64,
    /// Owner of the order, passed through as provider metadata
    pub user_id: i64,
    /// Charge amount in minor units (cents)
    pub amount_minor: i64,
    /// ISO currency code
    pub currency: String,
}

/// What the provider returns for a created intent.
#[derive(Debug, Clone)]
pub struct IntentHandle {
    /// Provider-side identifier, stored on the order for reconciliation
    pub reference: String,
    /// Opaque secret the storefront's client uses to confirm the charge
    pub client_secret: String,
}

/// The external payment provider boundary.
///
/// Implementations wrap whatever SDK or HTTP client the deployment uses; tests
/// inject stubs. Errors are surfaced to callers as
/// [`Error::PaymentGateway`] and never swallowed.
#[async_trait::async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Creates a payment intent for the given amount.
    async fn create_intent(&self, request: IntentRequest) -> Result<IntentHandle>;
}

/// What the storefront client needs to take a payment for an order.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentIntent {
    /// Opaque secret for the client-side confirmation flow
    pub client_secret: String,
    /// Provider reference now stored on the order
    pub payment_reference: String,
}

fn to_minor_units(amount: Decimal) -> Result<i64> {
    (amount * Decimal::ONE_HUNDRED)
        .round()
        .to_i64()
        .ok_or_else(|| Error::Validation {
            message: format!("Order total out of range: {amount}"),
        })
}

/// Creates a payment intent for a pending order and persists its reference.
///
/// The order must exist and still have `payment_status == pending`. The
/// provider call is bounded by the configured gateway timeout; on provider
/// failure or timeout nothing local changes. The reference is written only
/// after the provider has answered, so an order is never left pointing at an
/// intent that was not created. Re-calling for an order that already holds a
/// reference overwrites it (logged at warn).
pub async fn create_payment_intent(
    db: &DatabaseConnection,
    provider: &dyn PaymentProvider,
    config: &PaymentConfig,
    order_id: i64,
) -> Result<PaymentIntent> {
    let order = Order::find_by_id(order_id)
        .one(db)
        .await?
        .ok_or(Error::OrderNotFound { order_id })?;
    if order.payment_status != PaymentStatus::Pending {
        return Err(Error::InvalidOrderState { order_id });
    }

    let request = IntentRequest {
        order_id,
        user_id: order.user_id,
        amount_minor: to_minor_units(order.total_amount)?,
        currency: config.currency.clone(),
    };

    let handle = match tokio::time::timeout(
        config.gateway_timeout,
        provider.create_intent(request),
    )
    .await
    {
        Ok(Ok(handle)) => handle,
        Ok(Err(e)) => {
            return Err(Error::PaymentGateway {
                message: e.to_string(),
            });
        }
        Err(_) => {
            return Err(Error::PaymentGateway {
                message: "Payment provider timed out".to_string(),
            });
        }
    };

    if let Some(previous) = &order.payment_reference {
        warn!(order_id, previous = %previous, "overwriting existing payment reference");
    }

    let mut model: order::ActiveModel = order.into();
    model.payment_reference = Set(Some(handle.reference.clone()));
    model.updated_at = Set(chrono::Utc::now());
    model.update(db).await?;

    info!(order_id, reference = %handle.reference, "payment intent created");
    Ok(PaymentIntent {
        client_secret: handle.client_secret,
        payment_reference: handle.reference,
    })
}

/// How an authenticated webhook event was disposed of.
///
/// Every variant acknowledges the event; only signature failures reject it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// A recognized outcome was applied to an order
    Applied {
        /// The order that transitioned
        order_id: i64,
    },
    /// The order was already in a terminal payment state; replay ignored
    AlreadyFinal {
        /// The order the event referenced
        order_id: i64,
    },
    /// No order carries the referenced payment intent
    UnknownReference,
    /// The event type is not one the storefront reacts to
    Ignored,
}

/// The acknowledgement body the webhook endpoint answers with.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookAck {
    /// Always `"success"`
    pub status: &'static str,
}

impl WebhookOutcome {
    /// The acknowledgement the provider expects for a handled event.
    #[must_use]
    pub const fn ack(&self) -> WebhookAck {
        WebhookAck { status: "success" }
    }
}

/// First-pass parse: only the event type. Unrecognized types are acknowledged
/// without ever inspecting the rest of the payload, whatever its shape.
#[derive(Debug, Deserialize)]
struct WebhookEnvelope {
    #[serde(rename = "type")]
    event_type: String,
}

#[derive(Debug, Deserialize)]
struct WebhookEvent {
    data: WebhookData,
}

#[derive(Debug, Deserialize)]
struct WebhookData {
    object: WebhookObject,
}

#[derive(Debug, Deserialize)]
struct WebhookObject {
    id: String,
}

fn signature_error(reason: &str) -> Error {
    Error::SignatureVerification {
        reason: reason.to_string(),
    }
}

/// Verifies the provider's `t=<unix>,v1=<hex>` signature header.
///
/// The signed payload is `"{t}.{raw body}"` and the MAC is HMAC-SHA256 under
/// the shared webhook secret. Any `v1` entry may match. No timestamp freshness
/// window is enforced: delivery is at-least-once and replays must be accepted
/// here so the ledger's terminal-state guard can discard them.
pub fn verify_signature(secret: &str, payload: &[u8], signature_header: &str) -> Result<()> {
    let mut timestamp = None;
    let mut candidates = Vec::new();
    for part in signature_header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            return Err(signature_error("malformed signature header"));
        };
        match key {
            "t" => timestamp = Some(value),
            "v1" => candidates.push(value),
            _ => {}
        }
    }
    let timestamp = timestamp.ok_or_else(|| signature_error("missing timestamp"))?;
    if candidates.is_empty() {
        return Err(signature_error("missing v1 signature"));
    }

    for candidate in candidates {
        let Ok(candidate) = hex::decode(candidate) else {
            continue;
        };
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|_| signature_error("invalid secret"))?;
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(payload);
        // verify_slice is constant-time
        if mac.verify_slice(&candidate).is_ok() {
            return Ok(());
        }
    }

    Err(signature_error("signature mismatch"))
}

/// Handles one inbound payment-provider event.
///
/// Contract: authenticate first, then never fail. Signature problems (including
/// an unparseable body) are the only error path; unrecognized event types and
/// references that match no order are acknowledged as success so the provider
/// stops retrying an event this system has already effectively handled or can
/// never handle. Recognized outcomes are applied in one transaction under the
/// ledger's terminal-state guard, which is what makes redelivery idempotent.
pub async fn handle_payment_event(
    db: &DatabaseConnection,
    config: &PaymentConfig,
    payload: &[u8],
    signature_header: &str,
) -> Result<WebhookOutcome> {
    verify_signature(&config.webhook_secret, payload, signature_header)?;

    let envelope: WebhookEnvelope = serde_json::from_slice(payload)
        .map_err(|e| signature_error(&format!("invalid payload: {e}")))?;

    let outcome = match envelope.event_type.as_str() {
        EVENT_PAYMENT_SUCCEEDED => PaymentOutcome::Succeeded,
        EVENT_PAYMENT_FAILED => PaymentOutcome::Failed,
        other => {
            info!(event_type = other, "ignoring unhandled webhook event type");
            return Ok(WebhookOutcome::Ignored);
        }
    };

    let event: WebhookEvent = serde_json::from_slice(payload)
        .map_err(|e| signature_error(&format!("invalid payload: {e}")))?;
    let reference = event.data.object.id.as_str();
    let txn = db.begin().await?;

    let Some(order) = Order::find()
        .filter(order::Column::PaymentReference.eq(reference))
        .one(&txn)
        .await?
    else {
        warn!(reference, "no order found for payment reference");
        return Ok(WebhookOutcome::UnknownReference);
    };
    let order_id = order.id;

    let applied = crate::core::order::apply_payment_outcome(&txn, order, outcome).await?;
    txn.commit().await?;

    match applied {
        Applied::Updated(_) => {
            info!(order_id, ?outcome, "payment outcome applied");
            Ok(WebhookOutcome::Applied { order_id })
        }
        Applied::AlreadyFinal(_) => {
            info!(order_id, ?outcome, "payment already settled, event ignored");
            Ok(WebhookOutcome::AlreadyFinal { order_id })
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::entities::OrderStatus;
    use crate::test_utils::{place_test_order, setup_with_product};
    use std::time::Duration;

    struct StubProvider {
        reference: String,
        fail: bool,
        delay: Option<Duration>,
    }

    impl StubProvider {
        fn returning(reference: &str) -> Self {
            Self {
                reference: reference.to_string(),
                fail: false,
                delay: None,
            }
        }
    }

    #[async_trait::async_trait]
    impl PaymentProvider for StubProvider {
        async fn create_intent(&self, request: IntentRequest) -> Result<IntentHandle> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                return Err(Error::PaymentGateway {
                    message: "card network unavailable".to_string(),
                });
            }
            Ok(IntentHandle {
                reference: self.reference.clone(),
                client_secret: format!("secret_for_{}", request.order_id),
            })
        }
    }

    fn test_config() -> PaymentConfig {
        PaymentConfig::new("whsec_test").unwrap()
    }

    fn sign(secret: &str, timestamp: &str, payload: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(payload);
        format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
    }

    fn success_event(reference: &str) -> Vec<u8> {
        serde_json::json!({
            "type": EVENT_PAYMENT_SUCCEEDED,
            "data": { "object": { "id": reference } }
        })
        .to_string()
        .into_bytes()
    }

    fn failure_event(reference: &str) -> Vec<u8> {
        serde_json::json!({
            "type": EVENT_PAYMENT_FAILED,
            "data": { "object": { "id": reference } }
        })
        .to_string()
        .into_bytes()
    }

    #[tokio::test]
    async fn test_create_payment_intent_persists_reference() -> Result<()> {
        let (db, user, product) = setup_with_product().await?;
        let placed = place_test_order(&db, user.id, product.id, 2).await?;
        let provider = StubProvider::returning("pi_123");

        let intent =
            create_payment_intent(&db, &provider, &test_config(), placed.order.id).await?;
        assert_eq!(intent.payment_reference, "pi_123");
        assert_eq!(intent.client_secret, format!("secret_for_{}", placed.order.id));

        let reloaded = Order::find_by_id(placed.order.id).one(&db).await?.unwrap();
        assert_eq!(reloaded.payment_reference.as_deref(), Some("pi_123"));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_payment_intent_converts_to_minor_units() -> Result<()> {
        let (db, user, product) = setup_with_product().await?;
        // 2 x 10.00 = 20.00 -> 2000 cents
        let placed = place_test_order(&db, user.id, product.id, 2).await?;

        struct Capture;
        #[async_trait::async_trait]
        impl PaymentProvider for Capture {
            async fn create_intent(&self, request: IntentRequest) -> Result<IntentHandle> {
                assert_eq!(request.amount_minor, 2000);
                assert_eq!(request.currency, "usd");
                Ok(IntentHandle {
                    reference: "pi_cap".to_string(),
                    client_secret: "cs".to_string(),
                })
            }
        }

        create_payment_intent(&db, &Capture, &test_config(), placed.order.id).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_create_payment_intent_requires_pending() -> Result<()> {
        let (db, user, product) = setup_with_product().await?;
        let placed = place_test_order(&db, user.id, product.id, 1).await?;
        let provider = StubProvider::returning("pi_123");
        let config = test_config();

        crate::core::order::apply_payment_outcome(
            &db,
            placed.order.clone(),
            PaymentOutcome::Succeeded,
        )
        .await?;

        let result = create_payment_intent(&db, &provider, &config, placed.order.id).await;
        assert!(matches!(result, Err(Error::InvalidOrderState { .. })));

        let result = create_payment_intent(&db, &provider, &config, 999).await;
        assert!(matches!(result, Err(Error::OrderNotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_payment_intent_provider_failure_leaves_order_alone() -> Result<()> {
        let (db, user, product) = setup_with_product().await?;
        let placed = place_test_order(&db, user.id, product.id, 1).await?;
        let provider = StubProvider {
            reference: "pi_123".to_string(),
            fail: true,
            delay: None,
        };

        let result = create_payment_intent(&db, &provider, &test_config(), placed.order.id).await;
        assert!(matches!(result, Err(Error::PaymentGateway { .. })));

        let reloaded = Order::find_by_id(placed.order.id).one(&db).await?.unwrap();
        assert!(reloaded.payment_reference.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_create_payment_intent_times_out() -> Result<()> {
        let (db, user, product) = setup_with_product().await?;
        let placed = place_test_order(&db, user.id, product.id, 1).await?;
        let provider = StubProvider {
            reference: "pi_123".to_string(),
            fail: false,
            delay: Some(Duration::from_millis(50)),
        };
        let mut config = test_config();
        config.gateway_timeout = Duration::from_millis(5);

        let result = create_payment_intent(&db, &provider, &config, placed.order.id).await;
        assert!(matches!(result, Err(Error::PaymentGateway { .. })));
        Ok(())
    }

    #[test]
    fn test_verify_signature_accepts_valid_and_rejects_tampered() {
        let payload = br#"{"type":"x"}"#;
        let header = sign("whsec_test", "1700000000", payload);

        assert!(verify_signature("whsec_test", payload, &header).is_ok());
        assert!(verify_signature("whsec_other", payload, &header).is_err());
        assert!(verify_signature("whsec_test", b"{\"type\":\"y\"}", &header).is_err());
        assert!(verify_signature("whsec_test", payload, "t=1700000000").is_err());
        assert!(verify_signature("whsec_test", payload, "v1=aaaa").is_err());
        assert!(verify_signature("whsec_test", payload, "not a header").is_err());
    }

    #[tokio::test]
    async fn test_webhook_success_event_transitions_order() -> Result<()> {
        let (db, user, product) = setup_with_product().await?;
        let placed = place_test_order(&db, user.id, product.id, 1).await?;
        let provider = StubProvider::returning("pi_123");
        let config = test_config();
        create_payment_intent(&db, &provider, &config, placed.order.id).await?;

        let payload = success_event("pi_123");
        let header = sign(&config.webhook_secret, "1700000000", &payload);
        let outcome = handle_payment_event(&db, &config, &payload, &header).await?;
        assert_eq!(
            outcome,
            WebhookOutcome::Applied {
                order_id: placed.order.id
            }
        );
        assert_eq!(outcome.ack().status, "success");

        let reloaded = Order::find_by_id(placed.order.id).one(&db).await?.unwrap();
        assert_eq!(reloaded.payment_status, PaymentStatus::Completed);
        assert_eq!(reloaded.status, OrderStatus::Processing);
        Ok(())
    }

    #[tokio::test]
    async fn test_webhook_replay_is_noop() -> Result<()> {
        let (db, user, product) = setup_with_product().await?;
        let placed = place_test_order(&db, user.id, product.id, 1).await?;
        let provider = StubProvider::returning("pi_123");
        let config = test_config();
        create_payment_intent(&db, &provider, &config, placed.order.id).await?;

        let payload = success_event("pi_123");
        let header = sign(&config.webhook_secret, "1700000000", &payload);
        handle_payment_event(&db, &config, &payload, &header).await?;
        let replay = handle_payment_event(&db, &config, &payload, &header).await?;
        assert_eq!(
            replay,
            WebhookOutcome::AlreadyFinal {
                order_id: placed.order.id
            }
        );

        let reloaded = Order::find_by_id(placed.order.id).one(&db).await?.unwrap();
        assert_eq!(reloaded.payment_status, PaymentStatus::Completed);
        Ok(())
    }

    #[tokio::test]
    async fn test_webhook_late_failure_after_success_ignored() -> Result<()> {
        let (db, user, product) = setup_with_product().await?;
        let placed = place_test_order(&db, user.id, product.id, 1).await?;
        let provider = StubProvider::returning("pi_123");
        let config = test_config();
        create_payment_intent(&db, &provider, &config, placed.order.id).await?;

        let success = success_event("pi_123");
        let header = sign(&config.webhook_secret, "1700000000", &success);
        handle_payment_event(&db, &config, &success, &header).await?;

        // An out-of-order failure event for a settled order changes nothing
        let failure = failure_event("pi_123");
        let header = sign(&config.webhook_secret, "1700000001", &failure);
        let outcome = handle_payment_event(&db, &config, &failure, &header).await?;
        assert_eq!(
            outcome,
            WebhookOutcome::AlreadyFinal {
                order_id: placed.order.id
            }
        );

        let reloaded = Order::find_by_id(placed.order.id).one(&db).await?.unwrap();
        assert_eq!(reloaded.payment_status, PaymentStatus::Completed);
        assert_eq!(reloaded.status, OrderStatus::Processing);
        Ok(())
    }

    #[tokio::test]
    async fn test_webhook_failure_event_cancels_order() -> Result<()> {
        let (db, user, product) = setup_with_product().await?;
        let placed = place_test_order(&db, user.id, product.id, 1).await?;
        let provider = StubProvider::returning("pi_123");
        let config = test_config();
        create_payment_intent(&db, &provider, &config, placed.order.id).await?;

        let payload = failure_event("pi_123");
        let header = sign(&config.webhook_secret, "1700000000", &payload);
        handle_payment_event(&db, &config, &payload, &header).await?;

        let reloaded = Order::find_by_id(placed.order.id).one(&db).await?.unwrap();
        assert_eq!(reloaded.payment_status, PaymentStatus::Failed);
        assert_eq!(reloaded.status, OrderStatus::Cancelled);
        Ok(())
    }

    #[tokio::test]
    async fn test_webhook_invalid_signature_mutates_nothing() -> Result<()> {
        let (db, user, product) = setup_with_product().await?;
        let placed = place_test_order(&db, user.id, product.id, 1).await?;
        let provider = StubProvider::returning("pi_123");
        let config = test_config();
        create_payment_intent(&db, &provider, &config, placed.order.id).await?;

        let payload = success_event("pi_123");
        let header = sign("whsec_wrong", "1700000000", &payload);
        let result = handle_payment_event(&db, &config, &payload, &header).await;
        assert!(matches!(result, Err(Error::SignatureVerification { .. })));

        let reloaded = Order::find_by_id(placed.order.id).one(&db).await?.unwrap();
        assert_eq!(reloaded.payment_status, PaymentStatus::Pending);
        Ok(())
    }

    #[tokio::test]
    async fn test_webhook_unknown_reference_acknowledged() -> Result<()> {
        let (db, _user, _product) = setup_with_product().await?;
        let config = test_config();

        let payload = success_event("pi_never_seen");
        let header = sign(&config.webhook_secret, "1700000000", &payload);
        let outcome = handle_payment_event(&db, &config, &payload, &header).await?;
        assert_eq!(outcome, WebhookOutcome::UnknownReference);
        Ok(())
    }

    #[tokio::test]
    async fn test_webhook_unknown_event_type_acknowledged() -> Result<()> {
        let (db, _user, _product) = setup_with_product().await?;
        let config = test_config();

        // A shape the storefront has never seen, with no intent object at all
        let payload = serde_json::json!({
            "type": "charge.refund.updated",
            "data": { "refund": { "amount": 150 } }
        })
        .to_string()
        .into_bytes();
        let header = sign(&config.webhook_secret, "1700000000", &payload);
        let outcome = handle_payment_event(&db, &config, &payload, &header).await?;
        assert_eq!(outcome, WebhookOutcome::Ignored);
        Ok(())
    }

    #[tokio::test]
    async fn test_webhook_malformed_body_rejected() -> Result<()> {
        let (db, _user, _product) = setup_with_product().await?;
        let config = test_config();

        let payload = b"not json at all".to_vec();
        let header = sign(&config.webhook_secret, "1700000000", &payload);
        let result = handle_payment_event(&db, &config, &payload, &header).await;
        assert!(matches!(result, Err(Error::SignatureVerification { .. })));
        Ok(())
    }
}
