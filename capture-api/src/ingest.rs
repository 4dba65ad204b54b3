//! Webhook ingestion pipeline.
//!
//! Orchestrates one inbound Stripe notification end to end:
//! structural validation → signature gate → normalization → publish.
//! Every failure is reported through the returned `OperationResult`;
//! this module never raises.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::event::StripeEvent;
use crate::normalize::normalize;
use crate::queue::EventPublisher;
use crate::result::OperationResult;

/// Acknowledgement returned once a notification has been queued.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookAck {
    /// System-generated identifier of the normalized event
    pub event_id: Uuid,
    /// Stringified normalized event category
    pub event_type: String,
    /// Fixed status literal
    pub status: String,
    /// Instant the notification finished processing
    pub processed_at: DateTime<Utc>,
}

/// Process one Stripe webhook notification.
///
/// State machine, per request:
/// 1. Reject notifications with an empty `id` or `type`.
/// 2. Reject when signature validation is required and no header came.
/// 3. Normalize (never fails; unknown categories degrade to `Unknown`).
/// 4. Publish; a reported failure is final, nothing is retried here.
/// 5. Acknowledge.
///
/// The signature gate only checks header presence — cryptographic
/// verification happens in the web layer, which sees the raw body.
pub async fn process_stripe_event<P: EventPublisher>(
    event: &StripeEvent,
    signature_header: Option<&str>,
    config: &Config,
    publisher: &P,
) -> OperationResult<WebhookAck> {
    if event.id.is_empty() || event.event_type.is_empty() {
        warn!("stripe_event_missing_id_or_type");
        return OperationResult::error("Invalid event");
    }

    if config.validate_signature && signature_header.is_none() {
        warn!(event_id = %event.id, "stripe_signature_header_missing");
        return OperationResult::error("Signature not provided");
    }

    info!(
        event_id = %event.id,
        event_type = %event.event_type,
        live_mode = event.livemode,
        "stripe_event_processing"
    );

    let payment_event = normalize(event);

    if !publisher.publish(&payment_event, config.publish_timeout).await {
        error!(
            event_id = %event.id,
            internal_id = %payment_event.id,
            "stripe_event_publish_failed"
        );
        return OperationResult::error("Failed to publish event");
    }

    info!(
        event_id = %event.id,
        internal_id = %payment_event.id,
        event_type = %payment_event.event_type,
        "stripe_event_accepted"
    );

    OperationResult::success(WebhookAck {
        event_id: payment_event.id,
        event_type: payment_event.event_type.to_string(),
        status: "Accepted".to_string(),
        processed_at: Utc::now(),
    })
}
