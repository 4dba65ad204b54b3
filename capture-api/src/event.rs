//! Domain types for Stripe payment events.
//!
//! This module defines:
//! - `StripeEvent`: the untrusted inbound webhook notification
//! - `PaymentEventType`: the closed set of recognized event categories
//! - `PaymentEvent`: the normalized record published to the queue

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

// =============================================================================
// Inbound Notification
// =============================================================================

/// Inbound Stripe webhook notification.
///
/// Every field is default-tolerant so that a structurally partial body
/// still deserializes; missing `id`/`type` are rejected by validation in
/// the ingestion pipeline, not by the JSON layer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StripeEvent {
    /// Processor-assigned notification identifier (e.g. `evt_...`)
    #[serde(default)]
    pub id: String,
    /// Dot-separated event category (e.g. `charge.refunded`)
    #[serde(default, rename = "type")]
    pub event_type: String,
    /// Unix seconds when the processor created the event
    #[serde(default)]
    pub created: i64,
    /// Whether the event originates from live mode
    #[serde(default)]
    pub livemode: bool,
    /// Untyped resource payload; keys vary per event category
    #[serde(default)]
    pub data: Map<String, Value>,
}

// =============================================================================
// Event Categories
// =============================================================================

/// Recognized payment event categories.
///
/// Categories outside this set normalize to `Unknown` rather than failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentEventType {
    Unknown,
    PaymentIntentSucceeded,
    PaymentIntentFailed,
    ChargeSucceeded,
    ChargeFailed,
    ChargeRefunded,
    PaymentMethodAttached,
    CustomerCreated,
    CustomerUpdated,
}

impl PaymentEventType {
    /// Map a raw Stripe `type` string onto the closed category set.
    ///
    /// Matching is exact and case-sensitive; anything else is `Unknown`.
    pub fn from_stripe(event_type: &str) -> Self {
        match event_type {
            "payment_intent.succeeded" => Self::PaymentIntentSucceeded,
            "payment_intent.payment_failed" => Self::PaymentIntentFailed,
            "charge.succeeded" => Self::ChargeSucceeded,
            "charge.failed" => Self::ChargeFailed,
            "charge.refunded" => Self::ChargeRefunded,
            "payment_method.attached" => Self::PaymentMethodAttached,
            "customer.created" => Self::CustomerCreated,
            "customer.updated" => Self::CustomerUpdated,
            _ => Self::Unknown,
        }
    }

    /// Stable string form, used for queue message attributes.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::PaymentIntentSucceeded => "PaymentIntentSucceeded",
            Self::PaymentIntentFailed => "PaymentIntentFailed",
            Self::ChargeSucceeded => "ChargeSucceeded",
            Self::ChargeFailed => "ChargeFailed",
            Self::ChargeRefunded => "ChargeRefunded",
            Self::PaymentMethodAttached => "PaymentMethodAttached",
            Self::CustomerCreated => "CustomerCreated",
            Self::CustomerUpdated => "CustomerUpdated",
        }
    }
}

impl fmt::Display for PaymentEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Normalized Event
// =============================================================================

/// Normalized payment event, immutable once constructed.
///
/// Serializes to compact camelCase JSON; unset optional fields are
/// omitted entirely instead of appearing as `null`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentEvent {
    /// System-generated identifier, distinct from the Stripe event id
    pub id: Uuid,
    /// Instant this record was created
    pub created_at: DateTime<Utc>,
    /// Processor-assigned notification identifier
    pub stripe_event_id: String,
    /// Normalized event category
    pub event_type: PaymentEventType,
    /// Instant the processor reported for the event
    pub event_timestamp: DateTime<Utc>,
    /// The raw `data` payload serialized verbatim, for consumers that
    /// need fields not promoted to first-class attributes
    pub payload_json: String,
    /// Whether the event originates from live mode
    pub is_live_mode: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    /// Monetary amount in major currency units
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    /// Uppercased ISO currency code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_intent_id: Option<String>,
    /// Charge identifier, only populated for `charge.*` events
    #[serde(skip_serializing_if = "Option::is_none")]
    pub charge_id: Option<String>,
}
