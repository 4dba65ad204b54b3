//! Normalization of raw Stripe notifications into payment events.
//!
//! Normalization is a pure transformation with no failure mode: unknown
//! event categories map to `PaymentEventType::Unknown`, and each optional
//! field is extracted independently so one malformed value never aborts
//! the rest.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::warn;
use uuid::Uuid;

use crate::event::{PaymentEvent, PaymentEventType, StripeEvent};

/// Normalize a raw Stripe notification into a `PaymentEvent`.
///
/// The caller is responsible for having validated that `id` and `type`
/// are non-empty; everything past that degrades gracefully instead of
/// erroring.
pub fn normalize(event: &StripeEvent) -> PaymentEvent {
    // The generic `id` key inside `data` means "charge id" only for
    // charge.* events; for other categories it refers to a different
    // resource and is left alone.
    let charge_id = if event.event_type.starts_with("charge.") {
        string_field(&event.data, "id")
    } else {
        None
    };

    PaymentEvent {
        id: Uuid::new_v4(),
        created_at: Utc::now(),
        stripe_event_id: event.id.clone(),
        event_type: PaymentEventType::from_stripe(&event.event_type),
        event_timestamp: timestamp_from_unix(event.created),
        payload_json: Value::Object(event.data.clone()).to_string(),
        is_live_mode: event.livemode,
        customer_id: string_field(&event.data, "customer"),
        amount: amount_major_units(&event.data),
        currency: string_field(&event.data, "currency").map(|c| c.to_uppercase()),
        payment_intent_id: string_field(&event.data, "payment_intent"),
        charge_id,
    }
}

/// Convert Unix seconds to a UTC instant.
///
/// Out-of-range values collapse to the epoch; normalization must not
/// fail on attacker-controlled input.
fn timestamp_from_unix(seconds: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(seconds, 0).unwrap_or_else(|| {
        warn!(seconds, "event_timestamp_out_of_range");
        DateTime::UNIX_EPOCH
    })
}

/// Extract a string value from the untyped payload.
fn string_field(data: &Map<String, Value>, key: &str) -> Option<String> {
    match data.get(key) {
        Some(Value::String(s)) => Some(s.clone()),
        _ => None,
    }
}

/// Extract the monetary amount in major currency units.
///
/// Stripe reports amounts in minor units (cents); a value that parses as
/// an integer is divided by 100. Anything else leaves the amount unset.
fn amount_major_units(data: &Map<String, Value>) -> Option<f64> {
    let minor = match data.get("amount") {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    }?;

    Some(minor as f64 / 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event_with_data(event_type: &str, data: Value) -> StripeEvent {
        StripeEvent {
            id: "evt_1".to_string(),
            event_type: event_type.to_string(),
            created: 1_700_000_000,
            livemode: false,
            data: data.as_object().unwrap().clone(),
        }
    }

    #[test]
    fn test_normalize_known_event_type() {
        let event = event_with_data("charge.succeeded", json!({}));

        let normalized = normalize(&event);

        assert_eq!(normalized.event_type, PaymentEventType::ChargeSucceeded);
        assert_eq!(normalized.stripe_event_id, "evt_1");
    }

    #[test]
    fn test_normalize_unknown_event_type_does_not_fail() {
        let event = event_with_data("invoice.payment_succeeded", json!({"id": "in_1"}));

        let normalized = normalize(&event);

        assert_eq!(normalized.event_type, PaymentEventType::Unknown);
    }

    #[test]
    fn test_amount_minor_units_divided_by_100() {
        let event = event_with_data("charge.succeeded", json!({"amount": 1050}));

        assert_eq!(normalize(&event).amount, Some(10.5));
    }

    #[test]
    fn test_amount_integer_string_accepted() {
        let event = event_with_data("charge.succeeded", json!({"amount": "1050"}));

        assert_eq!(normalize(&event).amount, Some(10.5));
    }

    #[test]
    fn test_amount_non_numeric_left_unset() {
        for bad in [json!("ten"), json!(10.5), json!(true), json!(null), json!({})] {
            let event = event_with_data("charge.succeeded", json!({ "amount": bad }));
            assert_eq!(normalize(&event).amount, None);
        }
    }

    #[test]
    fn test_amount_missing_left_unset() {
        let event = event_with_data("charge.succeeded", json!({}));

        assert_eq!(normalize(&event).amount, None);
    }

    #[test]
    fn test_currency_uppercased() {
        let event = event_with_data("charge.succeeded", json!({"currency": "usd"}));

        assert_eq!(normalize(&event).currency.as_deref(), Some("USD"));
    }

    #[test]
    fn test_currency_missing_left_unset() {
        let event = event_with_data("charge.succeeded", json!({}));

        assert_eq!(normalize(&event).currency, None);
    }

    #[test]
    fn test_charge_id_populated_for_charge_events() {
        let event = event_with_data("charge.refunded", json!({"id": "ch_1"}));

        assert_eq!(normalize(&event).charge_id.as_deref(), Some("ch_1"));
    }

    #[test]
    fn test_charge_id_not_populated_for_other_events() {
        let event = event_with_data("customer.created", json!({"id": "ch_1"}));

        assert_eq!(normalize(&event).charge_id, None);
    }

    #[test]
    fn test_customer_and_payment_intent_extraction() {
        let event = event_with_data(
            "payment_intent.succeeded",
            json!({"customer": "cus_1", "payment_intent": "pi_1"}),
        );

        let normalized = normalize(&event);

        assert_eq!(normalized.customer_id.as_deref(), Some("cus_1"));
        assert_eq!(normalized.payment_intent_id.as_deref(), Some("pi_1"));
    }

    #[test]
    fn test_null_field_left_unset() {
        let event = event_with_data("charge.succeeded", json!({"customer": null}));

        assert_eq!(normalize(&event).customer_id, None);
    }

    #[test]
    fn test_one_bad_field_does_not_abort_the_others() {
        let event = event_with_data(
            "charge.succeeded",
            json!({"amount": "not-a-number", "currency": "eur", "customer": "cus_2"}),
        );

        let normalized = normalize(&event);

        assert_eq!(normalized.amount, None);
        assert_eq!(normalized.currency.as_deref(), Some("EUR"));
        assert_eq!(normalized.customer_id.as_deref(), Some("cus_2"));
    }

    #[test]
    fn test_event_timestamp_from_unix_seconds() {
        let event = event_with_data("charge.succeeded", json!({}));

        let normalized = normalize(&event);

        assert_eq!(normalized.event_timestamp.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_event_timestamp_out_of_range_collapses_to_epoch() {
        let mut event = event_with_data("charge.succeeded", json!({}));
        event.created = i64::MAX;

        let normalized = normalize(&event);

        assert_eq!(normalized.event_timestamp, DateTime::UNIX_EPOCH);
    }

    #[test]
    fn test_payload_json_retained_verbatim() {
        let data = json!({"id": "ch_1", "amount": 1050, "nested": {"key": "value"}});
        let event = event_with_data("charge.succeeded", data.clone());

        let normalized = normalize(&event);
        let parsed: Value = serde_json::from_str(&normalized.payload_json).unwrap();

        assert_eq!(parsed, data);
    }

    #[test]
    fn test_live_mode_carried_over() {
        let mut event = event_with_data("charge.succeeded", json!({}));
        event.livemode = true;

        assert!(normalize(&event).is_live_mode);
    }

    #[test]
    fn test_each_normalization_gets_a_fresh_internal_id() {
        let event = event_with_data("charge.succeeded", json!({}));

        let first = normalize(&event);
        let second = normalize(&event);

        assert_ne!(first.id, second.id);
    }
}
