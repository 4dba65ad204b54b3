//! Stripe webhook signature verification.
//!
//! Stripe signs webhook requests with HMAC-SHA256 over
//! `"{timestamp}.{raw body}"` and sends the result in the
//! `Stripe-Signature` header as `t=<timestamp>,v1=<hex digest>`.
//! Reference: https://docs.stripe.com/webhooks/signature

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;

/// Reasons a `Stripe-Signature` header fails verification.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signature header is malformed")]
    Malformed,
    #[error("signature timestamp is outside the tolerance window")]
    Stale,
    #[error("signature does not match the payload")]
    Mismatch,
}

/// Verify a `Stripe-Signature` header against the raw request body.
///
/// # Arguments
///
/// * `signing_secret` - The webhook endpoint's signing secret (`whsec_...`)
/// * `header` - The raw `Stripe-Signature` header value
/// * `body` - The raw request body the signature was computed over
/// * `max_age_seconds` - Maximum allowed age of the timestamp (prevents
///   replay attacks)
pub fn verify_stripe_signature(
    signing_secret: &str,
    header: &str,
    body: &str,
    max_age_seconds: u64,
) -> Result<(), SignatureError> {
    let (timestamp, signature) =
        parse_signature_header(header).ok_or(SignatureError::Malformed)?;

    let webhook_time: u64 = timestamp.parse().map_err(|_| SignatureError::Malformed)?;

    let current_time = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();

    let age = current_time.abs_diff(webhook_time);
    if age > max_age_seconds {
        warn!(
            webhook_time,
            current_time,
            age_seconds = age,
            max_age_seconds,
            "stripe_signature_stale"
        );
        return Err(SignatureError::Stale);
    }

    // Expected signature: HMAC-SHA256(secret, "{timestamp}.{body}")
    let mut mac = HmacSha256::new_from_slice(signing_secret.as_bytes())
        .map_err(|_| SignatureError::Mismatch)?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(body.as_bytes());

    let expected = hex::encode(mac.finalize().into_bytes());

    if !constant_time_compare(&expected, &signature) {
        warn!(
            expected_length = expected.len(),
            actual_length = signature.len(),
            "stripe_signature_mismatch"
        );
        return Err(SignatureError::Mismatch);
    }

    Ok(())
}

/// Split a `t=<timestamp>,v1=<signature>` header into its components.
///
/// Unknown keys (such as the legacy `v0`) are ignored; both `t` and `v1`
/// must be present and non-empty.
fn parse_signature_header(header: &str) -> Option<(String, String)> {
    let mut timestamp = None;
    let mut signature = None;

    for part in header.split(',') {
        let (key, value) = part.split_once('=')?;
        match key.trim() {
            "t" => timestamp = Some(value.trim().to_string()),
            "v1" => signature = Some(value.trim().to_string()),
            _ => {}
        }
    }

    match (timestamp, signature) {
        (Some(t), Some(v1)) if !t.is_empty() && !v1.is_empty() => Some((t, v1)),
        _ => None,
    }
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

/// Check if signature verification is enabled.
pub fn is_signature_verification_enabled(signing_secret: &Option<String>) -> bool {
    signing_secret
        .as_ref()
        .map(|k| !k.trim().is_empty())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, timestamp: u64, body: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{}.{}", timestamp, body).as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    fn now() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs()
    }

    #[test]
    fn test_verify_signature_valid() {
        let secret = "whsec_test_secret";
        let body = r#"{"id":"evt_1","type":"charge.succeeded"}"#;
        let timestamp = now();
        let header = format!("t={},v1={}", timestamp, sign(secret, timestamp, body));

        assert_eq!(
            verify_stripe_signature(secret, &header, body, 300),
            Ok(())
        );
    }

    #[test]
    fn test_verify_signature_ignores_legacy_v0() {
        let secret = "whsec_test_secret";
        let body = "{}";
        let timestamp = now();
        let header = format!(
            "t={},v1={},v0=deadbeef",
            timestamp,
            sign(secret, timestamp, body)
        );

        assert_eq!(
            verify_stripe_signature(secret, &header, body, 300),
            Ok(())
        );
    }

    #[test]
    fn test_verify_signature_wrong_secret() {
        let body = "{}";
        let timestamp = now();
        let header = format!(
            "t={},v1={}",
            timestamp,
            sign("whsec_other_secret", timestamp, body)
        );

        assert_eq!(
            verify_stripe_signature("whsec_test_secret", &header, body, 300),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_verify_signature_tampered_body() {
        let secret = "whsec_test_secret";
        let timestamp = now();
        let header = format!("t={},v1={}", timestamp, sign(secret, timestamp, "{}"));

        assert_eq!(
            verify_stripe_signature(secret, &header, r#"{"amount":1}"#, 300),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_verify_signature_stale() {
        let secret = "whsec_test_secret";
        let body = "{}";
        // Year 2000, far outside any tolerance window
        let header = format!("t=946684800,v1={}", sign(secret, 946_684_800, body));

        assert_eq!(
            verify_stripe_signature(secret, &header, body, 300),
            Err(SignatureError::Stale)
        );
    }

    #[test]
    fn test_verify_signature_malformed_header() {
        for header in [
            "",
            "not-a-signature",
            "t=123",
            "v1=abcdef",
            "t=,v1=abcdef",
            "t=not-a-number,v1=abcdef",
        ] {
            assert_eq!(
                verify_stripe_signature("whsec_test_secret", header, "{}", 300),
                Err(SignatureError::Malformed),
                "header: {header:?}"
            );
        }
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc", "abc"));
        assert!(!constant_time_compare("abc", "abd"));
        assert!(!constant_time_compare("abc", "abcd"));
    }

    #[test]
    fn test_is_signature_verification_enabled() {
        assert!(!is_signature_verification_enabled(&None));
        assert!(!is_signature_verification_enabled(&Some("".to_string())));
        assert!(!is_signature_verification_enabled(&Some("   ".to_string())));
        assert!(is_signature_verification_enabled(&Some(
            "whsec_123".to_string()
        )));
    }
}
