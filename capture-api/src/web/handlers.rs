//! Webhook endpoint handlers.
//!
//! These handlers are deliberately thin: they deserialize the body,
//! verify the signature when one is configured, and hand the event to
//! the ingestion pipeline. The pipeline owns validation, normalization
//! and publishing.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::Config;
use crate::event::StripeEvent;
use crate::ingest::{process_stripe_event, WebhookAck};
use crate::queue::Publisher;
use crate::result::OperationResult;
use crate::web::signature::{is_signature_verification_enabled, verify_stripe_signature};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub publisher: Publisher,
}

impl AppState {
    pub fn new(config: Config, publisher: Publisher) -> Self {
        Self {
            config: Arc::new(config),
            publisher,
        }
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub timestamp: DateTime<Utc>,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "Healthy",
        service: "paycapture-api",
        timestamp: Utc::now(),
    })
}

// =============================================================================
// Stripe Webhook
// =============================================================================

/// Stripe webhook endpoint.
///
/// The body arrives as a raw string because the signature is computed
/// over the exact bytes on the wire; deserialization happens after the
/// header is captured. Response mapping:
/// - 202 Accepted with the success payload once the event is queued
/// - 400 Bad Request for an invalid body, a rejected notification or a
///   publish failure
/// - 401 Unauthorized for a signature that fails verification
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, Json<OperationResult<WebhookAck>>) {
    let signature_header = headers
        .get("Stripe-Signature")
        .and_then(|v| v.to_str().ok());

    let event: StripeEvent = match serde_json::from_str(&body) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "stripe_webhook_body_invalid");
            return (
                StatusCode::BAD_REQUEST,
                Json(OperationResult::error("Invalid payload")),
            );
        }
    };

    info!(
        event_id = %event.id,
        event_type = %event.event_type,
        has_signature = signature_header.is_some(),
        "stripe_webhook_received"
    );

    // Verify the signature cryptographically when a secret is configured
    // and the provider sent one; presence of the header itself is
    // enforced by the ingestion pipeline.
    if is_signature_verification_enabled(&state.config.signing_secret) {
        let secret = state.config.signing_secret.as_ref().unwrap();
        if let Some(header) = signature_header {
            if let Err(e) =
                verify_stripe_signature(secret, header, &body, state.config.signature_max_age)
            {
                warn!(event_id = %event.id, error = %e, "stripe_signature_invalid");
                return (
                    StatusCode::UNAUTHORIZED,
                    Json(OperationResult::error("Invalid signature")),
                );
            }
        }
    }

    let result =
        process_stripe_event(&event, signature_header, &state.config, &state.publisher).await;

    if result.is_success {
        (StatusCode::ACCEPTED, Json(result))
    } else {
        warn!(
            event_id = %event.id,
            message = result.message.as_deref().unwrap_or_default(),
            "stripe_webhook_rejected"
        );
        (StatusCode::BAD_REQUEST, Json(result))
    }
}
