//! Web server module for handling inbound Stripe webhooks.
//!
//! This module provides a thin, fast web server that:
//! - Receives payment event webhooks from Stripe
//! - Verifies the webhook signature
//! - Hands validated events to the ingestion pipeline
//! - Responds 202 Accepted once the event is queued

pub mod handlers;
pub mod signature;

pub use handlers::{health, stripe_webhook, AppState, HealthResponse};
pub use signature::{
    is_signature_verification_enabled, verify_stripe_signature, SignatureError,
};
