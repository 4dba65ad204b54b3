//! Queue module for RabbitMQ operations.
//!
//! This module provides:
//! - The `EventPublisher` capability trait the ingestion pipeline
//!   publishes through
//! - The `lapin`-backed `Publisher` implementation
//!
//! ## Architecture
//!
//! ```text
//! Web Server → payment_events queue → downstream consumers
//! ```

pub mod publisher;

use std::future::Future;
use std::time::Duration;

use crate::event::PaymentEvent;

pub use publisher::Publisher;

/// Default queue name for normalized payment events.
pub const PAYMENT_EVENTS_QUEUE: &str = "payment_events";

/// Capability to deliver a payment event to the queue transport.
///
/// The single operation publishes one event and reports the outcome:
/// `true` exactly when the transport acknowledged receipt. Implementations
/// log failures themselves and never surface them as errors, and must
/// honor the caller-supplied `timeout` so a wait cannot outlive it.
pub trait EventPublisher {
    fn publish(
        &self,
        event: &PaymentEvent,
        timeout: Duration,
    ) -> impl Future<Output = bool> + Send;
}
