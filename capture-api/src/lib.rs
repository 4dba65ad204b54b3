//! PayCapture - Stripe payment event capture service.
//!
//! This library backs the `paycapture-web` binary, which receives
//! payment event webhooks from Stripe, normalizes them into
//! [`PaymentEvent`] records and publishes them to RabbitMQ for
//! downstream consumers.
//!
//! ## Architecture
//!
//! ```text
//! Stripe webhook → Web Server → normalize → payment_events queue
//! ```

pub mod config;
pub mod event;
pub mod ingest;
pub mod normalize;
pub mod queue;
pub mod result;
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use event::{PaymentEvent, PaymentEventType, StripeEvent};
pub use ingest::{process_stripe_event, WebhookAck};
pub use normalize::normalize;
pub use queue::{EventPublisher, Publisher, PAYMENT_EVENTS_QUEUE};
pub use result::OperationResult;
pub use web::AppState;
