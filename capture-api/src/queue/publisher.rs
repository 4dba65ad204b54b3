//! Async RabbitMQ publisher for normalized payment events.
//!
//! The publisher keeps one lazily-established connection and channel,
//! shared by clone across concurrent request handlers, and reconnects
//! when the broker drops it. Publisher confirms are enabled so a publish
//! only counts as delivered once the broker acknowledges it.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use lapin::{
    options::{BasicPublishOptions, ConfirmSelectOptions, QueueDeclareOptions},
    types::{AMQPValue, FieldTable},
    BasicProperties, Channel, Connection, ConnectionProperties,
};
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use super::EventPublisher;
use crate::event::PaymentEvent;

/// RabbitMQ-backed publisher.
///
/// Holds only immutable configuration besides the connection cell; the
/// locking below is internal and never spans a publish await.
#[derive(Clone)]
pub struct Publisher {
    inner: Arc<PublisherInner>,
}

struct PublisherInner {
    url: String,
    queue: String,
    connection: RwLock<Option<Connection>>,
    channel: RwLock<Option<Channel>>,
}

impl Publisher {
    /// Create a new publisher for the given RabbitMQ URL and queue.
    pub fn new(url: String, queue: String) -> Self {
        Self {
            inner: Arc::new(PublisherInner {
                url,
                queue,
                connection: RwLock::new(None),
                channel: RwLock::new(None),
            }),
        }
    }

    /// Clone of the current channel, if it is still connected.
    async fn live_channel(&self) -> Option<Channel> {
        let channel = self.inner.channel.read().await;
        channel
            .as_ref()
            .filter(|ch| ch.status().connected())
            .cloned()
    }

    /// Return a live channel, reconnecting if the broker dropped us.
    async fn ensure_connected(&self) -> Result<Channel> {
        if let Some(ch) = self.live_channel().await {
            return Ok(ch);
        }

        let mut connection = self.inner.connection.write().await;
        let mut channel = self.inner.channel.write().await;

        // Another task may have reconnected while we waited for the lock
        if let Some(ch) = channel.as_ref().filter(|ch| ch.status().connected()) {
            return Ok(ch.clone());
        }

        info!("rabbitmq_publisher_connecting");

        let conn = Connection::connect(&self.inner.url, ConnectionProperties::default())
            .await
            .context("Failed to connect to RabbitMQ")?;

        let ch = conn
            .create_channel()
            .await
            .context("Failed to create channel")?;

        // Delivery only counts once the broker acks it
        ch.confirm_select(ConfirmSelectOptions::default())
            .await
            .context("Failed to enable publisher confirms")?;

        // Idempotent; durable so queued events survive a broker restart
        ch.queue_declare(
            &self.inner.queue,
            QueueDeclareOptions {
                durable: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await
        .context("Failed to declare payment events queue")?;

        info!(queue = %self.inner.queue, "rabbitmq_publisher_ready");

        *connection = Some(conn);
        *channel = Some(ch.clone());

        Ok(ch)
    }

    /// Serialize and send one event, returning whether the broker acked.
    async fn send(&self, event: &PaymentEvent) -> Result<bool> {
        let channel = self.ensure_connected().await?;

        let body = serde_json::to_vec(event).context("Failed to serialize payment event")?;

        let confirmation = channel
            .basic_publish(
                "",
                &self.inner.queue,
                BasicPublishOptions::default(),
                &body,
                BasicProperties::default()
                    .with_delivery_mode(2) // Persistent
                    .with_content_type("application/json".into())
                    .with_message_id(event.id.to_string().into())
                    .with_headers(message_attributes(event)),
            )
            .await
            .context("Failed to publish to payment events queue")?
            .await
            .context("Failed to confirm publish")?;

        Ok(confirmation.is_ack())
    }

    /// Close the channel and connection gracefully.
    pub async fn close(&self) {
        let mut connection = self.inner.connection.write().await;
        let mut channel = self.inner.channel.write().await;

        if let Some(ch) = channel.take() {
            if let Err(e) = ch.close(200, "shutdown").await {
                warn!(error = %e, "rabbitmq_channel_close_error");
            }
        }

        if let Some(conn) = connection.take() {
            if let Err(e) = conn.close(200, "shutdown").await {
                warn!(error = %e, "rabbitmq_connection_close_error");
            }
        }

        info!("rabbitmq_publisher_closed");
    }
}

impl EventPublisher for Publisher {
    /// Publish one payment event and report the outcome.
    ///
    /// `true` exactly when the broker acknowledged the message. A nack,
    /// transport fault or elapsed timeout is logged and reported as
    /// `false`; nothing is retried and no error escapes.
    async fn publish(&self, event: &PaymentEvent, timeout: Duration) -> bool {
        info!(
            event_id = %event.id,
            stripe_event_id = %event.stripe_event_id,
            event_type = %event.event_type,
            queue = %self.inner.queue,
            "payment_event_publishing"
        );

        match tokio::time::timeout(timeout, self.send(event)).await {
            Ok(Ok(true)) => {
                info!(event_id = %event.id, "payment_event_published");
                true
            }
            Ok(Ok(false)) => {
                warn!(event_id = %event.id, "payment_event_nacked");
                false
            }
            Ok(Err(e)) => {
                error!(event_id = %event.id, error = %e, "payment_event_publish_failed");
                false
            }
            Err(_) => {
                error!(
                    event_id = %event.id,
                    timeout_ms = timeout.as_millis() as u64,
                    "payment_event_publish_timeout"
                );
                false
            }
        }
    }
}

/// Build the message attribute table attached alongside the body, so
/// queue-side filtering and routing never require deserializing it.
fn message_attributes(event: &PaymentEvent) -> FieldTable {
    let mut headers = FieldTable::default();
    headers.insert(
        "EventType".into(),
        AMQPValue::LongString(event.event_type.as_str().into()),
    );
    headers.insert(
        "EventId".into(),
        AMQPValue::LongString(event.id.to_string().into()),
    );
    headers.insert(
        "StripeEventId".into(),
        AMQPValue::LongString(event.stripe_event_id.as_str().into()),
    );
    headers
}
