//! PayCapture Web Server - Stripe webhook receiver.
//!
//! This binary provides the capture service entrypoint:
//! - Receives payment event webhooks from Stripe
//! - Verifies signatures and validates the payload
//! - Normalizes events and publishes them to RabbitMQ
//! - Responds 202 Accepted once the event is queued

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use tokio::{net::TcpListener, signal};
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use paycapture::web::{health, stripe_webhook, AppState};
use paycapture::{Config, Publisher};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    info!("web_server_starting");

    let config = Config::from_env();
    info!(
        port = config.port,
        queue = %config.queue_name,
        publish_timeout_ms = config.publish_timeout.as_millis() as u64,
        validate_signature = config.validate_signature,
        signing_secret_configured = config.signing_secret.is_some(),
        "config_loaded"
    );

    let publisher = Publisher::new(config.amqp_url.clone(), config.queue_name.clone());
    let port = config.port;
    let state = AppState::new(config, publisher.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "web_server_listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    publisher.close().await;

    info!("web_server_shutdown_complete");

    Ok(())
}

/// Structured JSON logging, filterable via `RUST_LOG`.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();
}

/// Assemble the application router.
///
/// `CatchPanicLayer` sits outermost so anything unforeseen in a handler
/// becomes a generic 500 instead of tearing down the connection.
fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/webhooks/stripe", post(stripe_webhook))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::new())
        .with_state(state)
}

/// Resolve once SIGINT or SIGTERM arrives.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler");

        tokio::select! {
            _ = signal::ctrl_c() => info!("sigint_received"),
            _ = sigterm.recv() => info!("sigterm_received"),
        }
    }

    #[cfg(not(unix))]
    {
        let _ = signal::ctrl_c().await;
        info!("sigint_received");
    }

    info!("web_server_shutting_down");
}
