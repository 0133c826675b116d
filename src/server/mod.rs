//! HTTP server receiving pull-request-merged webhooks.
//!
//! # Endpoints
//!
//! - `POST /` and `POST /webhook` - Accepts Bitbucket deliveries (returns 202 Accepted)
//! - `GET /health` - Returns 200 if the server is running
//!
//! Deliveries failing the token check never reach the queue.

use std::future::Future;
use std::sync::Arc;

use axum::http::StatusCode;
use tokio::net::TcpListener;
use tracing::info;

pub mod webhook;

pub use webhook::{token_matches, webhook_handler, WebhookError};

use crate::worker::EventSender;

/// Shared application state.
///
/// This is passed to all handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Shared secret expected in the `token` query parameter; empty disables the check.
    token: String,

    /// Producer side of the worker queue.
    events: EventSender,
}

impl AppState {
    pub fn new(token: impl Into<String>, events: EventSender) -> Self {
        AppState {
            inner: Arc::new(AppStateInner {
                token: token.into(),
                events,
            }),
        }
    }

    /// Returns the configured shared secret.
    pub fn token(&self) -> &str {
        &self.inner.token
    }

    /// Returns the queue sender.
    pub fn events(&self) -> &EventSender {
        &self.inner.events
    }
}

/// Liveness check; answers `ok` while the listener is up.
pub async fn health_handler() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

/// Builds the axum Router with all endpoints.
pub fn build_router(app_state: AppState) -> axum::Router {
    use axum::routing::{get, post};

    axum::Router::new()
        .route("/", post(webhook_handler))
        .route("/webhook", post(webhook_handler))
        .route("/health", get(health_handler))
        .with_state(app_state)
}

/// Serve the router on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, app_state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!(addr = %addr, "listening for webhooks");
    }
    axum::serve(listener, build_router(app_state))
        .with_graceful_shutdown(shutdown)
        .await
}
