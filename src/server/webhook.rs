//! Webhook endpoint handler.
//!
//! Accepts Bitbucket pull-request-merged deliveries, checks the shared
//! secret and queues them for the worker. Nothing here touches git or the
//! hosting API; the handler only waits when the queue is full.

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::AppState;
use crate::worker::{CascadeEvent, PullRequestPayload};

/// Header carrying the Bitbucket event type.
const HEADER_EVENT: &str = "x-event-key";

/// The only event type that triggers a cascade.
pub const FULFILLED_EVENT: &str = "pullrequest:fulfilled";

/// Errors that can occur when processing a webhook.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Missing or wrong `token` query parameter.
    #[error("invalid token")]
    InvalidToken,

    /// Invalid JSON body.
    #[error("invalid JSON body: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The worker has stopped.
    #[error("event queue is closed")]
    QueueClosed,
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = match &self {
            WebhookError::InvalidToken => StatusCode::UNAUTHORIZED,
            WebhookError::InvalidJson(_) => StatusCode::BAD_REQUEST,
            WebhookError::QueueClosed => StatusCode::SERVICE_UNAVAILABLE,
        };

        (status, self.to_string()).into_response()
    }
}

/// Query string of a webhook delivery.
#[derive(Debug, Default, Deserialize)]
pub struct WebhookQuery {
    #[serde(default)]
    pub token: Option<String>,
}

/// Webhook handler.
///
/// # Request
///
/// - Method: POST, on `/` or `/webhook`
/// - Query: `token=<shared secret>`
/// - Optional header `X-Event-Key`; anything but `pullrequest:fulfilled`
///   is acknowledged and ignored
/// - Body: JSON `pullrequest:fulfilled` payload
///
/// # Response
///
/// - 202 Accepted: event queued (or ignored)
/// - 400 Bad Request: invalid JSON
/// - 401 Unauthorized: token mismatch
/// - 503 Service Unavailable: the worker has stopped
pub async fn webhook_handler(
    State(app_state): State<AppState>,
    Query(query): Query<WebhookQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, &'static str), WebhookError> {
    // Token first, before any parsing.
    if !token_matches(app_state.token(), query.token.as_deref()) {
        warn!("webhook rejected: invalid token");
        return Err(WebhookError::InvalidToken);
    }

    if let Some(event_key) = headers.get(HEADER_EVENT).and_then(|v| v.to_str().ok()) {
        if event_key != FULFILLED_EVENT {
            debug!(event_key = %event_key, "ignoring webhook event");
            return Ok((StatusCode::ACCEPTED, "Ignored"));
        }
    }

    let payload: PullRequestPayload = serde_json::from_slice(&body)?;
    let event = CascadeEvent::from(payload);

    info!(
        repo = %event.repository,
        source = %event.source,
        destination = %event.destination,
        "webhook accepted"
    );

    app_state.events().send(event).await.map_err(|e| {
        warn!(repo = %e.0.repository, "event queue closed, dropping webhook");
        WebhookError::QueueClosed
    })?;

    Ok((StatusCode::ACCEPTED, "Accepted"))
}

/// Compare the presented token with the configured one.
///
/// With no configured token only a delivery without one passes. Both sides
/// are hashed and the digests compared in constant time.
pub fn token_matches(expected: &str, presented: Option<&str>) -> bool {
    let presented = match presented {
        Some(token) if !token.is_empty() => token,
        _ => return expected.is_empty(),
    };
    if expected.is_empty() {
        return false;
    }

    let a = Sha256::digest(expected.as_bytes());
    let b = Sha256::digest(presented.as_bytes());
    bool::from(a.as_slice().ct_eq(b.as_slice()))
}

#[cfg(test)]
mod tests {
    use super::*;

    mod token {
        use super::*;

        #[test]
        fn empty_expected_accepts_only_no_token() {
            assert!(token_matches("", None));
            assert!(token_matches("", Some("")));
            assert!(!token_matches("", Some("whatever")));
        }

        #[test]
        fn exact_match_required() {
            assert!(token_matches("s3cret", Some("s3cret")));
            assert!(!token_matches("s3cret", Some("s3cre")));
            assert!(!token_matches("s3cret", Some("s3cret ")));
            assert!(!token_matches("s3cret", Some("")));
            assert!(!token_matches("s3cret", None));
        }

        #[test]
        fn same_length_mismatch_rejected() {
            assert!(!token_matches("s3cret", Some("s3creT")));
            assert!(!token_matches("aaaaaa", Some("bbbbbb")));
        }
    }

    mod errors {
        use super::*;

        #[test]
        fn status_codes() {
            assert_eq!(
                WebhookError::InvalidToken.into_response().status(),
                StatusCode::UNAUTHORIZED
            );
            assert_eq!(
                WebhookError::QueueClosed.into_response().status(),
                StatusCode::SERVICE_UNAVAILABLE
            );
            let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
            assert_eq!(
                WebhookError::InvalidJson(json_err).into_response().status(),
                StatusCode::BAD_REQUEST
            );
        }
    }
}
