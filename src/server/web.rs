//! Subscriber-facing HTTP and WebSocket endpoints
//!
//! Routes:
//! - `GET /ws/{source_id}` — WebSocket push of binary assembled frames
//! - `GET /stats` — relay-wide statistics document
//! - `GET /health` — liveness check

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use futures::{SinkExt, StreamExt};
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;

use crate::relay::{RelayStore, SourceId};

/// Shared state for the HTTP layer
#[derive(Clone)]
pub struct AppState {
    pub(crate) store: Arc<RelayStore>,
    pub(crate) heartbeat_timeout: Duration,
}

impl AppState {
    /// Create state over a relay store
    pub fn new(store: Arc<RelayStore>, heartbeat_timeout: Duration) -> Self {
        Self {
            store,
            heartbeat_timeout,
        }
    }
}

/// Build the HTTP router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ws/{source_id}", get(ws_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

async fn stats_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.store.snapshot().await)
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0);

    Json(json!({
        "status": "healthy",
        "timestamp": timestamp,
        "source_count": state.store.source_count().await,
    }))
}

/// WebSocket upgrade handler
///
/// Any caller may subscribe to any source id, including ones that have not
/// produced a frame yet.
async fn ws_handler(
    Path(source_id): Path<String>,
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let source = SourceId::new(source_id);
    ws.on_upgrade(move |socket| handle_subscriber(socket, source, state))
}

/// Drive one subscriber session
///
/// Frames flow out on a forward task; this task reads client keepalives
/// with a bounded deadline. Deadline expiry, a close frame, a read error,
/// or a failed send all end the session the same way: the forward task is
/// told to stop, sends a clean close frame, and the subscriber is removed
/// exactly once.
async fn handle_subscriber(socket: WebSocket, source: SourceId, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let mut rx = state.store.subscribe(&source).await;
    let (shutdown_tx, mut shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    let forward_source = source.clone();
    let mut forward = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                }
                result = rx.recv() => match result {
                    Ok(frame) => {
                        if sender.send(Message::Binary(frame.data)).await.is_err() {
                            break;
                        }
                    }
                    // Fell behind the broadcast capacity; skip ahead rather
                    // than buffer for a slow consumer
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!(
                            source = %forward_source,
                            skipped,
                            "slow subscriber skipped frames"
                        );
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    });

    loop {
        match tokio::time::timeout(state.heartbeat_timeout, receiver.next()).await {
            Ok(Some(Ok(Message::Close(_)))) | Ok(None) => {
                tracing::debug!(source = %source, "subscriber closed");
                break;
            }
            // Keepalive or other client data refreshes the deadline
            Ok(Some(Ok(_))) => {}
            Ok(Some(Err(e))) => {
                tracing::debug!(source = %source, error = %e, "subscriber read error");
                break;
            }
            Err(_) => {
                tracing::debug!(source = %source, "subscriber heartbeat timed out");
                break;
            }
        }
    }

    // Let the forward task flush its close frame, but only briefly: a peer
    // that stopped reading must not pin the session task
    let _ = shutdown_tx.send(());
    if tokio::time::timeout(Duration::from_secs(1), &mut forward)
        .await
        .is_err()
    {
        forward.abort();
    }

    state.store.unsubscribe(&source).await;
}
