//! # Endpoint Handlers
//!
//! The WebSocket endpoint and its per-connection loop, plus the HTTP
//! health and status endpoints.
//!
//! Each connection handles one message at a time: the store lock is taken,
//! the request is dispatched, the lock is released and the reply is sent
//! before the next message is read. Event pushes are interleaved between
//! replies as they arrive on the connection's channel.

use super::{
    AppState,
    middleware::admit,
    types::{HealthResponse, StatusResponse},
};
use crate::dispatcher::dispatch;
use crate::protocol::{Reply, recover_id};
use crate::subscriptions::SubscriptionRegistry;
use axum::{
    Json,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::{IntoResponse, Response},
};
use strand_core::GraphStore;

// =============================================================================
// HTTP HANDLERS
// =============================================================================

pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

pub async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let graph = state.graph.read().await;
    Json(StatusResponse::from(graph.stats()))
}

// =============================================================================
// WEBSOCKET
// =============================================================================

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.max_message_size(state.config.max_message_bytes)
        .on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: AppState) {
    let (mut registry, mut events) = SubscriptionRegistry::channel();
    tracing::info!("Connection opened");

    loop {
        tokio::select! {
            incoming = socket.recv() => {
                let text = match incoming {
                    Some(Ok(Message::Text(text))) => text.as_str().to_owned(),
                    Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes.to_vec()) {
                        Ok(text) => text,
                        Err(_) => {
                            let reply = Reply::error(0, "Binary message is not UTF-8");
                            if send(&mut socket, &reply).await.is_err() {
                                break;
                            }
                            continue;
                        }
                    },
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        tracing::debug!(error = %e, "Receive failed");
                        break;
                    }
                };

                let reply = if admit(state.limiter.as_ref()) {
                    let mut graph = state.graph.write().await;
                    dispatch(&mut *graph, &mut registry, &text)
                } else {
                    tracing::warn!("Rate limit exceeded");
                    Reply::error(recover_id(&text), "Rate limit exceeded")
                };
                if send(&mut socket, &reply).await.is_err() {
                    break;
                }
            }
            Some(event) = events.recv() => {
                if send(&mut socket, &Reply::event(&event)).await.is_err() {
                    break;
                }
            }
        }
    }

    let mut graph = state.graph.write().await;
    let removed = registry.clear(&mut *graph);
    tracing::info!(subscriptions = removed, "Connection closed");
}

async fn send(socket: &mut WebSocket, reply: &Reply) -> Result<(), axum::Error> {
    match serde_json::to_string(reply) {
        Ok(text) => socket.send(Message::Text(text.into())).await,
        Err(e) => {
            tracing::warn!(error = %e, "Reply serialization failed");
            Ok(())
        }
    }
}
