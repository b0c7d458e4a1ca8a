//! WebSocket upgrade handler for bulk operation progress.
//!
//! Handles the HTTP → WebSocket upgrade and manages the connection lifecycle:
//! 1. Upgrade to WebSocket
//! 2. Register the connection and its outbound channel
//! 3. Forward queued frames to the socket while decoding inbound frames
//! 4. Drop every subscription on disconnect

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};

use super::{
    broadcaster::BulkOperationBroadcaster,
    messages::ServerMessage,
    protocol::ProtocolHandler,
    registry::ConnectionId,
};

/// State required for WebSocket handling.
#[derive(Clone)]
pub struct WebSocketState {
    /// Dispatcher shared with bulk executors and HTTP query handlers.
    pub broadcaster: Arc<BulkOperationBroadcaster>,
    /// Inbound frame router.
    pub protocol: ProtocolHandler,
}

impl WebSocketState {
    /// Create a new WebSocket state that accepts producer frames.
    pub fn new(broadcaster: Arc<BulkOperationBroadcaster>) -> Self {
        let protocol = ProtocolHandler::new(broadcaster.clone());
        Self {
            broadcaster,
            protocol,
        }
    }

    /// Enable or disable `update` / `complete` / `error` frames from clients.
    pub fn with_client_events(mut self, allow: bool) -> Self {
        self.protocol = self.protocol.with_client_events(allow);
        self
    }
}

/// Handle WebSocket upgrade requests for bulk operation progress.
///
/// Route: `GET /ws/bulk-operations`
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<WebSocketState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle an established WebSocket connection.
///
/// Runs for the lifetime of the connection. Either half finishing ends
/// the other, then the connection is removed from every index.
async fn handle_socket(socket: WebSocket, state: WebSocketState) {
    let (mut sender, mut receiver) = socket.split();

    let connection_id = ConnectionId::new();
    let registry = state.broadcaster.registry().clone();
    let mut outbound = registry.register(connection_id).await;

    tracing::debug!(connection_id = %connection_id, "Client connected");

    // Forward queued frames to the client
    let mut send_task = tokio::spawn(async move {
        while let Some(message) = outbound.recv().await {
            if let Err(e) = send_message(&mut sender, &message).await {
                tracing::debug!(
                    connection_id = %connection_id,
                    "Send error, closing connection: {}",
                    e
                );
                break;
            }
        }
    });

    // Handle incoming frames from the client
    let protocol = state.protocol.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Text(text)) => {
                    if let Some(reply) = protocol.handle_text(connection_id, &text).await {
                        registry.send_to(connection_id, reply).await;
                    }
                }
                Ok(Message::Binary(_)) => {
                    tracing::warn!(
                        connection_id = %connection_id,
                        "Received unsupported binary message"
                    );
                }
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                    // Protocol-level keepalive, answered by axum
                }
                Ok(Message::Close(_)) => {
                    tracing::debug!(
                        connection_id = %connection_id,
                        "Client sent close frame"
                    );
                    break;
                }
                Err(e) => {
                    tracing::debug!(
                        connection_id = %connection_id,
                        "Receive error: {}",
                        e
                    );
                    break;
                }
            }
        }
    });

    // The aborted half must finish before disconnect so a frame it was
    // handling cannot subscribe after the indexes are purged
    tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
            let _ = recv_task.await;
        }
        _ = &mut recv_task => {
            send_task.abort();
            let _ = send_task.await;
        }
    }

    state.broadcaster.disconnect(connection_id).await;
    tracing::debug!(connection_id = %connection_id, "Client disconnected");
}

/// Send a JSON frame over the WebSocket.
async fn send_message(
    sender: &mut futures::stream::SplitSink<WebSocket, Message>,
    message: &ServerMessage,
) -> Result<(), axum::Error> {
    let json = message.to_json().map_err(axum::Error::new)?;
    sender.send(Message::Text(json)).await
}

/// Create axum router for the WebSocket endpoint.
///
/// # Example
///
/// ```ignore
/// let app = Router::new()
///     .merge(websocket_router().with_state(ws_state));
/// ```
pub fn websocket_router() -> axum::Router<WebSocketState> {
    use axum::routing::get;

    axum::Router::new().route("/ws/bulk-operations", get(ws_handler))
}
