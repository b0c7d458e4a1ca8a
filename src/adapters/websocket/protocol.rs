//! Inbound frame decoding and routing.
//!
//! Each text frame is handled on its own; there is no per-connection
//! session state beyond registry membership. Bad frames are answered with
//! an `error` envelope and the connection stays open.

use std::sync::Arc;

use crate::ports::BulkOperationNotifier;

use super::broadcaster::BulkOperationBroadcaster;
use super::messages::{ClientMessage, ServerMessage};
use super::registry::ConnectionId;

/// Routes decoded client frames to the broadcaster.
#[derive(Clone)]
pub struct ProtocolHandler {
    broadcaster: Arc<BulkOperationBroadcaster>,
    allow_client_events: bool,
}

impl ProtocolHandler {
    /// Create a handler that also accepts producer frames over the socket.
    pub fn new(broadcaster: Arc<BulkOperationBroadcaster>) -> Self {
        Self {
            broadcaster,
            allow_client_events: true,
        }
    }

    /// Enable or disable `update` / `complete` / `error` frames from clients.
    ///
    /// When disabled only the in-process notifier can publish events.
    pub fn with_client_events(mut self, allow: bool) -> Self {
        self.allow_client_events = allow;
        self
    }

    /// Handle one text frame from a connection.
    ///
    /// Returns a frame to send straight back to that connection, if any.
    pub async fn handle_text(
        &self,
        connection_id: ConnectionId,
        text: &str,
    ) -> Option<ServerMessage> {
        let message = match serde_json::from_str::<ClientMessage>(text) {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!(
                    connection_id = %connection_id,
                    "Rejected malformed frame: {}",
                    e
                );
                return Some(ServerMessage::protocol_error(format!(
                    "Invalid message: {}",
                    e
                )));
            }
        };

        self.handle(connection_id, message).await
    }

    /// Handle an already decoded frame.
    pub async fn handle(
        &self,
        connection_id: ConnectionId,
        message: ClientMessage,
    ) -> Option<ServerMessage> {
        match message {
            ClientMessage::Subscribe {
                operation_id,
                farm_id,
            } => {
                tracing::debug!(
                    connection_id = %connection_id,
                    operation_id = ?operation_id,
                    farm_id = ?farm_id,
                    "Subscribe"
                );
                self.broadcaster
                    .subscribe(connection_id, operation_id.as_ref(), farm_id)
                    .await;
                None
            }
            ClientMessage::Unsubscribe {
                operation_id,
                farm_id,
            } => {
                tracing::debug!(
                    connection_id = %connection_id,
                    operation_id = ?operation_id,
                    farm_id = ?farm_id,
                    "Unsubscribe"
                );
                self.broadcaster
                    .unsubscribe(connection_id, operation_id.as_ref(), farm_id)
                    .await;
                None
            }
            ClientMessage::Update { .. }
            | ClientMessage::Complete { .. }
            | ClientMessage::Error { .. }
                if !self.allow_client_events =>
            {
                tracing::warn!(
                    connection_id = %connection_id,
                    "Rejected event frame, client publishing is disabled"
                );
                Some(ServerMessage::protocol_error(
                    "Publishing events over this connection is not permitted",
                ))
            }
            ClientMessage::Update { event } => {
                self.broadcaster.broadcast_operation_update(event).await;
                None
            }
            ClientMessage::Complete { event } => {
                self.broadcaster.broadcast_operation_complete(event).await;
                None
            }
            ClientMessage::Error { event } => {
                self.broadcaster.broadcast_operation_error(event).await;
                None
            }
        }
    }
}
