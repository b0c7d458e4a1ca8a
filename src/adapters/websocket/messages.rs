//! WebSocket message types for bulk operation progress.
//!
//! Every frame is a JSON object with an `action` field:
//! - Server → Client: `update` / `complete` / `error` carrying an event, or
//!   `error` carrying a protocol error string
//! - Client → Server: `subscribe` / `unsubscribe`, plus `update` /
//!   `complete` / `error` from producers that publish over the socket

use serde::{Deserialize, Serialize};

use crate::domain::bulk_operation::{BulkOperationEvent, BulkOperationStatus};
use crate::domain::foundation::{FarmId, OperationId};

// ============================================
// Server → Client Messages
// ============================================

/// Action carried by an outbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageAction {
    /// Intermediate progress.
    Update,
    /// Operation finished successfully.
    Complete,
    /// Operation failed, or an inbound frame was rejected.
    Error,
}

impl MessageAction {
    /// The action a stored snapshot is replayed with.
    pub fn for_status(status: BulkOperationStatus) -> Self {
        match status {
            BulkOperationStatus::Completed => MessageAction::Complete,
            BulkOperationStatus::Failed => MessageAction::Error,
            BulkOperationStatus::Pending | BulkOperationStatus::InProgress => {
                MessageAction::Update
            }
        }
    }
}

/// Frame sent from server to subscriber.
///
/// Exactly one of `event` or `error` is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerMessage {
    pub action: MessageAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<BulkOperationEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ServerMessage {
    /// Progress frame.
    pub fn update(event: BulkOperationEvent) -> Self {
        Self::with_event(MessageAction::Update, event)
    }

    /// Completion frame.
    pub fn complete(event: BulkOperationEvent) -> Self {
        Self::with_event(MessageAction::Complete, event)
    }

    /// Operation failure frame.
    pub fn failed(event: BulkOperationEvent) -> Self {
        Self::with_event(MessageAction::Error, event)
    }

    /// Frame carrying an event under an explicit action.
    pub fn with_event(action: MessageAction, event: BulkOperationEvent) -> Self {
        Self {
            action,
            event: Some(event),
            error: None,
        }
    }

    /// Rejection of an inbound frame.
    pub fn protocol_error(error: impl Into<String>) -> Self {
        Self {
            action: MessageAction::Error,
            event: None,
            error: Some(error.into()),
        }
    }

    /// Encode as a JSON text frame.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// ============================================
// Client → Server Messages
// ============================================

/// All frames that can be received on the socket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ClientMessage {
    /// Start receiving events for an operation and/or a farm.
    #[serde(rename_all = "camelCase")]
    Subscribe {
        #[serde(default)]
        operation_id: Option<OperationId>,
        #[serde(default)]
        farm_id: Option<FarmId>,
    },

    /// Stop receiving events for an operation and/or a farm.
    #[serde(rename_all = "camelCase")]
    Unsubscribe {
        #[serde(default)]
        operation_id: Option<OperationId>,
        #[serde(default)]
        farm_id: Option<FarmId>,
    },

    /// Producer publishing intermediate progress.
    Update { event: BulkOperationEvent },

    /// Producer publishing completion.
    Complete { event: BulkOperationEvent },

    /// Producer publishing failure.
    Error { event: BulkOperationEvent },
}
