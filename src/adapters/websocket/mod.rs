//! WebSocket adapters for bulk operation progress.
//!
//! Pushes progress of long-running bulk edits, imports, exports and bulk
//! registrations to the browsers watching them.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────┐        ┌──────────────────────────┐
//! │ Bulk executor (in-proc)  │        │ Browser socket           │
//! │ BulkOperationNotifier    │        │ subscribe / unsubscribe  │
//! └──────────────────────────┘        └──────────────────────────┘
//!              │                                   │
//!              │                                   ▼
//!              │                      ┌──────────────────────────┐
//!              │                      │ ProtocolHandler          │
//!              │                      └──────────────────────────┘
//!              ▼                                   │
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                   BulkOperationBroadcaster                      │
//! │   OperationStateStore (latest snapshot, eviction)               │
//! │   SubscriptionRegistry (by operation id / by farm id)           │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`messages`] - Wire envelopes
//! - [`registry`] - Connection table and subscription indexes
//! - [`broadcaster`] - Fan-out, snapshot replay, eviction, queries
//! - [`protocol`] - Inbound frame decoding and routing
//! - [`handler`] - Axum WebSocket upgrade handler

pub mod broadcaster;
pub mod handler;
pub mod messages;
pub mod protocol;
pub mod registry;

pub use broadcaster::{BulkOperationBroadcaster, DEFAULT_EVICTION_DELAY};
pub use handler::{websocket_router, ws_handler, WebSocketState};
pub use messages::{ClientMessage, MessageAction, ServerMessage};
pub use protocol::ProtocolHandler;
pub use registry::{ConnectionId, Recipient, SubscriptionRegistry};
