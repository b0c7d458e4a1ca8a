//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `storage` - Operation snapshot storage (in-memory)
//! - `websocket` - Subscription registry, broadcaster and socket endpoint
//! - `http` - Polling endpoints over the same snapshots

pub mod http;
pub mod storage;
pub mod websocket;

pub use storage::InMemoryOperationStateStore;
pub use websocket::{BulkOperationBroadcaster, SubscriptionRegistry};
