//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `OperationStateStore` - Latest-snapshot storage for bulk operations
//! - `BulkOperationNotifier` - In-process progress publishing used by bulk executors
//!
//! Both are the extension points for a multi-instance deployment: a shared
//! store and a broker-backed notifier can replace the in-memory adapters
//! without touching callers.

mod bulk_operation_notifier;
mod operation_state_store;

pub use bulk_operation_notifier::BulkOperationNotifier;
pub use operation_state_store::{OperationStateStore, Revision, StateStoreError};
