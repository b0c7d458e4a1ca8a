//! HTTP adapters - REST API implementations.

pub mod bulk_operations;

pub use bulk_operations::{bulk_operation_router, BulkOperationAppState};
