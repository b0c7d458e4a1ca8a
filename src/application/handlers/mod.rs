//! Application handlers.
//!
//! Handlers that orchestrate domain types and ports for bulk executors.

pub mod bulk_operation;

pub use bulk_operation::{BulkOperationSummary, BulkProgressReporter, StartBulkOperationCommand};
