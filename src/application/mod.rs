//! Application layer - Handlers used by bulk executors.
//!
//! This layer orchestrates domain types and coordinates between ports.

pub mod handlers;

pub use handlers::{BulkOperationSummary, BulkProgressReporter, StartBulkOperationCommand};
