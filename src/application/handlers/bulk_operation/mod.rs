//! Bulk operation handlers.

mod progress_reporter;

pub use progress_reporter::{
    BulkOperationSummary, BulkProgressReporter, StartBulkOperationCommand,
};
