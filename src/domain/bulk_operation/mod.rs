//! Bulk operation module - progress of long-running farm record batches.
//!
//! A bulk operation (batch edit, import, export, bulk registration) is
//! tracked only through its latest [`BulkOperationEvent`]; no history is
//! kept.

mod event;
mod status;

pub use event::BulkOperationEvent;
pub use status::{BulkOperationStatus, BulkOperationType};
