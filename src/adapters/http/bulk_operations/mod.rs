//! HTTP adapter for bulk operation progress polling.
//!
//! # Endpoints
//!
//! - `GET /api/farms/:farm_id/bulk-operations` - What is running for a farm
//! - `GET /api/bulk-operations/:operation_id` - Latest snapshot of an operation

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::{BulkOperationApiError, BulkOperationAppState};
pub use routes::bulk_operation_router;
