//! Route configuration for bulk operation endpoints.

use axum::routing::get;
use axum::Router;

use super::handlers::{get_operation_status, list_active_operations, BulkOperationAppState};

/// Creates the bulk operation router.
///
/// Routes:
/// - `GET /api/farms/:farm_id/bulk-operations` - Operations held for a farm
/// - `GET /api/bulk-operations/:operation_id` - Latest snapshot of one operation
pub fn bulk_operation_router() -> Router<BulkOperationAppState> {
    Router::new()
        .route(
            "/api/farms/:farm_id/bulk-operations",
            get(list_active_operations),
        )
        .route(
            "/api/bulk-operations/:operation_id",
            get(get_operation_status),
        )
}
