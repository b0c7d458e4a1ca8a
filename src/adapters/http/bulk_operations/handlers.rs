//! HTTP handlers for bulk operation polling.
//!
//! Read-only views over the same snapshots the WebSocket subscribers see,
//! for clients that poll instead of holding a socket open.

use std::sync::Arc;

use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::adapters::websocket::BulkOperationBroadcaster;
use crate::domain::bulk_operation::BulkOperationEvent;
use crate::domain::foundation::{FarmId, OperationId, ValidationError};
use crate::ports::StateStoreError;

use super::dto::ErrorResponse;

// ════════════════════════════════════════════════════════════════════════════════
// Error Type
// ════════════════════════════════════════════════════════════════════════════════

/// Bulk operation API error that implements IntoResponse.
#[derive(Debug)]
pub enum BulkOperationApiError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl IntoResponse for BulkOperationApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            BulkOperationApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, ErrorResponse::bad_request(msg))
            }
            BulkOperationApiError::NotFound(id) => (
                StatusCode::NOT_FOUND,
                ErrorResponse::not_found("Bulk operation", &id),
            ),
            BulkOperationApiError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorResponse::internal(msg))
            }
        };
        (status, Json(error)).into_response()
    }
}

impl From<StateStoreError> for BulkOperationApiError {
    fn from(error: StateStoreError) -> Self {
        tracing::warn!("Bulk operation query failed: {}", error);
        BulkOperationApiError::Internal(error.to_string())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state for bulk operation queries.
#[derive(Clone)]
pub struct BulkOperationAppState {
    pub broadcaster: Arc<BulkOperationBroadcaster>,
}

impl BulkOperationAppState {
    pub fn new(broadcaster: Arc<BulkOperationBroadcaster>) -> Self {
        Self { broadcaster }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/farms/:farm_id/bulk-operations
///
/// Responds with a bare JSON array of snapshots, oldest first.
pub async fn list_active_operations(
    State(state): State<BulkOperationAppState>,
    Path(farm_id): Path<i64>,
) -> Result<Json<Vec<BulkOperationEvent>>, BulkOperationApiError> {
    let operations = state
        .broadcaster
        .get_active_operations(FarmId::new(farm_id))
        .await?;

    Ok(Json(operations))
}

/// GET /api/bulk-operations/:operation_id
pub async fn get_operation_status(
    State(state): State<BulkOperationAppState>,
    Path(operation_id): Path<String>,
) -> Result<Json<BulkOperationEvent>, BulkOperationApiError> {
    let operation_id: OperationId = operation_id
        .parse()
        .map_err(|e: ValidationError| BulkOperationApiError::BadRequest(e.to_string()))?;

    state
        .broadcaster
        .get_operation_status(&operation_id)
        .await?
        .map(Json)
        .ok_or_else(|| BulkOperationApiError::NotFound(operation_id.to_string()))
}
