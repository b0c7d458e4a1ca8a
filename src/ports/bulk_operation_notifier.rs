//! BulkOperationNotifier port - how bulk executors publish progress.
//!
//! The code that actually performs a batch edit, import, export or bulk
//! registration calls these methods in-process as it works through its
//! items. Delivery is best-effort: nothing is returned to the caller, so a
//! subscriber going away can never fail the bulk work itself.

use async_trait::async_trait;

use crate::domain::bulk_operation::BulkOperationEvent;

/// Port for publishing bulk operation progress to interested clients.
///
/// # Example
///
/// ```ignore
/// async fn run_import(notifier: Arc<dyn BulkOperationNotifier>, mut event: BulkOperationEvent) {
///     for row in rows {
///         import_row(row).await;
///         event.current += 1;
///         notifier.broadcast_operation_update(event.clone()).await;
///     }
///     notifier.broadcast_operation_complete(event).await;
/// }
/// ```
#[async_trait]
pub trait BulkOperationNotifier: Send + Sync {
    /// Publish an intermediate progress snapshot.
    async fn broadcast_operation_update(&self, event: BulkOperationEvent);

    /// Publish the final snapshot of a successful operation.
    ///
    /// The stored status becomes `completed` regardless of what the
    /// snapshot carried.
    async fn broadcast_operation_complete(&self, event: BulkOperationEvent);

    /// Publish the final snapshot of a failed operation.
    ///
    /// The stored status becomes `failed` regardless of what the snapshot
    /// carried.
    async fn broadcast_operation_error(&self, event: BulkOperationEvent);
}
