//! BulkProgressReporter - drives progress publishing for a bulk executor.
//!
//! Batch edits, imports, exports and bulk registrations all follow the same
//! shape: announce the operation, process items one by one while counting
//! successes and failures, then announce the outcome. The reporter keeps
//! the counters and builds each snapshot so executors only call
//! `record_success` / `record_failure`.

use std::sync::Arc;

use crate::domain::bulk_operation::{BulkOperationEvent, BulkOperationStatus, BulkOperationType};
use crate::domain::foundation::{FarmId, OperationId, Timestamp, UserId};
use crate::ports::BulkOperationNotifier;

/// Command to start tracking a bulk operation.
#[derive(Debug, Clone)]
pub struct StartBulkOperationCommand {
    pub operation_id: OperationId,
    pub operation_type: BulkOperationType,
    pub farm_id: FarmId,
    pub user_id: UserId,
    pub total: u64,
}

/// Outcome of a tracked bulk operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkOperationSummary {
    pub operation_id: OperationId,
    pub status: BulkOperationStatus,
    pub processed: u64,
    pub success_count: u64,
    pub failure_count: u64,
}

/// Publishes progress of one bulk operation through a notifier.
pub struct BulkProgressReporter {
    notifier: Arc<dyn BulkOperationNotifier>,
    event: BulkOperationEvent,
    success_count: u64,
    failure_count: u64,
    /// Auto-report after this many recorded items; 0 means only on `report`.
    report_every: u64,
    since_last_report: u64,
}

impl BulkProgressReporter {
    /// Announce a new operation with a `pending` snapshot.
    pub async fn start(
        notifier: Arc<dyn BulkOperationNotifier>,
        cmd: StartBulkOperationCommand,
    ) -> Self {
        let event = BulkOperationEvent::new(
            cmd.operation_id,
            cmd.operation_type,
            cmd.farm_id,
            cmd.user_id,
            cmd.total,
        );

        tracing::info!(
            operation_id = %event.id,
            operation_type = %event.operation_type,
            farm_id = %event.farm_id,
            total = event.total,
            "Bulk operation started"
        );

        notifier.broadcast_operation_update(event.clone()).await;

        Self {
            notifier,
            event,
            success_count: 0,
            failure_count: 0,
            report_every: 0,
            since_last_report: 0,
        }
    }

    /// Publish an `in-progress` snapshot automatically every `n` items.
    pub fn with_report_every(mut self, n: u64) -> Self {
        self.report_every = n;
        self
    }

    /// Items processed so far.
    pub fn processed(&self) -> u64 {
        self.success_count + self.failure_count
    }

    /// Count one successfully processed item.
    pub async fn record_success(&mut self) {
        self.success_count += 1;
        self.after_record().await;
    }

    /// Count one item that could not be processed.
    pub async fn record_failure(&mut self) {
        self.failure_count += 1;
        self.after_record().await;
    }

    /// Publish an `in-progress` snapshot now.
    pub async fn report(&mut self, message: Option<String>) {
        self.since_last_report = 0;
        let snapshot = self.snapshot(BulkOperationStatus::InProgress, message);
        self.notifier.broadcast_operation_update(snapshot).await;
    }

    /// Publish the completion snapshot.
    pub async fn finish(self, message: Option<String>) -> BulkOperationSummary {
        let snapshot = self.snapshot(BulkOperationStatus::Completed, message);
        self.notifier.broadcast_operation_complete(snapshot).await;
        self.summary(BulkOperationStatus::Completed)
    }

    /// Publish the failure snapshot.
    pub async fn fail(self, message: impl Into<String>) -> BulkOperationSummary {
        let snapshot = self.snapshot(BulkOperationStatus::Failed, Some(message.into()));
        self.notifier.broadcast_operation_error(snapshot).await;
        self.summary(BulkOperationStatus::Failed)
    }

    async fn after_record(&mut self) {
        self.since_last_report += 1;
        if self.report_every > 0 && self.since_last_report >= self.report_every {
            self.report(None).await;
        }
    }

    fn snapshot(&self, status: BulkOperationStatus, message: Option<String>) -> BulkOperationEvent {
        BulkOperationEvent {
            status,
            current: self.processed(),
            message,
            timestamp: Timestamp::now(),
            success_count: Some(self.success_count),
            failure_count: Some(self.failure_count),
            ..self.event.clone()
        }
    }

    fn summary(&self, status: BulkOperationStatus) -> BulkOperationSummary {
        BulkOperationSummary {
            operation_id: self.event.id.clone(),
            status,
            processed: self.processed(),
            success_count: self.success_count,
            failure_count: self.failure_count,
        }
    }
}
