//! Progress snapshot of a bulk operation.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{FarmId, OperationId, Timestamp, UserId};

use super::{BulkOperationStatus, BulkOperationType};

/// Latest known state of a bulk operation.
///
/// Producers emit a fresh snapshot on every progress tick; consumers only
/// ever keep the most recent one. `current <= total` is expected but not
/// checked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkOperationEvent {
    pub id: OperationId,
    #[serde(rename = "type")]
    pub operation_type: BulkOperationType,
    pub status: BulkOperationStatus,
    pub farm_id: FarmId,
    pub user_id: UserId,
    pub current: u64,
    pub total: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub timestamp: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_count: Option<u64>,
}

impl BulkOperationEvent {
    /// Creates a pending snapshot with no progress yet.
    pub fn new(
        id: OperationId,
        operation_type: BulkOperationType,
        farm_id: FarmId,
        user_id: UserId,
        total: u64,
    ) -> Self {
        Self {
            id,
            operation_type,
            status: BulkOperationStatus::Pending,
            farm_id,
            user_id,
            current: 0,
            total,
            message: None,
            timestamp: Timestamp::now(),
            success_count: None,
            failure_count: None,
        }
    }

    /// Returns true if the operation has completed or failed.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Progress as a whole percentage, capped at 100.
    ///
    /// An operation with nothing to do reports 0.
    pub fn percent_complete(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        let percent = self.current.saturating_mul(100) / self.total;
        percent.min(100) as u8
    }

    /// Returns a copy with a different status.
    pub fn with_status(mut self, status: BulkOperationStatus) -> Self {
        self.status = status;
        self
    }
}
