//! Kinds and lifecycle states of bulk operations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What a bulk operation is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BulkOperationType {
    /// Editing many animal records at once.
    BatchEdit,
    /// Importing records from a file.
    Import,
    /// Exporting records to a file.
    Export,
    /// Registering many animals in one pass.
    BulkRegister,
}

impl fmt::Display for BulkOperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BulkOperationType::BatchEdit => "batch-edit",
            BulkOperationType::Import => "import",
            BulkOperationType::Export => "export",
            BulkOperationType::BulkRegister => "bulk-register",
        };
        write!(f, "{}", s)
    }
}

/// Lifecycle status of a bulk operation.
///
/// `Completed` and `Failed` are terminal. Ordering between the other
/// states is expected from producers but not enforced here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum BulkOperationStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl BulkOperationStatus {
    /// Returns true if no further updates are expected.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BulkOperationStatus::Completed | BulkOperationStatus::Failed
        )
    }
}

impl fmt::Display for BulkOperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BulkOperationStatus::Pending => "pending",
            BulkOperationStatus::InProgress => "in-progress",
            BulkOperationStatus::Completed => "completed",
            BulkOperationStatus::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}
