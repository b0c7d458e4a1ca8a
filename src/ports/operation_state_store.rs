//! OperationStateStore port - latest-snapshot storage for bulk operations.
//!
//! Holds exactly one [`BulkOperationEvent`] per operation id. Writes are
//! last-writer-wins with no version check; every write is stamped with a
//! [`Revision`] so that delayed eviction can tell whether the snapshot it
//! was armed for is still the one stored.

use async_trait::async_trait;

use crate::domain::bulk_operation::BulkOperationEvent;
use crate::domain::foundation::{FarmId, OperationId};

/// Monotonic stamp assigned to each stored snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Revision(u64);

impl Revision {
    /// Creates a revision from its raw counter value.
    pub fn new(value: u64) -> Self {
        Self(value)
    }
}

/// Errors that can occur in state store operations.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum StateStoreError {
    /// No further revision can be issued for a write.
    #[error("Revision counter exhausted")]
    RevisionExhausted,
}

/// Port for holding the most recent progress snapshot of each operation.
#[async_trait]
pub trait OperationStateStore: Send + Sync {
    /// Store a snapshot, replacing whatever was there.
    async fn put(&self, event: BulkOperationEvent) -> Result<Revision, StateStoreError>;

    /// Fetch the latest snapshot, if any.
    async fn get(
        &self,
        operation_id: &OperationId,
    ) -> Result<Option<BulkOperationEvent>, StateStoreError>;

    /// Remove the snapshot only if it is still at `revision`.
    ///
    /// Returns true if something was removed.
    async fn remove_if_revision(
        &self,
        operation_id: &OperationId,
        revision: Revision,
    ) -> Result<bool, StateStoreError>;

    /// Latest snapshots of every operation belonging to a farm.
    async fn list_for_farm(
        &self,
        farm_id: FarmId,
    ) -> Result<Vec<BulkOperationEvent>, StateStoreError>;

    /// Number of operations currently held.
    async fn len(&self) -> Result<usize, StateStoreError>;
}
