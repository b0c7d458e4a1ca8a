//! In-Memory Operation State Store Adapter
//!
//! Keeps the latest snapshot of every bulk operation in a process-local
//! map. Everything is lost on restart, which is acceptable for progress
//! indicators.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::bulk_operation::BulkOperationEvent;
use crate::domain::foundation::{FarmId, OperationId};
use crate::ports::{OperationStateStore, Revision, StateStoreError};

/// A snapshot together with the revision it was written at.
#[derive(Debug, Clone)]
struct StoredOperation {
    event: BulkOperationEvent,
    revision: Revision,
}

#[derive(Debug, Default)]
struct StoreState {
    operations: HashMap<OperationId, StoredOperation>,
    next_revision: u64,
}

/// In-memory storage for bulk operation snapshots
#[derive(Debug, Clone, Default)]
pub struct InMemoryOperationStateStore {
    state: Arc<RwLock<StoreState>>,
}

impl InMemoryOperationStateStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OperationStateStore for InMemoryOperationStateStore {
    async fn put(&self, event: BulkOperationEvent) -> Result<Revision, StateStoreError> {
        let mut state = self.state.write().await;
        state.next_revision = state
            .next_revision
            .checked_add(1)
            .ok_or(StateStoreError::RevisionExhausted)?;
        let revision = Revision::new(state.next_revision);
        state
            .operations
            .insert(event.id.clone(), StoredOperation { event, revision });
        Ok(revision)
    }

    async fn get(
        &self,
        operation_id: &OperationId,
    ) -> Result<Option<BulkOperationEvent>, StateStoreError> {
        let state = self.state.read().await;
        Ok(state
            .operations
            .get(operation_id)
            .map(|stored| stored.event.clone()))
    }

    async fn remove_if_revision(
        &self,
        operation_id: &OperationId,
        revision: Revision,
    ) -> Result<bool, StateStoreError> {
        let mut state = self.state.write().await;
        match state.operations.get(operation_id) {
            Some(stored) if stored.revision == revision => {
                state.operations.remove(operation_id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_for_farm(
        &self,
        farm_id: FarmId,
    ) -> Result<Vec<BulkOperationEvent>, StateStoreError> {
        let state = self.state.read().await;
        Ok(state
            .operations
            .values()
            .filter(|stored| stored.event.farm_id == farm_id)
            .map(|stored| stored.event.clone())
            .collect())
    }

    async fn len(&self) -> Result<usize, StateStoreError> {
        Ok(self.state.read().await.operations.len())
    }
}
