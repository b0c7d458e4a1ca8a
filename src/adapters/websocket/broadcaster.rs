//! Broadcast dispatcher for bulk operation progress.
//!
//! Every event goes through the same path:
//!
//! ```text
//! broadcast_operation_{update,complete,error}
//!          │
//!          ▼
//!   write-through state store ──► revision
//!          │
//!          ▼
//!   operation-id subscribers ──► {action, event}
//!          │
//!          ▼
//!   farm-id subscribers      ──► {action, event}
//!          │
//!          ▼ (complete / error only)
//!   arm eviction(revision)
//! ```
//!
//! A connection subscribed through both indexes gets the frame twice.
//! Delivery is best-effort: closed or backed-up connections are skipped
//! and nothing is reported back to the producer.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::bulk_operation::{BulkOperationEvent, BulkOperationStatus};
use crate::domain::foundation::{FarmId, OperationId};
use crate::ports::{BulkOperationNotifier, OperationStateStore, Revision, StateStoreError};

use super::messages::{MessageAction, ServerMessage};
use super::registry::{ConnectionId, Recipient, SubscriptionRegistry};

/// How long a finished operation stays queryable.
pub const DEFAULT_EVICTION_DELAY: Duration = Duration::from_secs(60);

/// Fans bulk operation events out to subscribed connections and answers
/// "what is running" queries.
///
/// Constructed once by the composition root and shared by `Arc` with the
/// WebSocket endpoint, the HTTP query handlers and bulk executors.
pub struct BulkOperationBroadcaster {
    registry: Arc<SubscriptionRegistry>,
    store: Arc<dyn OperationStateStore>,
    eviction_delay: Duration,
}

impl BulkOperationBroadcaster {
    /// Create a broadcaster over the given registry and store.
    pub fn new(registry: Arc<SubscriptionRegistry>, store: Arc<dyn OperationStateStore>) -> Self {
        Self {
            registry,
            store,
            eviction_delay: DEFAULT_EVICTION_DELAY,
        }
    }

    /// Override how long finished operations are kept.
    pub fn with_eviction_delay(mut self, eviction_delay: Duration) -> Self {
        self.eviction_delay = eviction_delay;
        self
    }

    /// The registry this broadcaster routes through.
    pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.registry
    }

    /// Store, route and (for terminal actions) schedule eviction of an event.
    ///
    /// Returns the number of frames queued across both indexes.
    pub async fn publish(&self, action: MessageAction, event: BulkOperationEvent) -> usize {
        let revision = match self.store.put(event.clone()).await {
            Ok(revision) => Some(revision),
            Err(e) => {
                tracing::warn!(
                    operation_id = %event.id,
                    "Failed to store operation snapshot: {}",
                    e
                );
                None
            }
        };

        let operation_id = event.id.clone();
        let farm_id = event.farm_id;
        let message = ServerMessage::with_event(action, event);

        let by_operation = deliver(
            self.registry.operation_recipients(&operation_id).await,
            &message,
        );
        let by_farm = deliver(self.registry.farm_recipients(farm_id).await, &message);

        tracing::debug!(
            operation_id = %operation_id,
            farm_id = %farm_id,
            action = ?action,
            by_operation,
            by_farm,
            "Broadcast bulk operation event"
        );

        if action != MessageAction::Update {
            if let Some(revision) = revision {
                self.schedule_eviction(operation_id, revision);
            }
        }

        by_operation + by_farm
    }

    /// Remove the snapshot after the eviction delay, unless it has been
    /// overwritten in the meantime.
    pub fn schedule_eviction(&self, operation_id: OperationId, revision: Revision) {
        let store = Arc::clone(&self.store);
        let delay = self.eviction_delay;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match store.remove_if_revision(&operation_id, revision).await {
                Ok(true) => {
                    tracing::debug!(operation_id = %operation_id, "Evicted finished operation");
                }
                Ok(false) => {
                    tracing::debug!(
                        operation_id = %operation_id,
                        "Skipped eviction, snapshot was replaced"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        operation_id = %operation_id,
                        "Failed to evict operation snapshot: {}",
                        e
                    );
                }
            }
        });
    }

    /// Subscribe a connection and replay the latest snapshot of the
    /// requested operation, if one exists.
    ///
    /// Unknown operations are not an error; the subscription waits for the
    /// first update. Farm subscriptions are not replayed.
    ///
    /// Returns true if a snapshot was replayed.
    pub async fn subscribe(
        &self,
        connection_id: ConnectionId,
        operation_id: Option<&OperationId>,
        farm_id: Option<FarmId>,
    ) -> bool {
        let registered = self
            .registry
            .subscribe(connection_id, operation_id, farm_id)
            .await;

        let Some(operation_id) = operation_id.filter(|_| registered) else {
            return false;
        };

        let snapshot = match self.store.get(operation_id).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(
                    operation_id = %operation_id,
                    "Failed to load snapshot for replay: {}",
                    e
                );
                None
            }
        };

        match snapshot {
            Some(event) => {
                let action = MessageAction::for_status(event.status);
                self.registry
                    .send_to(connection_id, ServerMessage::with_event(action, event))
                    .await
            }
            None => false,
        }
    }

    /// Remove a connection from the given indexes.
    pub async fn unsubscribe(
        &self,
        connection_id: ConnectionId,
        operation_id: Option<&OperationId>,
        farm_id: Option<FarmId>,
    ) {
        self.registry
            .unsubscribe(connection_id, operation_id, farm_id)
            .await;
    }

    /// Forget a connection after its socket closed.
    pub async fn disconnect(&self, connection_id: ConnectionId) {
        self.registry.on_disconnect(connection_id).await;
    }

    /// Latest snapshot of every operation held for a farm, oldest first.
    pub async fn get_active_operations(
        &self,
        farm_id: FarmId,
    ) -> Result<Vec<BulkOperationEvent>, StateStoreError> {
        let mut operations = self.store.list_for_farm(farm_id).await?;
        operations.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.id.as_str().cmp(b.id.as_str()))
        });
        Ok(operations)
    }

    /// Latest snapshot of one operation.
    pub async fn get_operation_status(
        &self,
        operation_id: &OperationId,
    ) -> Result<Option<BulkOperationEvent>, StateStoreError> {
        self.store.get(operation_id).await
    }
}

fn deliver(recipients: Vec<Recipient>, message: &ServerMessage) -> usize {
    recipients
        .into_iter()
        .filter(Recipient::is_open)
        .filter(|recipient| recipient.try_deliver(message.clone()))
        .count()
}

#[async_trait]
impl BulkOperationNotifier for BulkOperationBroadcaster {
    async fn broadcast_operation_update(&self, event: BulkOperationEvent) {
        self.publish(MessageAction::Update, event).await;
    }

    async fn broadcast_operation_complete(&self, event: BulkOperationEvent) {
        tracing::info!(
            operation_id = %event.id,
            farm_id = %event.farm_id,
            success_count = ?event.success_count,
            failure_count = ?event.failure_count,
            "Bulk operation completed"
        );
        let event = event.with_status(BulkOperationStatus::Completed);
        self.publish(MessageAction::Complete, event).await;
    }

    async fn broadcast_operation_error(&self, event: BulkOperationEvent) {
        tracing::info!(
            operation_id = %event.id,
            farm_id = %event.farm_id,
            message = ?event.message,
            "Bulk operation failed"
        );
        let event = event.with_status(BulkOperationStatus::Failed);
        self.publish(MessageAction::Error, event).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::InMemoryOperationStateStore;
    use crate::domain::bulk_operation::BulkOperationType;
    use crate::domain::foundation::UserId;
    use tokio::sync::mpsc;

    fn setup() -> (BulkOperationBroadcaster, Arc<InMemoryOperationStateStore>) {
        let store = Arc::new(InMemoryOperationStateStore::new());
        let broadcaster = BulkOperationBroadcaster::new(
            Arc::new(SubscriptionRegistry::with_default_capacity()),
            store.clone(),
        );
        (broadcaster, store)
    }

    fn op(id: &str) -> OperationId {
        OperationId::new(id).unwrap()
    }

    fn event(id: &str, farm: i64, current: u64) -> BulkOperationEvent {
        let mut event = BulkOperationEvent::new(
            op(id),
            BulkOperationType::BatchEdit,
            FarmId::new(farm),
            UserId::new(1),
            50,
        );
        event.current = current;
        event.status = BulkOperationStatus::InProgress;
        event
    }

    async fn connect(broadcaster: &BulkOperationBroadcaster) -> (ConnectionId, mpsc::Receiver<ServerMessage>) {
        let conn = ConnectionId::new();
        let rx = broadcaster.registry().register(conn).await;
        (conn, rx)
    }

    #[tokio::test]
    async fn update_reaches_operation_subscriber_once() {
        let (broadcaster, _) = setup();
        let (conn, mut rx) = connect(&broadcaster).await;
        broadcaster.subscribe(conn, Some(&op("batch-1")), None).await;

        let sent = event("batch-1", 7, 10);
        broadcaster.broadcast_operation_update(sent.clone()).await;

        let received = rx.try_recv().unwrap();
        assert_eq!(received, ServerMessage::update(sent));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn dual_subscriber_receives_event_twice() {
        let (broadcaster, _) = setup();
        let (conn, mut rx) = connect(&broadcaster).await;
        broadcaster
            .subscribe(conn, Some(&op("batch-1")), Some(FarmId::new(7)))
            .await;

        let delivered = broadcaster
            .publish(MessageAction::Update, event("batch-1", 7, 10))
            .await;

        assert_eq!(delivered, 2);
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn other_farms_and_operations_are_not_notified() {
        let (broadcaster, _) = setup();
        let (conn, mut rx) = connect(&broadcaster).await;
        broadcaster
            .subscribe(conn, Some(&op("other")), Some(FarmId::new(9)))
            .await;

        broadcaster
            .broadcast_operation_update(event("batch-1", 7, 10))
            .await;

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn closed_subscriber_is_skipped_silently() {
        let (broadcaster, _) = setup();
        let (closed, rx_closed) = connect(&broadcaster).await;
        let (open, mut rx_open) = connect(&broadcaster).await;
        broadcaster.subscribe(closed, Some(&op("batch-1")), None).await;
        broadcaster.subscribe(open, Some(&op("batch-1")), None).await;
        drop(rx_closed);

        let delivered = broadcaster
            .publish(MessageAction::Update, event("batch-1", 7, 10))
            .await;

        assert_eq!(delivered, 1);
        assert!(rx_open.try_recv().is_ok());
    }

    #[tokio::test]
    async fn update_is_written_through_regardless_of_status() {
        let (broadcaster, _) = setup();
        let mut pending = event("batch-1", 7, 0);
        pending.status = BulkOperationStatus::Pending;

        broadcaster.broadcast_operation_update(pending).await;

        let status = broadcaster
            .get_operation_status(&op("batch-1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(status.status, BulkOperationStatus::Pending);
    }

    #[tokio::test]
    async fn complete_forces_completed_status() {
        let (broadcaster, _) = setup();
        let (conn, mut rx) = connect(&broadcaster).await;
        broadcaster.subscribe(conn, Some(&op("batch-1")), None).await;

        broadcaster
            .broadcast_operation_complete(event("batch-1", 7, 50))
            .await;

        let received = rx.try_recv().unwrap();
        assert_eq!(received.action, MessageAction::Complete);
        assert_eq!(
            received.event.unwrap().status,
            BulkOperationStatus::Completed
        );
    }

    #[tokio::test]
    async fn error_forces_failed_status() {
        let (broadcaster, _) = setup();
        let mut failing = event("batch-1", 7, 20);
        failing.message = Some("database unavailable".to_string());

        broadcaster.broadcast_operation_error(failing).await;

        let status = broadcaster
            .get_operation_status(&op("batch-1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(status.status, BulkOperationStatus::Failed);
        assert_eq!(status.message.as_deref(), Some("database unavailable"));
    }

    #[tokio::test]
    async fn subscribe_replays_latest_snapshot() {
        let (broadcaster, _) = setup();
        broadcaster
            .broadcast_operation_update(event("batch-1", 7, 10))
            .await;
        broadcaster
            .broadcast_operation_update(event("batch-1", 7, 30))
            .await;

        let (conn, mut rx) = connect(&broadcaster).await;
        let replayed = broadcaster.subscribe(conn, Some(&op("batch-1")), None).await;

        assert!(replayed);
        let received = rx.try_recv().unwrap();
        assert_eq!(received.action, MessageAction::Update);
        assert_eq!(received.event.unwrap().current, 30);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn subscribe_replays_terminal_snapshot_with_terminal_action() {
        let (broadcaster, _) = setup();
        broadcaster
            .broadcast_operation_error(event("batch-1", 7, 10))
            .await;

        let (conn, mut rx) = connect(&broadcaster).await;
        broadcaster.subscribe(conn, Some(&op("batch-1")), None).await;

        assert_eq!(rx.try_recv().unwrap().action, MessageAction::Error);
    }

    #[tokio::test]
    async fn subscribe_to_unknown_operation_records_subscription() {
        let (broadcaster, _) = setup();
        let (conn, mut rx) = connect(&broadcaster).await;

        let replayed = broadcaster.subscribe(conn, Some(&op("later")), None).await;

        assert!(!replayed);
        assert!(rx.try_recv().is_err());
        assert!(
            broadcaster
                .registry()
                .is_subscribed_to_operation(conn, &op("later"))
                .await
        );
    }

    #[tokio::test]
    async fn farm_subscription_does_not_replay() {
        let (broadcaster, _) = setup();
        broadcaster
            .broadcast_operation_update(event("batch-1", 7, 10))
            .await;

        let (conn, mut rx) = connect(&broadcaster).await;
        let replayed = broadcaster.subscribe(conn, None, Some(FarmId::new(7))).await;

        assert!(!replayed);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn unsubscribe_stops_delivery() {
        let (broadcaster, _) = setup();
        let (conn, mut rx) = connect(&broadcaster).await;
        broadcaster.subscribe(conn, Some(&op("batch-1")), None).await;
        broadcaster.unsubscribe(conn, Some(&op("batch-1")), None).await;

        broadcaster
            .broadcast_operation_update(event("batch-1", 7, 10))
            .await;

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn disconnect_stops_delivery() {
        let (broadcaster, _) = setup();
        let (conn, mut rx) = connect(&broadcaster).await;
        broadcaster
            .subscribe(conn, Some(&op("batch-1")), Some(FarmId::new(7)))
            .await;
        broadcaster.disconnect(conn).await;

        let delivered = broadcaster
            .publish(MessageAction::Update, event("batch-1", 7, 10))
            .await;

        assert_eq!(delivered, 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn subscribe_after_disconnect_is_ignored() {
        let (broadcaster, _) = setup();
        let (conn, _rx) = connect(&broadcaster).await;
        broadcaster
            .publish(MessageAction::Update, event("batch-1", 7, 10))
            .await;
        broadcaster.disconnect(conn).await;

        let replayed = broadcaster
            .subscribe(conn, Some(&op("batch-1")), Some(FarmId::new(7)))
            .await;

        assert!(!replayed);
        assert_eq!(broadcaster.registry().operation_bucket_count().await, 0);
        assert_eq!(broadcaster.registry().farm_bucket_count().await, 0);
    }

    #[tokio::test]
    async fn active_operations_filtered_by_farm() {
        let (broadcaster, _) = setup();
        broadcaster.broadcast_operation_update(event("a", 7, 1)).await;
        broadcaster.broadcast_operation_update(event("b", 8, 1)).await;
        broadcaster.broadcast_operation_update(event("a", 7, 5)).await;

        let active = broadcaster
            .get_active_operations(FarmId::new(7))
            .await
            .unwrap();

        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, op("a"));
        assert_eq!(active[0].current, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn completed_operation_is_evicted_after_delay() {
        let (broadcaster, store) = setup();
        broadcaster
            .broadcast_operation_complete(event("batch-1", 7, 50))
            .await;

        tokio::time::sleep(Duration::from_secs(59)).await;
        assert!(broadcaster
            .get_operation_status(&op("batch-1"))
            .await
            .unwrap()
            .is_some());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(broadcaster
            .get_operation_status(&op("batch-1"))
            .await
            .unwrap()
            .is_none());
        assert_eq!(store.len().await.unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn updates_are_never_evicted() {
        let (broadcaster, _) = setup();
        broadcaster
            .broadcast_operation_update(event("batch-1", 7, 10))
            .await;

        tokio::time::sleep(Duration::from_secs(120)).await;

        assert!(broadcaster
            .get_operation_status(&op("batch-1"))
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn eviction_spares_snapshot_written_after_terminal_event() {
        let (broadcaster, _) = setup();
        broadcaster
            .broadcast_operation_complete(event("batch-1", 7, 50))
            .await;

        tokio::time::sleep(Duration::from_secs(30)).await;
        broadcaster
            .broadcast_operation_update(event("batch-1", 7, 5))
            .await;

        tokio::time::sleep(Duration::from_secs(31)).await;
        let status = broadcaster
            .get_operation_status(&op("batch-1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(status.current, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn custom_eviction_delay_is_honoured() {
        let store = Arc::new(InMemoryOperationStateStore::new());
        let broadcaster = BulkOperationBroadcaster::new(
            Arc::new(SubscriptionRegistry::with_default_capacity()),
            store,
        )
        .with_eviction_delay(Duration::from_secs(5));

        broadcaster
            .broadcast_operation_error(event("batch-1", 7, 10))
            .await;
        tokio::time::sleep(Duration::from_secs(6)).await;

        assert!(broadcaster
            .get_operation_status(&op("batch-1"))
            .await
            .unwrap()
            .is_none());
    }

    struct ExhaustedStore;

    #[async_trait]
    impl OperationStateStore for ExhaustedStore {
        async fn put(&self, _event: BulkOperationEvent) -> Result<Revision, StateStoreError> {
            Err(StateStoreError::RevisionExhausted)
        }

        async fn get(
            &self,
            _operation_id: &OperationId,
        ) -> Result<Option<BulkOperationEvent>, StateStoreError> {
            Ok(None)
        }

        async fn remove_if_revision(
            &self,
            _operation_id: &OperationId,
            _revision: Revision,
        ) -> Result<bool, StateStoreError> {
            Ok(false)
        }

        async fn list_for_farm(
            &self,
            _farm_id: FarmId,
        ) -> Result<Vec<BulkOperationEvent>, StateStoreError> {
            Ok(Vec::new())
        }

        async fn len(&self) -> Result<usize, StateStoreError> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn store_failure_does_not_stop_delivery() {
        let broadcaster = BulkOperationBroadcaster::new(
            Arc::new(SubscriptionRegistry::with_default_capacity()),
            Arc::new(ExhaustedStore),
        );
        let (conn, mut rx) = connect(&broadcaster).await;
        broadcaster.subscribe(conn, None, Some(FarmId::new(7))).await;

        broadcaster
            .broadcast_operation_complete(event("batch-1", 7, 50))
            .await;

        let received = rx.try_recv().unwrap();
        assert_eq!(received.action, MessageAction::Complete);
    }
}
