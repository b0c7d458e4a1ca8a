//! Subscription registry for bulk operation progress routing.
//!
//! Tracks live connections and two subscription indexes:
//!
//! ```text
//! by operation id              by farm id
//! batch-1 ── conn-a, conn-b    farm 7 ── conn-b, conn-c
//! import-9 ── conn-c           farm 9 ── conn-d
//! ```
//!
//! Memberships are plain sets; they never own the connection. A bucket
//! that becomes empty is removed so idle keys do not accumulate.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::foundation::{FarmId, OperationId};

use super::messages::ServerMessage;

/// Unique identifier for a WebSocket client connection.
///
/// Generated server-side when a client connects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Create a new random connection ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outbound handle of one subscribed connection.
#[derive(Debug, Clone)]
pub struct Recipient {
    pub connection_id: ConnectionId,
    sender: mpsc::Sender<ServerMessage>,
}

impl Recipient {
    /// Whether the connection's transport is still accepting frames.
    pub fn is_open(&self) -> bool {
        !self.sender.is_closed()
    }

    /// Queue a frame without waiting.
    ///
    /// Returns false if the transport is closed or its buffer is full;
    /// the frame is dropped in both cases.
    pub fn try_deliver(&self, message: ServerMessage) -> bool {
        match self.sender.try_send(message) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::debug!(
                    connection_id = %self.connection_id,
                    "Outbound buffer full, dropping frame"
                );
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }
}

#[derive(Debug, Default)]
struct RegistryState {
    connections: HashMap<ConnectionId, mpsc::Sender<ServerMessage>>,
    by_operation: HashMap<OperationId, HashSet<ConnectionId>>,
    by_farm: HashMap<FarmId, HashSet<ConnectionId>>,
}

impl RegistryState {
    fn recipients<'a>(
        &'a self,
        members: Option<&'a HashSet<ConnectionId>>,
    ) -> Vec<Recipient> {
        members
            .into_iter()
            .flatten()
            .filter_map(|connection_id| {
                self.connections.get(connection_id).map(|sender| Recipient {
                    connection_id: *connection_id,
                    sender: sender.clone(),
                })
            })
            .collect()
    }
}

/// Manages live connections and their operation/farm subscriptions.
///
/// # Thread Safety
///
/// A single `RwLock` guards the connection table and both indexes so a
/// disconnect is never observed half-applied. Broadcast lookups take the
/// read side and copy out the recipients before sending.
#[derive(Debug)]
pub struct SubscriptionRegistry {
    state: RwLock<RegistryState>,

    /// Buffer size for each connection's outbound channel.
    channel_capacity: usize,
}

impl SubscriptionRegistry {
    /// Create a registry whose connections buffer `channel_capacity` frames.
    pub fn new(channel_capacity: usize) -> Self {
        Self {
            state: RwLock::new(RegistryState::default()),
            channel_capacity: channel_capacity.max(1),
        }
    }

    /// Create with default capacity (256 frames).
    pub fn with_default_capacity() -> Self {
        Self::new(256)
    }

    /// Register a live connection.
    ///
    /// Returns the receiver the socket writer drains. Dropping it marks the
    /// transport closed for every future broadcast.
    pub async fn register(&self, connection_id: ConnectionId) -> mpsc::Receiver<ServerMessage> {
        let (tx, rx) = mpsc::channel(self.channel_capacity);
        self.state.write().await.connections.insert(connection_id, tx);
        rx
    }

    /// Add a connection to the operation and/or farm index.
    ///
    /// Subscribing twice is a no-op. Connections that are not registered,
    /// including ones already disconnected, are ignored so no index can
    /// outlive its connection.
    ///
    /// Returns false if the connection is unknown.
    pub async fn subscribe(
        &self,
        connection_id: ConnectionId,
        operation_id: Option<&OperationId>,
        farm_id: Option<FarmId>,
    ) -> bool {
        let mut state = self.state.write().await;
        if !state.connections.contains_key(&connection_id) {
            tracing::debug!(
                connection_id = %connection_id,
                "Ignoring subscribe from unregistered connection"
            );
            return false;
        }
        if let Some(operation_id) = operation_id {
            state
                .by_operation
                .entry(operation_id.clone())
                .or_default()
                .insert(connection_id);
        }
        if let Some(farm_id) = farm_id {
            state.by_farm.entry(farm_id).or_default().insert(connection_id);
        }
        true
    }

    /// Remove a connection from the operation and/or farm index.
    pub async fn unsubscribe(
        &self,
        connection_id: ConnectionId,
        operation_id: Option<&OperationId>,
        farm_id: Option<FarmId>,
    ) {
        let mut state = self.state.write().await;
        if let Some(operation_id) = operation_id {
            remove_member(&mut state.by_operation, operation_id, &connection_id);
        }
        if let Some(farm_id) = farm_id {
            remove_member(&mut state.by_farm, &farm_id, &connection_id);
        }
    }

    /// Forget a connection entirely.
    ///
    /// Scans every bucket of both indexes.
    pub async fn on_disconnect(&self, connection_id: ConnectionId) {
        let mut state = self.state.write().await;
        state.connections.remove(&connection_id);
        purge_member(&mut state.by_operation, &connection_id);
        purge_member(&mut state.by_farm, &connection_id);
    }

    /// Live recipients subscribed to an operation.
    pub async fn operation_recipients(&self, operation_id: &OperationId) -> Vec<Recipient> {
        let state = self.state.read().await;
        state.recipients(state.by_operation.get(operation_id))
    }

    /// Live recipients subscribed to a farm.
    pub async fn farm_recipients(&self, farm_id: FarmId) -> Vec<Recipient> {
        let state = self.state.read().await;
        state.recipients(state.by_farm.get(&farm_id))
    }

    /// Queue a frame for a single connection.
    ///
    /// Returns false if the connection is unknown, closed or backed up.
    pub async fn send_to(&self, connection_id: ConnectionId, message: ServerMessage) -> bool {
        let sender = self.state.read().await.connections.get(&connection_id).cloned();
        match sender {
            Some(sender) => Recipient {
                connection_id,
                sender,
            }
            .try_deliver(message),
            None => false,
        }
    }

    /// Number of registered connections.
    pub async fn connection_count(&self) -> usize {
        self.state.read().await.connections.len()
    }

    /// Number of operation ids with at least one subscriber.
    pub async fn operation_bucket_count(&self) -> usize {
        self.state.read().await.by_operation.len()
    }

    /// Number of farm ids with at least one subscriber.
    pub async fn farm_bucket_count(&self) -> usize {
        self.state.read().await.by_farm.len()
    }

    /// Whether a connection is in the given operation's bucket.
    pub async fn is_subscribed_to_operation(
        &self,
        connection_id: ConnectionId,
        operation_id: &OperationId,
    ) -> bool {
        self.state
            .read()
            .await
            .by_operation
            .get(operation_id)
            .is_some_and(|members| members.contains(&connection_id))
    }
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

fn remove_member<K: Eq + Hash>(
    index: &mut HashMap<K, HashSet<ConnectionId>>,
    key: &K,
    connection_id: &ConnectionId,
) {
    if let Some(members) = index.get_mut(key) {
        members.remove(connection_id);
        if members.is_empty() {
            index.remove(key);
        }
    }
}

fn purge_member<K: Eq + Hash>(
    index: &mut HashMap<K, HashSet<ConnectionId>>,
    connection_id: &ConnectionId,
) {
    index.retain(|_, members| {
        members.remove(connection_id);
        !members.is_empty()
    });
}
