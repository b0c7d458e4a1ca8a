//! End-to-end tests for the `/ws/bulk-operations` endpoint.
//!
//! Serves the real router on an ephemeral port and drives it with a
//! WebSocket client, so the socket read/write loop and disconnect cleanup
//! run exactly as in production.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use farmkonnect::adapters::websocket::{
    websocket_router, BulkOperationBroadcaster, MessageAction, ServerMessage,
    SubscriptionRegistry, WebSocketState,
};
use farmkonnect::adapters::InMemoryOperationStateStore;
use farmkonnect::domain::bulk_operation::{
    BulkOperationEvent, BulkOperationStatus, BulkOperationType,
};
use farmkonnect::domain::foundation::{FarmId, OperationId, UserId};
use farmkonnect::ports::BulkOperationNotifier;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const FRAME_TIMEOUT: Duration = Duration::from_secs(5);

// =============================================================================
// Test Infrastructure
// =============================================================================

async fn serve() -> (SocketAddr, Arc<BulkOperationBroadcaster>) {
    let broadcaster = Arc::new(BulkOperationBroadcaster::new(
        Arc::new(SubscriptionRegistry::with_default_capacity()),
        Arc::new(InMemoryOperationStateStore::new()),
    ));
    let app = websocket_router().with_state(WebSocketState::new(broadcaster.clone()));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, broadcaster)
}

async fn connect(addr: SocketAddr) -> Client {
    let url = format!("ws://{}/ws/bulk-operations", addr);
    let (client, _) = connect_async(url).await.unwrap();
    client
}

async fn send_text(client: &mut Client, text: &str) {
    client.send(Message::Text(text.to_string())).await.unwrap();
}

/// Next server frame, skipping keepalives.
async fn next_message(client: &mut Client) -> ServerMessage {
    loop {
        let frame = tokio::time::timeout(FRAME_TIMEOUT, client.next())
            .await
            .expect("timed out waiting for frame")
            .expect("connection closed")
            .unwrap();
        match frame {
            Message::Text(text) => return serde_json::from_str(&text).unwrap(),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected frame: {:?}", other),
        }
    }
}

fn progress(current: u64) -> BulkOperationEvent {
    let mut event = BulkOperationEvent::new(
        OperationId::new("batch-1").unwrap(),
        BulkOperationType::BatchEdit,
        FarmId::new(7),
        UserId::new(1),
        50,
    );
    event.status = BulkOperationStatus::InProgress;
    event.current = current;
    event
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn invalid_frame_gets_error_and_connection_stays_open() {
    let (addr, broadcaster) = serve().await;
    broadcaster.broadcast_operation_update(progress(10)).await;
    let mut client = connect(addr).await;

    send_text(&mut client, "this is not json").await;
    let reply = next_message(&mut client).await;
    assert_eq!(reply.action, MessageAction::Error);
    assert!(reply.error.is_some());
    assert!(reply.event.is_none());

    // The replayed snapshot proves the subscription is live before publishing
    send_text(&mut client, r#"{"action":"subscribe","operationId":"batch-1"}"#).await;
    let replay = next_message(&mut client).await;
    assert_eq!(replay.action, MessageAction::Update);
    assert_eq!(replay.event.unwrap().current, 10);

    broadcaster.broadcast_operation_update(progress(20)).await;
    let update = next_message(&mut client).await;
    assert_eq!(update.action, MessageAction::Update);
    assert_eq!(update.event.unwrap().current, 20);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn binary_frame_is_ignored() {
    let (addr, broadcaster) = serve().await;
    broadcaster.broadcast_operation_update(progress(10)).await;
    let mut client = connect(addr).await;

    client.send(Message::Binary(vec![1, 2, 3])).await.unwrap();
    send_text(&mut client, r#"{"action":"subscribe","operationId":"batch-1"}"#).await;

    let first = next_message(&mut client).await;
    assert_eq!(first.action, MessageAction::Update);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn closing_the_socket_removes_every_subscription() {
    let (addr, broadcaster) = serve().await;
    broadcaster.broadcast_operation_update(progress(10)).await;
    let mut client = connect(addr).await;

    send_text(
        &mut client,
        r#"{"action":"subscribe","operationId":"batch-1","farmId":7}"#,
    )
    .await;
    next_message(&mut client).await;

    let registry = broadcaster.registry().clone();
    assert_eq!(registry.operation_bucket_count().await, 1);
    assert_eq!(registry.farm_bucket_count().await, 1);

    client.close(None).await.unwrap();

    tokio::time::timeout(FRAME_TIMEOUT, async {
        while registry.connection_count().await > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("connection was not cleaned up");

    assert_eq!(registry.operation_bucket_count().await, 0);
    assert_eq!(registry.farm_bucket_count().await, 0);
}
