use serde_json::json;
use uuid::Uuid;

use notification_cell::services::presence::{ClientConnection, PresenceRegistry};

#[tokio::test]
async fn last_connection_wins() {
    let registry = PresenceRegistry::new();
    let user_id = Uuid::new_v4();

    let (first, mut first_outbox) = ClientConnection::new();
    let (second, mut second_outbox) = ClientConnection::new();

    registry.register(user_id, first).await;
    registry.register(user_id, second).await;

    let current = registry.lookup(user_id).await.unwrap();
    current.send(json!({ "event": "ping" })).unwrap();

    assert!(second_outbox.try_recv().is_ok());
    assert!(first_outbox.try_recv().is_err());
}

#[tokio::test]
async fn unregister_removes_the_session() {
    let registry = PresenceRegistry::new();
    let user_id = Uuid::new_v4();

    let (connection, _outbox) = ClientConnection::new();
    let connection_id = connection.connection_id;
    registry.register(user_id, connection).await;

    registry.unregister(connection_id).await;
    assert!(registry.lookup(user_id).await.is_none());
    assert!(registry.connected_users().await.is_empty());
}

#[tokio::test]
async fn stale_disconnect_does_not_evict_the_newer_session() {
    let registry = PresenceRegistry::new();
    let user_id = Uuid::new_v4();

    let (old, _old_outbox) = ClientConnection::new();
    let old_id = old.connection_id;
    registry.register(user_id, old).await;

    let (new, _new_outbox) = ClientConnection::new();
    let new_id = new.connection_id;
    registry.register(user_id, new).await;

    // The old socket's teardown fires after the replacement.
    registry.unregister(old_id).await;

    let current = registry.lookup(user_id).await.unwrap();
    assert_eq!(current.connection_id, new_id);
}
