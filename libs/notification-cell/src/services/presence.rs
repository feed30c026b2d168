// libs/notification-cell/src/services/presence.rs
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::debug;
use uuid::Uuid;

use crate::models::NotificationError;

/// One live real-time session. The sender half feeds the socket task that
/// owns the actual connection.
#[derive(Debug, Clone)]
pub struct ClientConnection {
    pub connection_id: Uuid,
    sender: mpsc::UnboundedSender<Value>,
}

impl ClientConnection {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Value>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self {
                connection_id: Uuid::new_v4(),
                sender,
            },
            receiver,
        )
    }

    pub fn send(&self, payload: Value) -> Result<(), NotificationError> {
        self.sender
            .send(payload)
            .map_err(|e| NotificationError::Delivery(e.to_string()))
    }
}

/// Process-wide map from user identity to their active connection, shared by
/// handle (`Arc` inside) so the server owns a single instance and hands out
/// clones. Purely in-memory: a restart or a second instance starts empty,
/// which is why delivery is always best-effort on top of the persisted row.
#[derive(Debug, Clone, Default)]
pub struct PresenceRegistry {
    connections: Arc<RwLock<HashMap<Uuid, ClientConnection>>>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection for a user. Last connection wins: any earlier
    /// session for the same user is dropped, not fanned out to.
    pub async fn register(&self, user_id: Uuid, connection: ClientConnection) {
        let mut connections = self.connections.write().await;
        if connections.insert(user_id, connection).is_some() {
            debug!("Replaced existing connection for user {}", user_id);
        } else {
            debug!("Registered connection for user {}", user_id);
        }
    }

    /// Remove the entry holding this connection, if it is still the current
    /// one. A stale disconnect (already replaced by a newer session) is a
    /// no-op.
    pub async fn unregister(&self, connection_id: Uuid) {
        let mut connections = self.connections.write().await;
        let owner = connections
            .iter()
            .find(|(_, conn)| conn.connection_id == connection_id)
            .map(|(user_id, _)| *user_id);

        if let Some(user_id) = owner {
            connections.remove(&user_id);
            debug!("Unregistered connection for user {}", user_id);
        }
    }

    pub async fn lookup(&self, user_id: Uuid) -> Option<ClientConnection> {
        let connections = self.connections.read().await;
        connections.get(&user_id).cloned()
    }

    pub async fn connected_users(&self) -> Vec<Uuid> {
        let connections = self.connections.read().await;
        connections.keys().copied().collect()
    }
}
