// libs/notification-cell/src/services/notification.rs
use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_database::SupabaseClient;

use crate::models::{CreateNotification, Notification, NotificationError};
use crate::services::presence::PresenceRegistry;

const NOTIFICATION_FETCH_LIMIT: u32 = 100;

pub struct NotificationService {
    supabase: Arc<SupabaseClient>,
    presence: PresenceRegistry,
}

impl NotificationService {
    pub fn new(supabase: Arc<SupabaseClient>, presence: PresenceRegistry) -> Self {
        Self { supabase, presence }
    }

    /// Persist a notification, then attempt real-time delivery. The persisted
    /// row is the source of truth; delivery to an absent or broken session is
    /// skipped without surfacing an error.
    pub async fn create_notification(
        &self,
        receiver_id: Uuid,
        data: CreateNotification,
        auth_token: &str,
    ) -> Result<Notification, NotificationError> {
        if data.title.is_empty() || data.message.is_empty() {
            return Err(NotificationError::MissingContent);
        }

        let row = json!({
            "sender_id": data.sender_id,
            "receiver_id": receiver_id,
            "title": data.title,
            "message": data.message,
            "notification_type": data.notification_type,
            "read": false,
            "created_at": Utc::now().to_rfc3339(),
        });

        let created = self
            .supabase
            .insert_returning("notifications", row, auth_token)
            .await
            .map_err(|e| NotificationError::Database(e.to_string()))?;

        let notification: Notification = serde_json::from_value(created)
            .map_err(|e| NotificationError::Database(e.to_string()))?;

        self.deliver(receiver_id, &notification).await;

        Ok(notification)
    }

    /// Best-effort push over the receiver's live session, if any.
    async fn deliver(&self, receiver_id: Uuid, notification: &Notification) {
        match self.presence.lookup(receiver_id).await {
            Some(connection) => {
                let payload = json!({
                    "event": "notification",
                    "data": notification,
                });
                if let Err(e) = connection.send(payload) {
                    warn!("Failed to push notification to user {}: {}", receiver_id, e);
                }
            }
            None => {
                debug!("User {} not connected, skipping real-time delivery", receiver_id);
            }
        }
    }

    /// The receiver's most recent notifications, newest first.
    pub async fn get_notifications(
        &self,
        user_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<Notification>, NotificationError> {
        let path = format!(
            "/rest/v1/notifications?receiver_id=eq.{}&order=created_at.desc&limit={}",
            user_id, NOTIFICATION_FETCH_LIMIT
        );

        self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| NotificationError::Database(e.to_string()))
    }

    /// Idempotent read-flag flip.
    pub async fn mark_as_read(
        &self,
        notification_id: Uuid,
        auth_token: &str,
    ) -> Result<Notification, NotificationError> {
        let updated = self
            .supabase
            .update_returning(
                "notifications",
                &format!("id=eq.{}", notification_id),
                json!({ "read": true }),
                auth_token,
            )
            .await
            .map_err(|e| NotificationError::Database(e.to_string()))?;

        let row: Value = updated.into_iter().next().ok_or(NotificationError::NotFound)?;
        serde_json::from_value(row).map_err(|e| NotificationError::Database(e.to_string()))
    }
}
