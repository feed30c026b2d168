// libs/notification-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::LocalizedText;

/// A persisted notification. Immutable once created, except for the read flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub sender_id: Option<Uuid>,
    pub receiver_id: Uuid,
    pub title: LocalizedText,
    pub message: LocalizedText,
    pub notification_type: Option<String>,
    #[serde(default)]
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateNotification {
    pub title: LocalizedText,
    pub message: LocalizedText,
    pub sender_id: Option<Uuid>,
    pub notification_type: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("Notification requires a title and a message")]
    MissingContent,

    #[error("Notification not found")]
    NotFound,

    #[error("Real-time delivery failed: {0}")]
    Delivery(String),

    #[error("Database error: {0}")]
    Database(String),
}
