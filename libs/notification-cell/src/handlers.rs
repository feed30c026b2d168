// libs/notification-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, Query, State, WebSocketUpgrade,
    },
    response::Response,
    Json,
};
use axum_extra::TypedHeader;
use futures::{SinkExt, StreamExt};
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::SupabaseClient;
use shared_models::error::AppError;

use crate::models::NotificationError;
use crate::services::notification::NotificationService;
use crate::services::presence::{ClientConnection, PresenceRegistry};

#[derive(Clone)]
pub struct NotificationState {
    pub config: Arc<AppConfig>,
    pub presence: PresenceRegistry,
}

#[derive(Debug, Deserialize)]
pub struct NotificationQuery {
    pub user_id: Uuid,
}

fn map_notification_error(e: NotificationError) -> AppError {
    match e {
        NotificationError::MissingContent => AppError::Validation(e.to_string()),
        NotificationError::NotFound => AppError::NotFound("Notification not found".to_string()),
        NotificationError::Database(msg) => AppError::Database(msg),
        NotificationError::Delivery(msg) => AppError::Internal(msg),
    }
}

fn build_service(state: &NotificationState) -> NotificationService {
    NotificationService::new(
        Arc::new(SupabaseClient::new(&state.config)),
        state.presence.clone(),
    )
}

#[axum::debug_handler]
pub async fn get_notifications(
    State(state): State<NotificationState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(query): Query<NotificationQuery>,
) -> Result<Json<Value>, AppError> {
    let service = build_service(&state);
    let notifications = service
        .get_notifications(query.user_id, auth.token())
        .await
        .map_err(map_notification_error)?;

    Ok(Json(json!({ "notifications": notifications })))
}

#[axum::debug_handler]
pub async fn mark_as_read(
    State(state): State<NotificationState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(notification_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = build_service(&state);
    let notification = service
        .mark_as_read(notification_id, auth.token())
        .await
        .map_err(map_notification_error)?;

    Ok(Json(json!({ "notification": notification })))
}

/// Real-time channel. The first text frame is the user id to register under;
/// afterwards the socket only receives pushes until it closes.
pub async fn websocket_handler(
    State(state): State<NotificationState>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state.presence.clone()))
}

async fn handle_socket(mut socket: WebSocket, presence: PresenceRegistry) {
    let user_id = match socket.recv().await {
        Some(Ok(Message::Text(text))) => match Uuid::parse_str(text.trim()) {
            Ok(id) => id,
            Err(_) => {
                warn!("Rejecting websocket registration with invalid user id");
                let _ = socket
                    .send(Message::Text("{\"error\":\"invalid user id\"}".into()))
                    .await;
                return;
            }
        },
        _ => return,
    };

    let (connection, mut outbox) = ClientConnection::new();
    let connection_id = connection.connection_id;
    presence.register(user_id, connection).await;

    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            payload = outbox.recv() => match payload {
                Some(value) => {
                    if sink.send(Message::Text(value.to_string().into())).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {
                    debug!("Ignoring inbound frame from user {}", user_id);
                }
            },
        }
    }

    presence.unregister(connection_id).await;
}
