// libs/notification-cell/src/router.rs
use axum::{
    routing::{get, patch},
    Router,
};

use crate::handlers::{self, NotificationState};

pub fn notification_routes(state: NotificationState) -> Router {
    Router::new()
        .route("/", get(handlers::get_notifications))
        .route("/{notification_id}/read", patch(handlers::mark_as_read))
        .route("/ws", get(handlers::websocket_handler))
        .with_state(state)
}
