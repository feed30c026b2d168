use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use notification_cell::events::EventPublisher;
use notification_cell::handlers::NotificationState;
use notification_cell::router::notification_routes;
use notification_cell::services::presence::PresenceRegistry;
use patient_cell::router::patient_routes;
use scheduling_cell::handlers::SchedulingState;
use scheduling_cell::router::scheduling_routes;
use shared_config::AppConfig;
use subscription_cell::router::subscription_routes;

pub fn create_router(
    config: Arc<AppConfig>,
    presence: PresenceRegistry,
    events: EventPublisher,
) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic API is running!" }))
        .nest(
            "/appointments",
            scheduling_routes(SchedulingState {
                config: config.clone(),
                events,
            }),
        )
        .nest("/patients", patient_routes(config.clone()))
        .nest(
            "/notifications",
            notification_routes(NotificationState {
                config: config.clone(),
                presence,
            }),
        )
        .nest("/subscriptions", subscription_routes(config))
}
