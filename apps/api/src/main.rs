use std::net::SocketAddr;
use std::sync::Arc;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{CorsLayer, Any};
use tower_http::trace::{self, TraceLayer};
use tracing::{Level, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use notification_cell::events::EventPublisher;
use notification_cell::services::consumer::EventConsumer;
use notification_cell::services::notification::NotificationService;
use notification_cell::services::presence::PresenceRegistry;
use shared_config::AppConfig;
use shared_database::SupabaseClient;

#[tokio::main]
async fn main() {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Clinic API server");

    // Load configuration
    let config = Arc::new(AppConfig::from_env());

    // Shared in-process state: WebSocket presence and the outbound event queue
    let presence = PresenceRegistry::default();
    let (events, events_rx) = EventPublisher::channel();

    // Drain the event queue into persisted + pushed notifications
    let consumer = EventConsumer::new(
        NotificationService::new(
            Arc::new(SupabaseClient::new(&config)),
            presence.clone(),
        ),
        config.supabase_service_key.clone(),
    );
    tokio::spawn(consumer.run(events_rx));

    // Set up CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build the application router
    let app = router::create_router(config, presence, events)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new()
                    .level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new()
                    .level(Level::INFO)),
        )
        .layer(cors);

    // Run the server
    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app)
        .await
        .unwrap();
}
