// libs/subscription-cell/src/router.rs
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;

use crate::handlers;

pub fn subscription_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/trial", post(handlers::start_trial))
        .route("/subscribe", post(handlers::subscribe))
        .route("/renew", post(handlers::renew))
        .route("/sweep", get(handlers::run_sweep))
        .with_state(state)
}
