use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use billing_cell::router::billing_routes;
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic billing API is running!" }))
        .nest("/billing", billing_routes(state))
}
