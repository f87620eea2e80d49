// libs/billing-cell/src/router.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, patch},
};

use shared_config::AppConfig;

use crate::handlers;

pub fn billing_routes(state: Arc<AppConfig>) -> Router {
    // Bearer tokens are forwarded to the backend, whose row-level policies decide access
    Router::new()
        .route("/daily", get(handlers::get_daily_revenue))
        .route("/appointments/{appointment_id}/charge", get(handlers::get_appointment_charge))
        .route("/appointments/{appointment_id}/status", patch(handlers::update_appointment_status))
        .route(
            "/doctors/{doctor_id}/fee-policy",
            get(handlers::get_fee_policy).put(handlers::update_fee_policy),
        )
        .with_state(state)
}
