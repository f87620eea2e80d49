// libs/billing-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use chrono::NaiveDate;
use headers::{Authorization, authorization::Bearer};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::error::AppError;

use crate::models::{BillingError, UpdateFeePolicyRequest, UpdateStatusRequest};
use crate::services::fee_policy::FeePolicyService;
use crate::services::ledger::AppointmentLedgerService;
use crate::services::revenue::DailyRevenueService;

// ==============================================================================
// QUERY PARAMETER STRUCTS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct DailyRevenueQuery {
    pub date: NaiveDate,
}

// ==============================================================================
// REVENUE HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_daily_revenue(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(query): Query<DailyRevenueQuery>,
) -> Result<Json<Value>, AppError> {
    let revenue_service = DailyRevenueService::new(&state);

    let report = revenue_service.daily_report(query.date, auth.token()).await
        .map_err(map_billing_error)?;

    Ok(Json(json!({
        "success": true,
        "report": report
    })))
}

#[axum::debug_handler]
pub async fn get_appointment_charge(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let revenue_service = DailyRevenueService::new(&state);

    let charge = revenue_service.quote_appointment(appointment_id, auth.token()).await
        .map_err(map_billing_error)?;

    Ok(Json(json!({
        "success": true,
        "charge": charge
    })))
}

// ==============================================================================
// APPOINTMENT STATUS HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn update_appointment_status(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Value>, AppError> {
    let ledger_service = AppointmentLedgerService::new(Arc::new(SupabaseClient::new(&state)));

    let appointment = ledger_service.update_status(appointment_id, request.status, auth.token()).await
        .map_err(map_billing_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": format!("Appointment status updated to {}", appointment.status)
    })))
}

// ==============================================================================
// FEE POLICY HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_fee_policy(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let fee_policy_service = FeePolicyService::new(Arc::new(SupabaseClient::new(&state)));

    let policy = fee_policy_service.get_fee_policy(doctor_id, auth.token()).await
        .map_err(map_billing_error)?;

    Ok(Json(json!({
        "success": true,
        "fee_policy": policy
    })))
}

#[axum::debug_handler]
pub async fn update_fee_policy(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<UpdateFeePolicyRequest>,
) -> Result<Json<Value>, AppError> {
    let fee_policy_service = FeePolicyService::new(Arc::new(SupabaseClient::new(&state)));

    let policy = fee_policy_service.update_fee_policy(doctor_id, request, auth.token()).await
        .map_err(map_billing_error)?;

    Ok(Json(json!({
        "success": true,
        "fee_policy": policy,
        "message": "Fee policy updated successfully"
    })))
}

fn map_billing_error(e: BillingError) -> AppError {
    match e {
        BillingError::AppointmentNotFound(_) | BillingError::DoctorNotFound(_) => {
            AppError::NotFound(e.to_string())
        },
        BillingError::NotBillable(_) | BillingError::InvalidStatusTransition { .. } => {
            AppError::Conflict(e.to_string())
        },
        BillingError::InvalidFeePolicy(msg) => AppError::ValidationError(msg),
        BillingError::LookupFailed { .. } | BillingError::DatabaseError(_) => {
            AppError::Database(e.to_string())
        },
        BillingError::AmountOverflow(_) => AppError::Internal(e.to_string()),
    }
}
