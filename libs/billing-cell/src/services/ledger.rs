// libs/billing-cell/src/services/ledger.rs
use chrono::NaiveDate;
use reqwest::{header::{HeaderMap, HeaderValue}, Method};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use shared_database::supabase::SupabaseClient;

use crate::models::{day_after, Appointment, AppointmentStatus, BillingError};
use crate::services::lifecycle::AppointmentLifecycleService;

pub const APPOINTMENT_COLUMNS: &str =
    "id,patient_id,doctor_id,appointment_date,status,cost,is_return_visit";

/// Reads and status updates on appointment rows.
pub struct AppointmentLedgerService {
    supabase: Arc<SupabaseClient>,
    lifecycle_service: AppointmentLifecycleService,
}

impl AppointmentLedgerService {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self {
            supabase,
            lifecycle_service: AppointmentLifecycleService::new(),
        }
    }

    pub async fn get_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, BillingError> {
        let path = format!("/rest/v1/appointments?select={}&id=eq.{}", APPOINTMENT_COLUMNS, appointment_id);

        let rows: Vec<Appointment> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| BillingError::DatabaseError(e.to_string()))?;

        rows.into_iter().next().ok_or(BillingError::AppointmentNotFound(appointment_id))
    }

    /// Completed appointments dated on `date`.
    ///
    /// `appointment_date` may hold a timestamp, so the filter is the half-open day `[date, date + 1)`.
    pub async fn get_completed_appointments(
        &self,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, BillingError> {
        debug!("Fetching completed appointments for {}", date);

        let path = format!(
            "/rest/v1/appointments?select={}&appointment_date=gte.{}&appointment_date=lt.{}&status=eq.completed",
            APPOINTMENT_COLUMNS,
            date.format("%Y-%m-%d"),
            day_after(date).format("%Y-%m-%d"),
        );

        self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| BillingError::DatabaseError(e.to_string()))
    }

    /// Move an appointment along the staff workflow
    pub async fn update_status(
        &self,
        appointment_id: Uuid,
        new_status: AppointmentStatus,
        auth_token: &str,
    ) -> Result<Appointment, BillingError> {
        let current = self.get_appointment(appointment_id, auth_token).await?;
        self.lifecycle_service.validate_status_transition(current.status, new_status)?;

        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        let path = format!("/rest/v1/appointments?id=eq.{}&select={}", appointment_id, APPOINTMENT_COLUMNS);
        let rows: Vec<Appointment> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(json!({ "status": new_status })),
                Some(headers),
            )
            .await
            .map_err(|e| BillingError::DatabaseError(e.to_string()))?;

        let updated = rows.into_iter().next().ok_or(BillingError::AppointmentNotFound(appointment_id))?;
        info!("Appointment {} moved from {} to {}", appointment_id, current.status, updated.status);

        Ok(updated)
    }
}
