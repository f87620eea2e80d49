// libs/billing-cell/src/services/prior_visit.rs
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Method;
use std::sync::Arc;
use tracing::{debug, error};
use uuid::Uuid;

use shared_database::supabase::SupabaseClient;

use crate::models::{day_after, Appointment, AppointmentStatus, BillingError, PriorVisit};

/// Parameters of a prior-visit query for one appointment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorVisitQuery {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub excluding_appointment_id: Uuid,
    /// Visits dated after this calendar day are never considered.
    pub on_or_before: NaiveDate,
}

impl PriorVisitQuery {
    pub fn for_appointment(appointment: &Appointment) -> Self {
        Self {
            patient_id: appointment.patient_id,
            doctor_id: appointment.doctor_id,
            excluding_appointment_id: appointment.id,
            on_or_before: appointment.appointment_date,
        }
    }
}

/// Finds the most recent completed visit a return visit is measured against.
#[async_trait]
pub trait PriorVisitLookup: Send + Sync {
    async fn most_recent_completed_visit(
        &self,
        query: &PriorVisitQuery,
    ) -> Result<Option<PriorVisit>, BillingError>;
}

pub struct SupabasePriorVisitLookup {
    supabase: Arc<SupabaseClient>,
    auth_token: String,
}

impl SupabasePriorVisitLookup {
    pub fn new(supabase: Arc<SupabaseClient>, auth_token: impl Into<String>) -> Self {
        Self {
            supabase,
            auth_token: auth_token.into(),
        }
    }
}

#[async_trait]
impl PriorVisitLookup for SupabasePriorVisitLookup {
    async fn most_recent_completed_visit(
        &self,
        query: &PriorVisitQuery,
    ) -> Result<Option<PriorVisit>, BillingError> {
        debug!(
            "Looking up prior visit for patient {} with doctor {} (excluding {})",
            query.patient_id, query.doctor_id, query.excluding_appointment_id
        );

        let path = format!(
            "/rest/v1/appointments?select=id,appointment_date&patient_id=eq.{}&doctor_id=eq.{}&status=eq.completed&id=neq.{}&appointment_date=lt.{}&order=appointment_date.desc&limit=1",
            query.patient_id,
            query.doctor_id,
            query.excluding_appointment_id,
            day_after(query.on_or_before).format("%Y-%m-%d"),
        );

        let rows: Vec<PriorVisit> = self
            .supabase
            .request(Method::GET, &path, Some(&self.auth_token), None)
            .await
            .map_err(|e| {
                error!("Prior visit lookup failed for appointment {}: {}", query.excluding_appointment_id, e);
                BillingError::LookupFailed {
                    appointment_id: query.excluding_appointment_id,
                    reason: e.to_string(),
                }
            })?;

        Ok(rows.into_iter().next())
    }
}

/// Lookup over visits already held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryVisitHistory {
    visits: Vec<Appointment>,
}

impl InMemoryVisitHistory {
    pub fn new(visits: Vec<Appointment>) -> Self {
        Self { visits }
    }

    pub fn record(&mut self, appointment: Appointment) {
        self.visits.push(appointment);
    }

    pub fn len(&self) -> usize {
        self.visits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visits.is_empty()
    }
}

#[async_trait]
impl PriorVisitLookup for InMemoryVisitHistory {
    async fn most_recent_completed_visit(
        &self,
        query: &PriorVisitQuery,
    ) -> Result<Option<PriorVisit>, BillingError> {
        let prior = self
            .visits
            .iter()
            .filter(|visit| {
                visit.patient_id == query.patient_id
                    && visit.doctor_id == query.doctor_id
                    && visit.id != query.excluding_appointment_id
                    && visit.status == AppointmentStatus::Completed
                    && visit.appointment_date <= query.on_or_before
            })
            .max_by_key(|visit| visit.appointment_date)
            .map(|visit| PriorVisit {
                appointment_id: visit.id,
                appointment_date: visit.appointment_date,
            });

        Ok(prior)
    }
}
