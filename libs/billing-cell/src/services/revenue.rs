// libs/billing-cell/src/services/revenue.rs
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{BillingError, ChargeLine, CompletedAppointment, DailyRevenueReport};
use crate::services::calculator::RevenueCalculator;
use crate::services::fee_policy::FeePolicyService;
use crate::services::ledger::AppointmentLedgerService;
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::prior_visit::{PriorVisitLookup, PriorVisitQuery, SupabasePriorVisitLookup};

pub struct DailyRevenueService {
    supabase: Arc<SupabaseClient>,
    ledger_service: AppointmentLedgerService,
    fee_policy_service: FeePolicyService,
    lifecycle_service: AppointmentLifecycleService,
    calculator: RevenueCalculator,
}

impl DailyRevenueService {
    pub fn new(config: &AppConfig) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));

        Self {
            ledger_service: AppointmentLedgerService::new(Arc::clone(&supabase)),
            fee_policy_service: FeePolicyService::new(Arc::clone(&supabase)),
            lifecycle_service: AppointmentLifecycleService::new(),
            calculator: RevenueCalculator::from_config(config),
            supabase,
        }
    }

    /// Itemised revenue for every completed appointment on `date`
    pub async fn daily_report(
        &self,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<DailyRevenueReport, BillingError> {
        info!("Building revenue report for {}", date);

        let appointments: Vec<_> = self
            .ledger_service
            .get_completed_appointments(date, auth_token)
            .await?
            .into_iter()
            .filter(|appointment| {
                let billable = self.lifecycle_service.is_billable(appointment.status)
                    && appointment.appointment_date == date;
                if !billable {
                    warn!(
                        "Skipping appointment {} ({} on {}) returned for {}",
                        appointment.id, appointment.status, appointment.appointment_date, date
                    );
                }
                billable
            })
            .collect();

        let doctor_ids: Vec<Uuid> = appointments.iter().map(|a| a.doctor_id).collect();
        let fee_policies = self
            .fee_policy_service
            .get_fee_policies(&doctor_ids, auth_token)
            .await?;

        let entries: Vec<CompletedAppointment> = appointments
            .into_iter()
            .map(|appointment| {
                let fee_policy = fee_policies.get(&appointment.doctor_id).cloned();
                CompletedAppointment::new(appointment, fee_policy)
            })
            .collect();

        let lookup = SupabasePriorVisitLookup::new(Arc::clone(&self.supabase), auth_token);
        let prior_visits = self.calculator.resolve_prior_visits(&entries, &lookup).await?;

        self.calculator.build_daily_report(date, &entries, &prior_visits)
    }

    /// What a single appointment would contribute once completed
    pub async fn quote_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<ChargeLine, BillingError> {
        let appointment = self.ledger_service.get_appointment(appointment_id, auth_token).await?;

        if !self.lifecycle_service.is_quotable(appointment.status) {
            return Err(BillingError::NotBillable(appointment.status));
        }

        let fee_policy = self
            .fee_policy_service
            .get_fee_policies(&[appointment.doctor_id], auth_token)
            .await?
            .remove(&appointment.doctor_id);

        if fee_policy.is_none() {
            warn!("Doctor {} has no fee policy record", appointment.doctor_id);
        }

        let prior_visit = if appointment.is_return_visit {
            let lookup = SupabasePriorVisitLookup::new(Arc::clone(&self.supabase), auth_token);
            lookup
                .most_recent_completed_visit(&PriorVisitQuery::for_appointment(&appointment))
                .await?
        } else {
            None
        };

        let charge = self.calculator.calculate_charge(
            &appointment,
            fee_policy.as_ref(),
            prior_visit.as_ref(),
        );

        info!("Quoted appointment {} at {}", appointment_id, charge.amount);
        Ok(charge)
    }
}
