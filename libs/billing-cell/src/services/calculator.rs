// libs/billing-cell/src/services/calculator.rs
use chrono::NaiveDate;
use futures::{stream, StreamExt, TryStreamExt};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, error, info, warn};

use shared_config::{AppConfig, DEFAULT_FREE_RETURN_DAYS, DEFAULT_LOOKUP_CONCURRENCY};

use crate::models::{
    Appointment, BillingError, ChargeBasis, ChargeLine, CompletedAppointment,
    DailyRevenueReport, DoctorFeePolicy, DoctorRevenue, FeeSource, Money, PriorVisit,
};
use crate::services::prior_visit::{PriorVisitLookup, PriorVisitQuery};

/// Computes what completed appointments contribute to clinic revenue.
///
/// Pricing itself is pure: the only I/O is resolving prior visits for return
/// visits, which happens up front in `resolve_prior_visits` and fails as a whole
/// before any amount is computed.
pub struct RevenueCalculator {
    default_free_return_days: i64,
    lookup_concurrency: usize,
}

impl RevenueCalculator {
    pub fn new(default_free_return_days: i64, lookup_concurrency: usize) -> Self {
        Self {
            default_free_return_days,
            lookup_concurrency: lookup_concurrency.max(1),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.default_free_return_days, config.lookup_concurrency)
    }

    /// Price a single appointment given its doctor's policy and resolved prior visit
    pub fn calculate_charge(
        &self,
        appointment: &Appointment,
        fee_policy: Option<&DoctorFeePolicy>,
        prior_visit: Option<&PriorVisit>,
    ) -> ChargeLine {
        let (amount, fee_source, basis) = if !appointment.is_return_visit {
            let (amount, source) = standard_fee(appointment.cost, fee_policy);
            (amount, source, ChargeBasis::StandardVisit)
        } else {
            match prior_visit.and_then(|prior| days_since_prior(appointment, prior)) {
                None => {
                    let (amount, source) = return_fee(appointment.cost, fee_policy);
                    (amount, source, ChargeBasis::ReturnWithoutHistory)
                }
                Some((prior_visit_date, days_since_prior)) => {
                    let window = fee_policy
                        .map(|policy| policy.free_return_window(self.default_free_return_days))
                        .unwrap_or(self.default_free_return_days);

                    if days_since_prior <= window {
                        (
                            Money::ZERO,
                            FeeSource::Waived,
                            ChargeBasis::FreeReturn { prior_visit_date, days_since_prior },
                        )
                    } else {
                        let (amount, source) = return_fee(appointment.cost, fee_policy);
                        (
                            amount,
                            source,
                            ChargeBasis::PaidReturn { prior_visit_date, days_since_prior },
                        )
                    }
                }
            }
        };

        let amount = if amount.is_negative() {
            warn!("Appointment {} has negative fee {}, billing zero", appointment.id, amount);
            Money::ZERO
        } else {
            amount
        };

        debug!("Appointment {} contributes {} ({:?})", appointment.id, amount, basis);

        ChargeLine {
            appointment_id: appointment.id,
            patient_id: appointment.patient_id,
            doctor_id: appointment.doctor_id,
            appointment_date: appointment.appointment_date,
            amount,
            basis,
            fee_source,
        }
    }

    /// Resolve the prior visit of every return visit, in input order
    pub async fn resolve_prior_visits(
        &self,
        appointments: &[CompletedAppointment],
        lookup: &dyn PriorVisitLookup,
    ) -> Result<Vec<Option<PriorVisit>>, BillingError> {
        let queries: Vec<Option<PriorVisitQuery>> = appointments
            .iter()
            .map(|entry| {
                entry
                    .appointment
                    .is_return_visit
                    .then(|| PriorVisitQuery::for_appointment(&entry.appointment))
            })
            .collect();

        stream::iter(queries)
            .map(|query| async move {
                match query {
                    None => Ok(None),
                    Some(query) => lookup.most_recent_completed_visit(&query).await,
                }
            })
            .buffered(self.lookup_concurrency)
            .try_collect()
            .await
    }

    /// Price every appointment; `prior_visits` is positionally aligned with `appointments`
    pub fn calculate_charges(
        &self,
        appointments: &[CompletedAppointment],
        prior_visits: &[Option<PriorVisit>],
    ) -> Vec<ChargeLine> {
        appointments
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                self.calculate_charge(
                    &entry.appointment,
                    entry.fee_policy.as_ref(),
                    prior_visits.get(index).and_then(Option::as_ref),
                )
            })
            .collect()
    }

    /// Sum of `charges`; fails rather than wrapping when the total leaves the cent range
    pub fn calculate_total(&self, charges: &[ChargeLine]) -> Result<Money, BillingError> {
        charges.iter().try_fold(Money::ZERO, |total, charge| {
            total.checked_add(charge.amount).ok_or_else(|| {
                error!("Revenue total overflowed at appointment {}", charge.appointment_id);
                BillingError::AmountOverflow(charge.appointment_date.to_string())
            })
        })
    }

    /// Total revenue for a day's completed appointments
    pub async fn compute_daily_revenue(
        &self,
        appointments: &[CompletedAppointment],
        lookup: &dyn PriorVisitLookup,
    ) -> Result<Money, BillingError> {
        let prior_visits = self.resolve_prior_visits(appointments, lookup).await?;
        let charges = self.calculate_charges(appointments, &prior_visits);
        self.calculate_total(&charges)
    }

    /// Itemised report for a day, with per-doctor totals
    pub fn build_daily_report(
        &self,
        date: NaiveDate,
        appointments: &[CompletedAppointment],
        prior_visits: &[Option<PriorVisit>],
    ) -> Result<DailyRevenueReport, BillingError> {
        let line_items = self.calculate_charges(appointments, prior_visits);

        let missing_fee_policies: BTreeSet<_> = appointments
            .iter()
            .filter(|entry| entry.fee_policy.is_none())
            .map(|entry| entry.appointment.doctor_id)
            .collect();

        for doctor_id in &missing_fee_policies {
            warn!("Doctor {} has no fee policy record; standard fees billed as zero", doctor_id);
        }

        let mut by_doctor: BTreeMap<_, DoctorRevenue> = BTreeMap::new();
        for line in &line_items {
            let entry = by_doctor.entry(line.doctor_id).or_insert_with(|| DoctorRevenue {
                doctor_id: line.doctor_id,
                total_revenue: Money::ZERO,
                appointment_count: 0,
                free_return_count: 0,
            });
            entry.total_revenue = entry
                .total_revenue
                .checked_add(line.amount)
                .ok_or_else(|| BillingError::AmountOverflow(date.to_string()))?;
            entry.appointment_count += 1;
            if line.is_free_return() {
                entry.free_return_count += 1;
            }
        }

        let report = DailyRevenueReport {
            date,
            total_revenue: self.calculate_total(&line_items)?,
            appointment_count: line_items.len(),
            free_return_count: line_items.iter().filter(|line| line.is_free_return()).count(),
            paid_return_count: line_items.iter().filter(|line| line.is_paid_return()).count(),
            by_doctor: by_doctor.into_values().collect(),
            missing_fee_policies: missing_fee_policies.into_iter().collect(),
            line_items,
        };

        info!(
            "Revenue for {}: {} across {} appointments ({} free returns)",
            date, report.total_revenue, report.appointment_count, report.free_return_count
        );

        Ok(report)
    }
}

impl Default for RevenueCalculator {
    fn default() -> Self {
        Self::new(DEFAULT_FREE_RETURN_DAYS, DEFAULT_LOOKUP_CONCURRENCY)
    }
}

// ==============================================================================
// FEE CASCADE
// ==============================================================================

fn standard_fee(cost: Option<Money>, fee_policy: Option<&DoctorFeePolicy>) -> (Money, FeeSource) {
    cost.map(|cost| (cost, FeeSource::RecordedCost))
        .or_else(|| {
            fee_policy
                .and_then(|policy| policy.consultation_fee)
                .map(|fee| (fee, FeeSource::ConsultationFee))
        })
        .unwrap_or((Money::ZERO, FeeSource::Unset))
}

fn return_fee(cost: Option<Money>, fee_policy: Option<&DoctorFeePolicy>) -> (Money, FeeSource) {
    cost.map(|cost| (cost, FeeSource::RecordedCost))
        .or_else(|| {
            fee_policy
                .and_then(|policy| policy.return_consultation_fee)
                .map(|fee| (fee, FeeSource::ReturnConsultationFee))
        })
        .or_else(|| {
            fee_policy
                .and_then(|policy| policy.consultation_fee)
                .map(|fee| (fee, FeeSource::ConsultationFee))
        })
        .unwrap_or((Money::ZERO, FeeSource::Unset))
}

/// Whole days between the prior visit and this one; `None` if the prior visit is later.
fn days_since_prior(appointment: &Appointment, prior: &PriorVisit) -> Option<(NaiveDate, i64)> {
    let days = (appointment.appointment_date - prior.appointment_date).num_days();
    if days < 0 {
        debug!(
            "Prior visit {} is dated after appointment {}, ignoring",
            prior.appointment_id, appointment.id
        );
        return None;
    }
    Some((prior.appointment_date, days))
}
