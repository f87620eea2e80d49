// libs/billing-cell/src/models.rs
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use uuid::Uuid;

// ==============================================================================
// MONEY
// ==============================================================================

/// Monetary amount held in minor units (cents).
///
/// Backend `numeric` values arrive in major units and are rounded to the nearest cent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// `None` when the amount is not finite or does not fit in cents.
    pub fn from_major(amount: f64) -> Option<Self> {
        let cents = (amount * 100.0).round();
        // `i64::MAX as f64` rounds up to 2^63, which is already out of range
        if cents.is_finite() && cents >= i64::MIN as f64 && cents < i64::MAX as f64 {
            Some(Money(cents as i64))
        } else {
            None
        }
    }

    pub fn cents(self) -> i64 {
        self.0
    }

    pub fn as_major(self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_major())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawAmount {
            Whole(i64),
            Fractional(f64),
            Text(String),
        }

        match RawAmount::deserialize(deserializer)? {
            RawAmount::Whole(units) => units
                .checked_mul(100)
                .map(Money)
                .ok_or_else(|| serde::de::Error::custom("monetary amount out of range")),
            RawAmount::Fractional(amount) => Money::from_major(amount)
                .ok_or_else(|| serde::de::Error::custom("monetary amount out of range")),
            RawAmount::Text(text) => text
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(Money::from_major)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid monetary amount: {}", text))),
        }
    }
}

// ==============================================================================
// APPOINTMENT AND FEE POLICY READ MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Waiting,
    Completed,
    Return,
    Cancelled,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Scheduled => write!(f, "scheduled"),
            AppointmentStatus::Waiting => write!(f, "waiting"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Return => write!(f, "return"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    #[serde(deserialize_with = "deserialize_calendar_date")]
    pub appointment_date: NaiveDate,
    pub status: AppointmentStatus,
    #[serde(default)]
    pub cost: Option<Money>,
    #[serde(default, deserialize_with = "deserialize_null_as_false")]
    pub is_return_visit: bool,
}

/// Fee schedule a doctor bills under. Every field but the id may be unset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DoctorFeePolicy {
    #[serde(alias = "id")]
    pub doctor_id: Uuid,
    #[serde(default)]
    pub consultation_fee: Option<Money>,
    #[serde(default)]
    pub return_consultation_fee: Option<Money>,
    #[serde(default)]
    pub free_return_days: Option<i64>,
}

impl DoctorFeePolicy {
    pub fn free_return_window(&self, default_days: i64) -> i64 {
        self.free_return_days.unwrap_or(default_days)
    }
}

/// Most recent completed visit for a patient/doctor pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriorVisit {
    #[serde(alias = "id")]
    pub appointment_id: Uuid,
    #[serde(deserialize_with = "deserialize_calendar_date")]
    pub appointment_date: NaiveDate,
}

/// A completed appointment paired with its doctor's fee policy, if one exists.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedAppointment {
    pub appointment: Appointment,
    pub fee_policy: Option<DoctorFeePolicy>,
}

impl CompletedAppointment {
    pub fn new(appointment: Appointment, fee_policy: Option<DoctorFeePolicy>) -> Self {
        Self { appointment, fee_policy }
    }
}

// ==============================================================================
// CHARGE AND REPORT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChargeBasis {
    StandardVisit,
    FreeReturn {
        prior_visit_date: NaiveDate,
        days_since_prior: i64,
    },
    PaidReturn {
        prior_visit_date: NaiveDate,
        days_since_prior: i64,
    },
    ReturnWithoutHistory,
}

/// Which step of the fee cascade produced the billed amount.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FeeSource {
    RecordedCost,
    ReturnConsultationFee,
    ConsultationFee,
    Unset,
    Waived,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChargeLine {
    pub appointment_id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub appointment_date: NaiveDate,
    pub amount: Money,
    pub basis: ChargeBasis,
    pub fee_source: FeeSource,
}

impl ChargeLine {
    pub fn is_free_return(&self) -> bool {
        matches!(self.basis, ChargeBasis::FreeReturn { .. })
    }

    pub fn is_paid_return(&self) -> bool {
        matches!(self.basis, ChargeBasis::PaidReturn { .. } | ChargeBasis::ReturnWithoutHistory)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DoctorRevenue {
    pub doctor_id: Uuid,
    pub total_revenue: Money,
    pub appointment_count: usize,
    pub free_return_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyRevenueReport {
    pub date: NaiveDate,
    pub total_revenue: Money,
    pub appointment_count: usize,
    pub free_return_count: usize,
    pub paid_return_count: usize,
    pub by_doctor: Vec<DoctorRevenue>,
    /// Doctors billed today with no fee policy record; their standard fees count as zero.
    pub missing_fee_policies: Vec<Uuid>,
    pub line_items: Vec<ChargeLine>,
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

pub const MAX_FREE_RETURN_DAYS: i64 = 365;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateFeePolicyRequest {
    pub consultation_fee: Option<Money>,
    pub return_consultation_fee: Option<Money>,
    pub free_return_days: Option<i64>,
}

impl UpdateFeePolicyRequest {
    pub fn validate(&self) -> Result<(), BillingError> {
        if self.consultation_fee.is_none()
            && self.return_consultation_fee.is_none()
            && self.free_return_days.is_none()
        {
            return Err(BillingError::InvalidFeePolicy(
                "At least one fee policy field must be provided".to_string(),
            ));
        }

        if self.consultation_fee.is_some_and(Money::is_negative) {
            return Err(BillingError::InvalidFeePolicy(
                "Consultation fee cannot be negative".to_string(),
            ));
        }

        if self.return_consultation_fee.is_some_and(Money::is_negative) {
            return Err(BillingError::InvalidFeePolicy(
                "Return consultation fee cannot be negative".to_string(),
            ));
        }

        if let Some(days) = self.free_return_days {
            if !(0..=MAX_FREE_RETURN_DAYS).contains(&days) {
                return Err(BillingError::InvalidFeePolicy(format!(
                    "Free return days must be between 0 and {}",
                    MAX_FREE_RETURN_DAYS
                )));
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: AppointmentStatus,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum BillingError {
    #[error("Appointment {0} not found")]
    AppointmentNotFound(Uuid),

    #[error("Doctor {0} not found")]
    DoctorNotFound(Uuid),

    #[error("Appointment in status {0} cannot be billed")]
    NotBillable(AppointmentStatus),

    #[error("Invalid status transition from {from} to {to}")]
    InvalidStatusTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Invalid fee policy: {0}")]
    InvalidFeePolicy(String),

    #[error("Prior visit lookup failed for appointment {appointment_id}: {reason}")]
    LookupFailed { appointment_id: Uuid, reason: String },

    #[error("Revenue total for {0} exceeds the representable amount")]
    AmountOverflow(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

// ==============================================================================
// SERDE HELPERS
// ==============================================================================

/// Accepts `YYYY-MM-DD` as well as full timestamps, keeping only the calendar date.
fn deserialize_calendar_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_calendar_date(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid appointment date: {}", raw)))
}

pub fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|dt| dt.date())
        })
}

/// First day after `date`, used as the exclusive upper bound of a day range.
pub fn day_after(date: NaiveDate) -> NaiveDate {
    date.succ_opt().unwrap_or(NaiveDate::MAX)
}

fn deserialize_null_as_false<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}
