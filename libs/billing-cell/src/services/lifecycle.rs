// libs/billing-cell/src/services/lifecycle.rs
use tracing::{debug, info, warn};

use crate::models::{AppointmentStatus, BillingError};

pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Validate that a status transition is allowed
    pub fn validate_status_transition(
        &self,
        current_status: AppointmentStatus,
        new_status: AppointmentStatus,
    ) -> Result<(), BillingError> {
        debug!("Validating status transition from {} to {}", current_status, new_status);

        if !self.get_valid_transitions(current_status).contains(&new_status) {
            warn!("Invalid status transition attempted: {} -> {}", current_status, new_status);
            return Err(BillingError::InvalidStatusTransition {
                from: current_status,
                to: new_status,
            });
        }

        info!("Status transition validated: {} -> {}", current_status, new_status);
        Ok(())
    }

    /// Get all valid next statuses for a given current status
    pub fn get_valid_transitions(&self, current_status: AppointmentStatus) -> Vec<AppointmentStatus> {
        match current_status {
            AppointmentStatus::Scheduled => vec![
                AppointmentStatus::Waiting,
                AppointmentStatus::Return,
                AppointmentStatus::Completed,
                AppointmentStatus::Cancelled,
            ],
            AppointmentStatus::Waiting => vec![
                AppointmentStatus::Completed,
                AppointmentStatus::Return,
                AppointmentStatus::Cancelled,
            ],
            AppointmentStatus::Return => vec![
                AppointmentStatus::Waiting,
                AppointmentStatus::Completed,
                AppointmentStatus::Cancelled,
            ],
            // Historical records
            AppointmentStatus::Completed => vec![],
            AppointmentStatus::Cancelled => vec![],
        }
    }

    /// Only completed visits count towards revenue
    pub fn is_billable(&self, status: AppointmentStatus) -> bool {
        status == AppointmentStatus::Completed
    }

    /// Anything not cancelled can be priced ahead of time
    pub fn is_quotable(&self, status: AppointmentStatus) -> bool {
        status != AppointmentStatus::Cancelled
    }
}

impl Default for AppointmentLifecycleService {
    fn default() -> Self {
        Self::new()
    }
}
