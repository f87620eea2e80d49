// libs/billing-cell/src/services/fee_policy.rs
use reqwest::{header::{HeaderMap, HeaderValue}, Method};
use serde_json::{Map, Value, json};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;

use shared_database::supabase::SupabaseClient;

use crate::models::{BillingError, DoctorFeePolicy, UpdateFeePolicyRequest};

pub const FEE_POLICY_COLUMNS: &str = "id,consultation_fee,return_consultation_fee,free_return_days";

pub struct FeePolicyService {
    supabase: Arc<SupabaseClient>,
}

impl FeePolicyService {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    /// Fee policy for one doctor
    pub async fn get_fee_policy(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<DoctorFeePolicy, BillingError> {
        debug!("Fetching fee policy for doctor {}", doctor_id);

        let path = format!("/rest/v1/doctors?select={}&id=eq.{}", FEE_POLICY_COLUMNS, doctor_id);
        let rows: Vec<DoctorFeePolicy> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| BillingError::DatabaseError(e.to_string()))?;

        rows.into_iter().next().ok_or(BillingError::DoctorNotFound(doctor_id))
    }

    /// Fee policies for several doctors in one query, keyed by doctor id.
    /// Doctors without a record are simply absent from the map.
    pub async fn get_fee_policies(
        &self,
        doctor_ids: &[Uuid],
        auth_token: &str,
    ) -> Result<HashMap<Uuid, DoctorFeePolicy>, BillingError> {
        let unique: BTreeSet<Uuid> = doctor_ids.iter().copied().collect();
        if unique.is_empty() {
            return Ok(HashMap::new());
        }

        debug!("Fetching fee policies for {} doctors", unique.len());

        let id_list = unique.iter().map(Uuid::to_string).collect::<Vec<_>>().join(",");
        let path = format!("/rest/v1/doctors?select={}&id=in.({})", FEE_POLICY_COLUMNS, id_list);

        let rows: Vec<DoctorFeePolicy> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| {
                error!("Failed to fetch fee policies: {}", e);
                BillingError::DatabaseError(e.to_string())
            })?;

        Ok(rows.into_iter().map(|policy| (policy.doctor_id, policy)).collect())
    }

    /// Apply a partial fee policy change and return the stored result
    pub async fn update_fee_policy(
        &self,
        doctor_id: Uuid,
        request: UpdateFeePolicyRequest,
        auth_token: &str,
    ) -> Result<DoctorFeePolicy, BillingError> {
        request.validate()?;

        let mut changes = Map::new();
        if let Some(fee) = request.consultation_fee {
            changes.insert("consultation_fee".to_string(), json!(fee.as_major()));
        }
        if let Some(fee) = request.return_consultation_fee {
            changes.insert("return_consultation_fee".to_string(), json!(fee.as_major()));
        }
        if let Some(days) = request.free_return_days {
            changes.insert("free_return_days".to_string(), json!(days));
        }

        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        let path = format!("/rest/v1/doctors?id=eq.{}&select={}", doctor_id, FEE_POLICY_COLUMNS);
        let rows: Vec<DoctorFeePolicy> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(Value::Object(changes)),
                Some(headers),
            )
            .await
            .map_err(|e| BillingError::DatabaseError(e.to_string()))?;

        let policy = rows.into_iter().next().ok_or(BillingError::DoctorNotFound(doctor_id))?;
        info!("Updated fee policy for doctor {}", doctor_id);

        Ok(policy)
    }
}
