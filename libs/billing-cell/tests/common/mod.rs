#![allow(dead_code)]

use serde_json::{json, Value};
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared_config::AppConfig;

pub const TEST_TOKEN: &str = "test-token";
pub const REPORT_DATE: &str = "2024-03-08";
pub const REPORT_NEXT_DAY: &str = "2024-03-09";

pub fn test_config(mock_server: &MockServer) -> AppConfig {
    AppConfig::with_supabase(mock_server.uri(), "test-anon-key")
}

pub struct MockRows;

impl MockRows {
    pub fn appointment(
        id: Uuid,
        patient_id: Uuid,
        doctor_id: Uuid,
        date: &str,
        status: &str,
        cost: Option<f64>,
        is_return_visit: bool,
    ) -> Value {
        json!({
            "id": id,
            "patient_id": patient_id,
            "doctor_id": doctor_id,
            "appointment_date": date,
            "status": status,
            "cost": cost,
            "is_return_visit": is_return_visit
        })
    }

    pub fn fee_policy(doctor_id: Uuid, fee: Option<f64>, return_fee: Option<f64>, free_return_days: Option<i64>) -> Value {
        json!({
            "id": doctor_id,
            "consultation_fee": fee,
            "return_consultation_fee": return_fee,
            "free_return_days": free_return_days
        })
    }

    pub fn prior_visit(id: Uuid, date: &str) -> Value {
        json!({
            "id": id,
            "appointment_date": date
        })
    }
}

/// The day from the billing examples: a paid new visit, a free return,
/// a paid return, plus a visit with a doctor lacking a fee policy.
pub struct MixedDay {
    pub doctor_id: Uuid,
    pub orphan_doctor_id: Uuid,
    pub new_patient: Uuid,
    pub free_return_patient: Uuid,
    pub paid_return_patient: Uuid,
    pub free_return_appointment: Uuid,
}

impl MixedDay {
    pub fn new() -> Self {
        Self {
            doctor_id: Uuid::new_v4(),
            orphan_doctor_id: Uuid::new_v4(),
            new_patient: Uuid::new_v4(),
            free_return_patient: Uuid::new_v4(),
            paid_return_patient: Uuid::new_v4(),
            free_return_appointment: Uuid::new_v4(),
        }
    }

    pub async fn mount(&self, mock_server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/rest/v1/appointments"))
            .and(query_param("appointment_date", format!("gte.{}", REPORT_DATE)))
            .and(query_param("appointment_date", format!("lt.{}", REPORT_NEXT_DAY)))
            .and(query_param("status", "eq.completed"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                MockRows::appointment(Uuid::new_v4(), self.new_patient, self.doctor_id, REPORT_DATE, "completed", Some(100.0), false),
                MockRows::appointment(self.free_return_appointment, self.free_return_patient, self.doctor_id, "2024-03-08T09:30:00+00:00", "completed", None, true),
                MockRows::appointment(Uuid::new_v4(), self.paid_return_patient, self.doctor_id, REPORT_DATE, "completed", Some(40.0), true),
                MockRows::appointment(Uuid::new_v4(), Uuid::new_v4(), self.orphan_doctor_id, REPORT_DATE, "completed", None, false),
                MockRows::appointment(Uuid::new_v4(), Uuid::new_v4(), self.doctor_id, REPORT_DATE, "waiting", Some(75.0), false),
            ])))
            .mount(mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/doctors"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                MockRows::fee_policy(self.doctor_id, Some(50.0), Some(30.0), Some(7)),
            ])))
            .expect(1)
            .mount(mock_server)
            .await;

        self.mount_prior_visit(mock_server, self.free_return_patient, "2024-03-01").await;
        self.mount_prior_visit(mock_server, self.paid_return_patient, "2024-02-20").await;
    }

    pub async fn mount_prior_visit(&self, mock_server: &MockServer, patient_id: Uuid, date: &str) {
        Mock::given(method("GET"))
            .and(path("/rest/v1/appointments"))
            .and(query_param("patient_id", format!("eq.{}", patient_id)))
            .and(query_param("doctor_id", format!("eq.{}", self.doctor_id)))
            .and(query_param("appointment_date", format!("lt.{}", REPORT_NEXT_DAY)))
            .and(query_param("limit", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                MockRows::prior_visit(Uuid::new_v4(), date)
            ])))
            .mount(mock_server)
            .await;
    }
}
