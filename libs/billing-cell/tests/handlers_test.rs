use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use billing_cell::router::billing_routes;

mod common;
use common::{test_config, MixedDay, MockRows, REPORT_DATE, TEST_TOKEN};

fn create_test_app(mock_server: &MockServer) -> Router {
    billing_routes(Arc::new(test_config(mock_server)))
}

fn authorized(builder: axum::http::request::Builder) -> axum::http::request::Builder {
    builder.header("Authorization", format!("Bearer {}", TEST_TOKEN))
}

async fn read_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_daily_revenue_requires_bearer_token() {
    let mock_server = MockServer::start().await;
    let app = create_test_app(&mock_server);

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/daily?date={}", REPORT_DATE))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_daily_revenue_rejects_bad_date() {
    let mock_server = MockServer::start().await;
    let app = create_test_app(&mock_server);

    let response = app
        .oneshot(
            authorized(Request::builder())
                .uri("/daily?date=yesterday")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_daily_revenue_report() {
    let mock_server = MockServer::start().await;
    let day = MixedDay::new();
    day.mount(&mock_server).await;
    let app = create_test_app(&mock_server);

    let response = app
        .oneshot(
            authorized(Request::builder())
                .uri(format!("/daily?date={}", REPORT_DATE))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json(response).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["report"]["date"], json!(REPORT_DATE));
    assert_eq!(body["report"]["total_revenue"], json!(140.0));
    assert_eq!(body["report"]["free_return_count"], json!(1));
    assert_eq!(body["report"]["missing_fee_policies"], json!([day.orphan_doctor_id]));
}

#[tokio::test]
async fn test_appointment_charge_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(&mock_server);
    let response = app
        .oneshot(
            authorized(Request::builder())
                .uri(format!("/appointments/{}/charge", Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = read_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("not found"));
}

#[tokio::test]
async fn test_status_update_on_completed_appointment_conflicts() {
    let mock_server = MockServer::start().await;
    let appointment_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::appointment(appointment_id, Uuid::new_v4(), Uuid::new_v4(), REPORT_DATE, "completed", None, false)
        ])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(&mock_server);
    let response = app
        .oneshot(
            authorized(Request::builder())
                .method("PATCH")
                .uri(format!("/appointments/{}/status", appointment_id))
                .header("Content-Type", "application/json")
                .body(Body::from(json!({ "status": "cancelled" }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_fee_policy_round_trip_through_handlers() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::fee_policy(doctor_id, Some(50.0), Some(30.0), Some(7))
        ])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(&mock_server);
    let response = app
        .oneshot(
            authorized(Request::builder())
                .uri(format!("/doctors/{}/fee-policy", doctor_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["fee_policy"]["doctor_id"], json!(doctor_id));
    assert_eq!(body["fee_policy"]["consultation_fee"], json!(50.0));
    assert_eq!(body["fee_policy"]["free_return_days"], json!(7));
}

#[tokio::test]
async fn test_negative_fee_is_rejected() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let app = create_test_app(&mock_server);
    let response = app
        .oneshot(
            authorized(Request::builder())
                .method("PUT")
                .uri(format!("/doctors/{}/fee-policy", Uuid::new_v4()))
                .header("Content-Type", "application/json")
                .body(Body::from(json!({ "consultation_fee": -5 }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}
