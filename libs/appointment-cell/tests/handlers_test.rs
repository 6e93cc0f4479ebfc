use std::sync::Arc;

use assert_matches::assert_matches;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde_json::json;
use uuid::Uuid;
use wiremock::{Mock, MockServer, ResponseTemplate};
use wiremock::matchers::{body_partial_json, method, path, query_param};

use appointment_cell::handlers::*;
use appointment_cell::models::*;
use shared_config::AppConfig;
use shared_models::error::AppError;
use shared_utils::test_utils::{at, next_test_monday, MockSupabaseResponses, TestConfig, TEST_TOKEN};

fn create_auth_header(token: &str) -> TypedHeader<Authorization<Bearer>> {
    let auth = Authorization::bearer(token).unwrap();
    TypedHeader(auth)
}

/// Monday 9-5 therapist, no clinic closures, and the given appointments on file.
async fn setup_schedule_mocks(mock_server: &MockServer, therapist_id: Uuid, appointments: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/therapists"))
        .and(query_param("id", format!("eq.{}", therapist_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::monday_therapist(therapist_id)
        ])))
        .mount(mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/clinic_offline_dates"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("therapist_id", format!("eq.{}", therapist_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(appointments))
        .mount(mock_server)
        .await;
}

async fn setup() -> (MockServer, Arc<AppConfig>) {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_backend(mock_server.uri()).to_arc();
    (mock_server, config)
}

#[tokio::test]
async fn test_slots_for_open_monday() {
    let (mock_server, config) = setup().await;
    let therapist_id = Uuid::new_v4();
    let monday = next_test_monday();

    setup_schedule_mocks(
        &mock_server,
        therapist_id,
        json!([MockSupabaseResponses::appointment_response(
            Uuid::new_v4(), therapist_id, Uuid::new_v4(),
            at(monday, 10, 0), at(monday, 11, 0), "SCHEDULED"
        )]),
    )
    .await;

    let query = SlotQuery {
        therapist_id,
        from: Some(monday),
        days: Some(1),
        granularity: None,
    };
    let Json(body) = get_available_slots(State(config), Query(query), create_auth_header(TEST_TOKEN))
        .await
        .unwrap();

    assert_eq!(body["total"], 7);
    assert_eq!(body["slots"][0]["type"], "available");
}

#[tokio::test]
async fn test_validate_reports_rejection_without_writing() {
    let (mock_server, config) = setup().await;
    let therapist_id = Uuid::new_v4();
    let monday = next_test_monday();

    setup_schedule_mocks(&mock_server, therapist_id, json!([])).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&mock_server)
        .await;

    let request = ValidateBookingRequest {
        therapist_id,
        start_time: at(monday, 8, 0),
        end_time: at(monday, 9, 0),
    };
    let Json(body) = validate_booking(State(config), create_auth_header(TEST_TOKEN), Json(request))
        .await
        .unwrap();

    assert_eq!(body["accepted"], false);
    assert_eq!(body["reason"], "outside working hours (9:00-17:00)");
}

#[tokio::test]
async fn test_propose_booking_creates_appointment() {
    let (mock_server, config) = setup().await;
    let therapist_id = Uuid::new_v4();
    let client_id = Uuid::new_v4();
    let appointment_id = Uuid::new_v4();
    let monday = next_test_monday();

    setup_schedule_mocks(&mock_server, therapist_id, json!([])).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .and(body_partial_json(json!({ "status": "SCHEDULED" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::appointment_response(
                appointment_id, therapist_id, client_id,
                at(monday, 11, 0), at(monday, 12, 0), "SCHEDULED"
            )
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let request = ProposeBookingRequest {
        therapist_id,
        client_id,
        start_time: at(monday, 11, 0),
        end_time: at(monday, 12, 0),
        notes: None,
    };
    let (status, Json(body)) = propose_booking(State(config), create_auth_header(TEST_TOKEN), Json(request))
        .await
        .unwrap();

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["appointment"]["id"], appointment_id.to_string());
}

#[tokio::test]
async fn test_propose_overlapping_booking_is_conflict() {
    let (mock_server, config) = setup().await;
    let therapist_id = Uuid::new_v4();
    let existing_id = Uuid::new_v4();
    let monday = next_test_monday();

    setup_schedule_mocks(
        &mock_server,
        therapist_id,
        json!([MockSupabaseResponses::appointment_response(
            existing_id, therapist_id, Uuid::new_v4(),
            at(monday, 10, 0), at(monday, 11, 0), "SCHEDULED"
        )]),
    )
    .await;

    let request = ProposeBookingRequest {
        therapist_id,
        client_id: Uuid::new_v4(),
        start_time: at(monday, 10, 30),
        end_time: at(monday, 11, 30),
        notes: None,
    };
    let err = propose_booking(State(config), create_auth_header(TEST_TOKEN), Json(request))
        .await
        .unwrap_err();

    assert_matches!(&err, AppError::Rejected { context, .. } if context["appointment_id"] == existing_id.to_string());
    assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_reopening_cancelled_appointment_is_unprocessable() {
    let (mock_server, config) = setup().await;
    let appointment_id = Uuid::new_v4();
    let monday = next_test_monday();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_response(
                appointment_id, Uuid::new_v4(), Uuid::new_v4(),
                at(monday, 10, 0), at(monday, 11, 0), "CANCELLED"
            )
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let err = change_appointment_status(
        State(config),
        Path(appointment_id),
        create_auth_header(TEST_TOKEN),
        Json(ChangeStatusRequest { status: AppointmentStatus::Scheduled }),
    )
    .await
    .unwrap_err();

    assert_matches!(&err, AppError::InvalidTransition(_));
    assert_eq!(err.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_cancel_patches_status() {
    let (mock_server, config) = setup().await;
    let appointment_id = Uuid::new_v4();
    let therapist_id = Uuid::new_v4();
    let client_id = Uuid::new_v4();
    let monday = next_test_monday();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_response(
                appointment_id, therapist_id, client_id,
                at(monday, 10, 0), at(monday, 11, 0), "SCHEDULED"
            )
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(body_partial_json(json!({ "status": "CANCELLED" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_response(
                appointment_id, therapist_id, client_id,
                at(monday, 10, 0), at(monday, 11, 0), "CANCELLED"
            )
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let Json(body) = cancel_appointment(State(config), Path(appointment_id), create_auth_header(TEST_TOKEN))
        .await
        .unwrap();

    assert_eq!(body["appointment"]["status"], "CANCELLED");
}

#[tokio::test]
async fn test_unknown_appointment_is_not_found() {
    let (mock_server, config) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let err = get_appointment(State(config), Path(Uuid::new_v4()), create_auth_header(TEST_TOKEN))
        .await
        .unwrap_err();

    assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_backend_outage_is_bad_gateway() {
    let (mock_server, config) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&mock_server)
        .await;

    let err = list_appointments(
        State(config),
        Query(AppointmentFilter::default()),
        create_auth_header(TEST_TOKEN),
    )
    .await
    .unwrap_err();

    assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
}
