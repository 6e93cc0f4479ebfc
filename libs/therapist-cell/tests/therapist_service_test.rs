use std::collections::BTreeMap;

use assert_matches::assert_matches;
use chrono::{NaiveDate, Weekday};
use serde_json::json;
use uuid::Uuid;
use wiremock::{Mock, MockServer, ResponseTemplate};
use wiremock::matchers::{body_json, method, path, query_param};

use shared_utils::test_utils::{MockSupabaseResponses, TestConfig, TEST_TOKEN};
use therapist_cell::models::TherapistError;
use therapist_cell::services::{ScheduleSource, TherapistService};

async fn setup() -> (MockServer, TherapistService) {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_backend(mock_server.uri()).to_app_config();
    (mock_server, TherapistService::new(&config))
}

#[tokio::test]
async fn test_schedule_merges_clinic_closures() {
    let (mock_server, service) = setup().await;
    let therapist_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/therapists"))
        .and(query_param("id", format!("eq.{}", therapist_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::therapist_response(
                therapist_id,
                json!({ "monday": "9-5" }),
                json!(["2030-01-07T00:00:00.000Z"])
            )
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/clinic_offline_dates"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "date": "2030-01-14", "reason": "Holiday" }
        ])))
        .mount(&mock_server)
        .await;

    let model = service
        .schedule_for(therapist_id, TEST_TOKEN)
        .await
        .unwrap()
        .expect("therapist has hours");

    assert!(model.is_closed(NaiveDate::from_ymd_opt(2030, 1, 7).unwrap()));
    assert!(model.is_closed(NaiveDate::from_ymd_opt(2030, 1, 14).unwrap()));
    assert!(!model.is_closed(NaiveDate::from_ymd_opt(2030, 1, 21).unwrap()));
}

#[tokio::test]
async fn test_schedule_absent_when_no_hours() {
    let (mock_server, service) = setup().await;
    let therapist_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/therapists"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": therapist_id, "fullname": "No Hours", "available_hours": null, "offline_dates": null }
        ])))
        .mount(&mock_server)
        .await;

    let model = service.schedule_for(therapist_id, TEST_TOKEN).await.unwrap();
    assert!(model.is_none());
}

#[tokio::test]
async fn test_unknown_therapist_is_not_found() {
    let (mock_server, service) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/therapists"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let result = service.get_therapist(Uuid::new_v4(), TEST_TOKEN).await;
    assert_matches!(result, Err(TherapistError::NotFound));
}

#[tokio::test]
async fn test_backend_failure_is_transport_error() {
    let (mock_server, service) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/therapists"))
        .respond_with(ResponseTemplate::new(500).set_body_json(
            MockSupabaseResponses::error_response("boom", "XX000"),
        ))
        .mount(&mock_server)
        .await;

    let result = service.get_therapist(Uuid::new_v4(), TEST_TOKEN).await;
    assert_matches!(result, Err(TherapistError::Transport(_)));
}

#[tokio::test]
async fn test_update_rejects_malformed_hours_without_calling_backend() {
    let (mock_server, service) = setup().await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/therapists"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut hours = BTreeMap::new();
    hours.insert("monday".to_string(), "nine to five".to_string());

    let result = service
        .update_available_hours(Uuid::new_v4(), hours, TEST_TOKEN)
        .await;
    assert_matches!(result, Err(TherapistError::InvalidAvailability(_)));
}

#[tokio::test]
async fn test_add_offline_date_patches_sorted_days() {
    let (mock_server, service) = setup().await;
    let therapist_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/therapists"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::therapist_response(
                therapist_id,
                json!({ "monday": "9-5" }),
                json!(["2030-02-01T00:00:00.000Z"])
            )
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/therapists"))
        .and(query_param("id", format!("eq.{}", therapist_id)))
        .and(body_json(json!({ "offline_dates": ["2030-01-07", "2030-02-01"] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::therapist_response(
                therapist_id,
                json!({ "monday": "9-5" }),
                json!(["2030-01-07", "2030-02-01"])
            )
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let updated = service
        .add_offline_date(therapist_id, NaiveDate::from_ymd_opt(2030, 1, 7).unwrap(), TEST_TOKEN)
        .await
        .unwrap();

    assert_eq!(updated.offline_dates().len(), 2);
}

#[tokio::test]
async fn test_removing_absent_offline_date_is_a_no_op() {
    let (mock_server, service) = setup().await;
    let therapist_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/therapists"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::monday_therapist(therapist_id)
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/therapists"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let therapist = service
        .remove_offline_date(therapist_id, NaiveDate::from_ymd_opt(2030, 1, 7).unwrap(), TEST_TOKEN)
        .await
        .unwrap();
    assert_eq!(therapist.id, therapist_id);
}

async fn mount_row(mock_server: &MockServer, therapist_id: Uuid, hours: serde_json::Value, offline: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/therapists"))
        .and(query_param("id", format!("eq.{}", therapist_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::therapist_response(therapist_id, hours, offline)
        ])))
        .mount(mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/clinic_offline_dates"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn test_non_string_day_values_are_unavailable() {
    let (mock_server, service) = setup().await;
    let therapist_id = Uuid::new_v4();

    mount_row(
        &mock_server,
        therapist_id,
        json!({ "monday": "9-5", "sunday": null, "tuesday": 9, "wednesday": { "from": 9 } }),
        json!([]),
    )
    .await;

    let model = service
        .schedule_for(therapist_id, TEST_TOKEN)
        .await
        .unwrap()
        .expect("row still yields a schedule");

    assert_eq!(model.open_interval(Weekday::Mon).map(|i| (i.start_hour, i.end_hour)), Some((9, 17)));
    assert!(model.open_interval(Weekday::Sun).is_none());
    assert!(model.open_interval(Weekday::Tue).is_none());
    assert!(model.open_interval(Weekday::Wed).is_none());
}

#[tokio::test]
async fn test_hours_stored_as_json_text_are_read() {
    let (mock_server, service) = setup().await;
    let therapist_id = Uuid::new_v4();

    mount_row(&mock_server, therapist_id, json!("{\"monday\":\"9-5\"}"), json!(null)).await;

    let model = service
        .schedule_for(therapist_id, TEST_TOKEN)
        .await
        .unwrap()
        .expect("text column is unwrapped");

    assert!(model.open_interval(Weekday::Mon).is_some());
}

#[tokio::test]
async fn test_unreadable_hours_and_stray_dates_do_not_fail_the_row() {
    let (mock_server, service) = setup().await;
    let therapist_id = Uuid::new_v4();

    mount_row(&mock_server, therapist_id, json!("not json"), json!(["2030-01-07", null, 5])).await;

    let therapist = service.get_therapist(therapist_id, TEST_TOKEN).await.unwrap();
    assert_eq!(therapist.offline_dates(), ["2030-01-07".to_string()]);

    let model = service
        .schedule_for(therapist_id, TEST_TOKEN)
        .await
        .unwrap()
        .expect("empty week, not an error");

    assert!(model.is_closed(NaiveDate::from_ymd_opt(2030, 1, 7).unwrap()));
    assert!(model.open_interval(Weekday::Mon).is_none());
}
