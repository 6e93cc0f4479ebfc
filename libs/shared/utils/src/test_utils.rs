use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;

pub struct TestConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub slot_horizon_days: u32,
    pub slot_granularity: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            slot_horizon_days: 30,
            slot_granularity: "hourly".to_string(),
        }
    }
}

impl TestConfig {
    /// Points the backend at a mock server, typically `MockServer::uri()`.
    pub fn with_backend(url: impl Into<String>) -> Self {
        Self {
            supabase_url: url.into(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            slot_horizon_days: self.slot_horizon_days,
            slot_granularity: self.slot_granularity.clone(),
            ..AppConfig::default()
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub const TEST_TOKEN: &str = "test-user-token";

/// First Monday on or after 2030-01-01, far enough ahead to stay in the future.
pub fn next_test_monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2030, 1, 7).expect("valid date")
}

pub fn at(date: NaiveDate, hour: u32, minute: u32) -> DateTime<Utc> {
    date.and_hms_opt(hour, minute, 0).expect("valid time").and_utc()
}

pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    /// Therapist open `monday: "9-5"`, closed the rest of the week.
    pub fn monday_therapist(therapist_id: Uuid) -> Value {
        Self::therapist_response(
            therapist_id,
            json!({
                "monday": "9-5",
                "tuesday": "unavailable",
                "wednesday": "unavailable",
                "thursday": "unavailable",
                "friday": "unavailable",
                "saturday": "unavailable",
                "sunday": "unavailable"
            }),
            json!([]),
        )
    }

    pub fn therapist_response(therapist_id: Uuid, available_hours: Value, offline_dates: Value) -> Value {
        json!({
            "id": therapist_id,
            "full_name": "Test Therapist",
            "available_hours": available_hours,
            "offline_dates": offline_dates
        })
    }

    pub fn appointment_response(
        appointment_id: Uuid,
        therapist_id: Uuid,
        client_id: Uuid,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        status: &str,
    ) -> Value {
        json!({
            "id": appointment_id,
            "client_id": client_id,
            "therapist_id": therapist_id,
            "start_time": start_time.to_rfc3339(),
            "end_time": end_time.to_rfc3339(),
            "status": status,
            "notes": null,
            "documents": [],
            "client_notes": [],
            "created_at": "2029-12-01T00:00:00Z",
            "updated_at": "2029-12-01T00:00:00Z"
        })
    }

    pub fn error_response(message: &str, code: &str) -> Value {
        json!({
            "message": message,
            "code": code
        })
    }
}
