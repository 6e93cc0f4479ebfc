use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

// ==============================================================================
// THERAPIST RECORDS
// ==============================================================================

/// Therapist row as persisted by the backend. Only the scheduling-relevant
/// columns are modelled; profile fields belong to the admin UI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Therapist {
    pub id: Uuid,
    #[serde(default, alias = "fullname", alias = "fullName")]
    pub full_name: Option<String>,
    /// Weekday key (`monday` .. `sunday`) to `"H-H"` or `"unavailable"`.
    /// Values are kept as raw JSON and judged per day when read.
    #[serde(default, alias = "availableHours", deserialize_with = "lenient_hours")]
    pub available_hours: Option<BTreeMap<String, Value>>,
    #[serde(default, alias = "offlineDates", deserialize_with = "lenient_dates")]
    pub offline_dates: Option<Vec<String>>,
}

impl Therapist {
    pub fn offline_dates(&self) -> &[String] {
        self.offline_dates.as_deref().unwrap_or(&[])
    }
}

/// Bad stored hours must never fail the whole row. Individual values are
/// judged later by the availability model. A column holding the object as a
/// JSON string is unwrapped; anything else unreadable means no open day.
fn lenient_hours<'de, D>(deserializer: D) -> Result<Option<BTreeMap<String, Value>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::Object(map)) => Some(map.into_iter().collect()),
        Some(Value::String(text)) => match serde_json::from_str::<BTreeMap<String, Value>>(&text) {
            Ok(map) => Some(map),
            Err(e) => {
                warn!("Ignoring unreadable available_hours {:?}: {}", text, e);
                Some(BTreeMap::new())
            }
        },
        Some(other) => {
            warn!("Ignoring available_hours of unexpected shape: {}", other);
            Some(BTreeMap::new())
        }
    })
}

/// Keeps the string entries of a stored date list, dropping the rest.
fn lenient_dates<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::Array(items)) => Some(
            items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(date) => Some(date),
                    other => {
                        warn!("Ignoring offline date {}", other);
                        None
                    }
                })
                .collect(),
        ),
        Some(other) => {
            warn!("Ignoring offline_dates of unexpected shape: {}", other);
            None
        }
    })
}

/// Clinic-wide closure row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinicOfflineDate {
    pub date: String,
    #[serde(default)]
    pub reason: Option<String>,
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateAvailabilityRequest {
    pub available_hours: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfflineDateRequest {
    pub date: NaiveDate,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeekdayAvailability {
    pub weekday: String,
    pub start_hour: Option<u32>,
    pub end_hour: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TherapistAvailabilityResponse {
    pub therapist_id: Uuid,
    pub available_hours: BTreeMap<String, Value>,
    pub offline_dates: Vec<NaiveDate>,
    pub weekly: Vec<WeekdayAvailability>,
}

// ==============================================================================
// SLOT MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotGranularity {
    /// One slot spanning the whole open interval of each day.
    Block,
    /// One-hour slots stepped across the open interval.
    #[default]
    Hourly,
}

impl fmt::Display for SlotGranularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotGranularity::Block => write!(f, "block"),
            SlotGranularity::Hourly => write!(f, "hourly"),
        }
    }
}

impl FromStr for SlotGranularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "block" => Ok(SlotGranularity::Block),
            "hourly" => Ok(SlotGranularity::Hourly),
            other => Err(format!("Unknown slot granularity: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotKind {
    Available,
}

/// A computed bookable window. Regenerated on every query and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableSlot {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: SlotKind,
}

/// The part of a booked appointment the slot generator needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookedSlot {
    pub appointment_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalendarEntryKind {
    Available,
    Booked,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEntry {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: CalendarEntryKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appointment_id: Option<Uuid>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum TherapistError {
    #[error("Therapist not found")]
    NotFound,

    #[error("Backend refused the credentials")]
    Unauthorized,

    #[error("Invalid availability: {0}")]
    InvalidAvailability(String),

    #[error("Backend request failed: {0}")]
    Transport(String),
}

impl From<anyhow::Error> for TherapistError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<shared_database::ApiError>() {
            Some(api) if api.is_not_found() => TherapistError::NotFound,
            Some(api) if api.is_auth() => TherapistError::Unauthorized,
            _ => TherapistError::Transport(err.to_string()),
        }
    }
}

impl From<TherapistError> for shared_models::error::AppError {
    fn from(err: TherapistError) -> Self {
        use shared_models::error::AppError;
        match err {
            TherapistError::NotFound => AppError::NotFound("Therapist not found".to_string()),
            e @ TherapistError::Unauthorized => AppError::Auth(e.to_string()),
            TherapistError::InvalidAvailability(msg) => AppError::ValidationError(msg),
            TherapistError::Transport(msg) => AppError::ExternalService(msg),
        }
    }
}
