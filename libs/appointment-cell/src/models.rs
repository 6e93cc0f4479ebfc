// libs/appointment-cell/src/models.rs
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;
use chrono::{DateTime, NaiveDate, Utc};
use std::fmt;

use therapist_cell::models::{BookedSlot, SlotGranularity, TherapistError};

use crate::services::conflict::Rejection;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    #[serde(alias = "clientId")]
    pub client_id: Uuid,
    #[serde(alias = "therapistId")]
    pub therapist_id: Uuid,
    #[serde(alias = "startTime")]
    pub start_time: DateTime<Utc>,
    #[serde(alias = "endTime")]
    pub end_time: DateTime<Utc>,
    pub status: AppointmentStatus,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub documents: Vec<AppointmentDocument>,
    #[serde(default, alias = "clientNotes", deserialize_with = "null_as_empty")]
    pub client_notes: Vec<ClientNote>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Appointment {
    /// Whether this appointment still occupies its time on the calendar.
    /// Cancelled and rescheduled appointments have released their window.
    pub fn is_blocking(&self) -> bool {
        matches!(self.status, AppointmentStatus::Scheduled | AppointmentStatus::Completed)
    }

    pub fn booked_slot(&self) -> BookedSlot {
        BookedSlot {
            appointment_id: self.id,
            start_time: self.start_time,
            end_time: self.end_time,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppointmentDocument {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub uploaded_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientNote {
    pub content: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    #[serde(alias = "scheduled")]
    Scheduled,
    #[serde(alias = "completed")]
    Completed,
    #[serde(alias = "cancelled")]
    Cancelled,
    #[serde(alias = "rescheduled")]
    Rescheduled,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Scheduled => write!(f, "SCHEDULED"),
            AppointmentStatus::Completed => write!(f, "COMPLETED"),
            AppointmentStatus::Cancelled => write!(f, "CANCELLED"),
            AppointmentStatus::Rescheduled => write!(f, "RESCHEDULED"),
        }
    }
}

/// Proposed `[start_time, end_time)` for a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingWindow {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl BookingWindow {
    pub fn new(start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Self {
        Self { start_time, end_time }
    }

    pub fn date(&self) -> NaiveDate {
        self.start_time.date_naive()
    }
}

// ==============================================================================
// PERSISTENCE MODELS
// ==============================================================================

/// Body of a create call. The backend assigns `id` and timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentDraft {
    pub client_id: Uuid,
    pub therapist_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub notes: Option<String>,
    pub status: AppointmentStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AppointmentStatus>,
    /// Outer `None` leaves the notes alone, `Some(None)` clears them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<Option<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentFilter {
    pub therapist_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
}

impl AppointmentFilter {
    pub fn for_therapist(therapist_id: Uuid) -> Self {
        Self {
            therapist_id: Some(therapist_id),
            ..Self::default()
        }
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposeBookingRequest {
    pub therapist_id: Uuid,
    pub client_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub notes: Option<String>,
}

impl ProposeBookingRequest {
    pub fn window(&self) -> BookingWindow {
        BookingWindow::new(self.start_time, self.end_time)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateBookingRequest {
    pub therapist_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeStatusRequest {
    pub status: AppointmentStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateNotesRequest {
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotQuery {
    pub therapist_id: Uuid,
    /// First calendar day of the horizon, today when absent.
    pub from: Option<NaiveDate>,
    pub days: Option<u32>,
    pub granularity: Option<SlotGranularity>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Therapist not found")]
    TherapistNotFound,

    #[error("Booking rejected: {0}")]
    Rejected(Rejection),

    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    /// The store refused the write although validation passed, e.g. another
    /// booking for the same window landed first.
    #[error("Booking conflicts with a concurrent write: {0}")]
    CommitConflict(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Backend refused the credentials")]
    Unauthorized,

    #[error("Backend request failed: {0}")]
    Transport(String),
}

impl From<anyhow::Error> for AppointmentError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<shared_database::ApiError>() {
            Some(api) if api.is_conflict() => AppointmentError::CommitConflict(api.body.clone()),
            Some(api) if api.is_not_found() => AppointmentError::NotFound,
            Some(api) if api.is_auth() => AppointmentError::Unauthorized,
            _ => AppointmentError::Transport(err.to_string()),
        }
    }
}

impl From<TherapistError> for AppointmentError {
    fn from(err: TherapistError) -> Self {
        match err {
            TherapistError::NotFound => AppointmentError::TherapistNotFound,
            TherapistError::Unauthorized => AppointmentError::Unauthorized,
            TherapistError::InvalidAvailability(msg) => AppointmentError::ValidationError(msg),
            TherapistError::Transport(msg) => AppointmentError::Transport(msg),
        }
    }
}

impl From<AppointmentError> for shared_models::error::AppError {
    fn from(err: AppointmentError) -> Self {
        use shared_models::error::AppError;
        match err {
            AppointmentError::NotFound => AppError::NotFound("Appointment not found".to_string()),
            AppointmentError::TherapistNotFound => {
                AppError::NotFound("Therapist not found".to_string())
            }
            AppointmentError::Rejected(rejection) => AppError::Rejected {
                reason: rejection.to_string(),
                context: rejection.context(),
            },
            e @ AppointmentError::InvalidTransition { .. } => AppError::InvalidTransition(e.to_string()),
            AppointmentError::CommitConflict(msg) => AppError::Conflict(msg),
            AppointmentError::ValidationError(msg) => AppError::ValidationError(msg),
            e @ AppointmentError::Unauthorized => AppError::Auth(e.to_string()),
            AppointmentError::Transport(msg) => AppError::ExternalService(msg),
        }
    }
}
