use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use therapist_cell::services::{AvailabilityModel, OpenInterval};

use crate::models::{Appointment, BookingWindow};

/// Why a proposed window cannot be booked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Rejection {
    #[error("start time must be before end time")]
    InvalidWindow,

    #[error("therapist not available this day")]
    DayUnavailable { date: NaiveDate },

    #[error("outside working hours ({}:00-{}:00)", .open.start_hour, .open.end_hour)]
    OutsideWorkingHours { open: OpenInterval },

    #[error("conflicts with an existing appointment")]
    Overlap { appointment_id: Uuid },
}

impl Rejection {
    /// Details for the caller to explain the rejection.
    pub fn context(&self) -> Value {
        match self {
            Rejection::InvalidWindow => json!({}),
            Rejection::DayUnavailable { date } => json!({ "date": date }),
            Rejection::OutsideWorkingHours { open } => json!({
                "start_hour": open.start_hour,
                "end_hour": open.end_hour
            }),
            Rejection::Overlap { appointment_id } => json!({ "appointment_id": appointment_id }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Accepted,
    Rejected(Rejection),
}

impl ValidationOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ValidationOutcome::Accepted)
    }

    pub fn into_result(self) -> Result<(), Rejection> {
        match self {
            ValidationOutcome::Accepted => Ok(()),
            ValidationOutcome::Rejected(rejection) => Err(rejection),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            ValidationOutcome::Accepted => json!({ "accepted": true }),
            ValidationOutcome::Rejected(rejection) => json!({
                "accepted": false,
                "reason": rejection.to_string(),
                "rejection": rejection,
                "context": rejection.context()
            }),
        }
    }
}

/// Decides whether a window may be booked for a therapist. Pure: the caller
/// supplies a fresh snapshot of availability and appointments.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConflictValidator;

impl ConflictValidator {
    pub fn new() -> Self {
        Self
    }

    /// Checks run in order and stop at the first failure: closed day, working
    /// hours, then overlap with any appointment still holding its window.
    pub fn validate(
        &self,
        model: Option<&AvailabilityModel>,
        existing: &[Appointment],
        window: &BookingWindow,
    ) -> ValidationOutcome {
        if window.start_time >= window.end_time {
            return ValidationOutcome::Rejected(Rejection::InvalidWindow);
        }

        let date = window.date();
        let Some(open) = model.and_then(|m| m.interval_on(date)) else {
            debug!("Rejecting {:?}: therapist not available on {}", window, date);
            return ValidationOutcome::Rejected(Rejection::DayUnavailable { date });
        };

        let within_hours = match (open.start_on(date), open.end_on(date)) {
            (Some(opens), Some(closes)) => window.start_time >= opens && window.end_time <= closes,
            _ => false,
        };
        if !within_hours {
            debug!("Rejecting {:?}: outside {:?}", window, open);
            return ValidationOutcome::Rejected(Rejection::OutsideWorkingHours { open });
        }

        let conflicting = existing
            .iter()
            .filter(|apt| apt.is_blocking())
            .find(|apt| {
                self.appointments_overlap(
                    window.start_time,
                    window.end_time,
                    apt.start_time,
                    apt.end_time,
                )
            });

        if let Some(apt) = conflicting {
            debug!("Rejecting {:?}: overlaps appointment {}", window, apt.id);
            return ValidationOutcome::Rejected(Rejection::Overlap { appointment_id: apt.id });
        }

        ValidationOutcome::Accepted
    }

    /// Half-open overlap: touching endpoints do not conflict.
    pub fn appointments_overlap(
        &self,
        start1: DateTime<Utc>,
        end1: DateTime<Utc>,
        start2: DateTime<Utc>,
        end2: DateTime<Utc>,
    ) -> bool {
        start1 < end2 && start2 < end1
    }
}
