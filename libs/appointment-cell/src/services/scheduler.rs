// libs/appointment-cell/src/services/scheduler.rs
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use therapist_cell::models::{AvailableSlot, BookedSlot, CalendarEntry};
use therapist_cell::services::{AvailabilityModel, ScheduleSource, SlotGenerator, TherapistService};

use crate::models::{
    Appointment, AppointmentDraft, AppointmentError, AppointmentFilter, AppointmentPatch,
    AppointmentStatus, BookingWindow, ProposeBookingRequest, SlotQuery,
};
use crate::services::conflict::{ConflictValidator, ValidationOutcome};
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::store::{AppointmentStore, SupabaseAppointmentStore};

pub const MAX_HORIZON_DAYS: u32 = 366;

/// Orchestrates slot lookup, booking and status changes. Every decision is
/// made against availability and appointments fetched just before it.
pub struct AppointmentScheduler {
    store: Arc<dyn AppointmentStore>,
    schedules: Arc<dyn ScheduleSource>,
    validator: ConflictValidator,
    lifecycle: AppointmentLifecycleService,
    slot_generator: SlotGenerator,
}

impl AppointmentScheduler {
    pub fn new(config: &AppConfig) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));

        Self::with_collaborators(
            Arc::new(SupabaseAppointmentStore::new(Arc::clone(&supabase))),
            Arc::new(TherapistService::with_client(supabase)),
            SlotGenerator::from_config(config),
        )
    }

    pub fn with_collaborators(
        store: Arc<dyn AppointmentStore>,
        schedules: Arc<dyn ScheduleSource>,
        slot_generator: SlotGenerator,
    ) -> Self {
        Self {
            store,
            schedules,
            validator: ConflictValidator::new(),
            lifecycle: AppointmentLifecycleService::new(),
            slot_generator,
        }
    }

    // ==============================================================================
    // SLOTS
    // ==============================================================================

    pub async fn available_slots(
        &self,
        query: &SlotQuery,
        auth_token: &str,
    ) -> Result<Vec<AvailableSlot>, AppointmentError> {
        let generator = self.generator_for(query)?;
        let from = query.from.unwrap_or_else(|| Utc::now().date_naive());
        let (model, booked) = self.snapshot(query.therapist_id, auth_token).await?;

        Ok(generator.generate(model.as_ref(), &booked, from))
    }

    pub async fn calendar(
        &self,
        query: &SlotQuery,
        auth_token: &str,
    ) -> Result<Vec<CalendarEntry>, AppointmentError> {
        let generator = self.generator_for(query)?;
        let from = query.from.unwrap_or_else(|| Utc::now().date_naive());
        let (model, booked) = self.snapshot(query.therapist_id, auth_token).await?;

        Ok(generator.calendar(model.as_ref(), &booked, from))
    }

    fn generator_for(&self, query: &SlotQuery) -> Result<SlotGenerator, AppointmentError> {
        let mut generator = self.slot_generator;

        if let Some(days) = query.days {
            if days == 0 || days > MAX_HORIZON_DAYS {
                return Err(AppointmentError::ValidationError(format!(
                    "days must be between 1 and {}",
                    MAX_HORIZON_DAYS
                )));
            }
            generator = generator.with_horizon_days(days);
        }
        if let Some(granularity) = query.granularity {
            generator = generator.with_granularity(granularity);
        }

        Ok(generator)
    }

    async fn snapshot(
        &self,
        therapist_id: Uuid,
        auth_token: &str,
    ) -> Result<(Option<AvailabilityModel>, Vec<BookedSlot>), AppointmentError> {
        let model = self.schedules.schedule_for(therapist_id, auth_token).await?;
        let booked = self
            .therapist_appointments(therapist_id, auth_token)
            .await?
            .iter()
            .filter(|apt| apt.is_blocking())
            .map(Appointment::booked_slot)
            .collect();

        Ok((model, booked))
    }

    async fn therapist_appointments(
        &self,
        therapist_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        self.store
            .list(&AppointmentFilter::for_therapist(therapist_id), auth_token)
            .await
    }

    // ==============================================================================
    // BOOKING
    // ==============================================================================

    /// Dry run of the booking checks, nothing is written.
    pub async fn check_booking(
        &self,
        therapist_id: Uuid,
        window: BookingWindow,
        auth_token: &str,
    ) -> Result<ValidationOutcome, AppointmentError> {
        let model = self.schedules.schedule_for(therapist_id, auth_token).await?;
        let existing = self.therapist_appointments(therapist_id, auth_token).await?;

        Ok(self.validator.validate(model.as_ref(), &existing, &window))
    }

    /// Validates the window and, when accepted, creates a SCHEDULED
    /// appointment. A rejection is returned as-is and nothing is written.
    pub async fn propose_booking(
        &self,
        request: ProposeBookingRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        info!(
            "Booking request for therapist {} client {} from {} to {}",
            request.therapist_id, request.client_id, request.start_time, request.end_time
        );

        let outcome = self
            .check_booking(request.therapist_id, request.window(), auth_token)
            .await?;

        if let ValidationOutcome::Rejected(rejection) = outcome {
            warn!("Booking for therapist {} rejected: {}", request.therapist_id, rejection);
            return Err(AppointmentError::Rejected(rejection));
        }

        let draft = AppointmentDraft {
            client_id: request.client_id,
            therapist_id: request.therapist_id,
            start_time: request.start_time,
            end_time: request.end_time,
            notes: request.notes,
            status: AppointmentStatus::Scheduled,
        };

        let appointment = self.store.create(&draft, auth_token).await.map_err(|e| {
            if let AppointmentError::CommitConflict(ref msg) = e {
                warn!("Store refused booking for therapist {}: {}", draft.therapist_id, msg);
            }
            e
        })?;

        info!("Appointment {} booked", appointment.id);
        Ok(appointment)
    }

    // ==============================================================================
    // LIFECYCLE
    // ==============================================================================

    pub async fn change_status(
        &self,
        appointment_id: Uuid,
        new_status: AppointmentStatus,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let current = self.store.get(appointment_id, auth_token).await?;
        self.lifecycle.validate_status_transition(current.status, new_status)?;

        let updated = self
            .store
            .transition(appointment_id, current.status, new_status, auth_token)
            .await
            .map_err(|e| {
                if let AppointmentError::CommitConflict(ref msg) = e {
                    warn!("Status change on appointment {} lost a race: {}", appointment_id, msg);
                }
                e
            })?;

        info!("Appointment {} moved {} -> {}", appointment_id, current.status, updated.status);
        Ok(updated)
    }

    pub async fn cancel(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        self.change_status(appointment_id, AppointmentStatus::Cancelled, auth_token).await
    }

    /// Current status of the appointment and the statuses it may move to.
    pub async fn allowed_transitions(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<(AppointmentStatus, Vec<AppointmentStatus>), AppointmentError> {
        let current = self.store.get(appointment_id, auth_token).await?;
        Ok((current.status, self.lifecycle.get_valid_transitions(current.status)))
    }

    // ==============================================================================
    // PASS-THROUGH
    // ==============================================================================

    pub async fn list_appointments(
        &self,
        filter: &AppointmentFilter,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        self.store.list(filter, auth_token).await
    }

    pub async fn get_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        self.store.get(appointment_id, auth_token).await
    }

    pub async fn update_notes(
        &self,
        appointment_id: Uuid,
        notes: Option<String>,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Updating notes on appointment {}", appointment_id);
        // `None` is sent as an explicit null and clears the notes.
        let patch = AppointmentPatch {
            notes: Some(notes),
            ..AppointmentPatch::default()
        };
        self.store.update(appointment_id, &patch, auth_token).await
    }

    pub async fn delete_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<(), AppointmentError> {
        // Surfaces NotFound; the backend answers a delete of nothing with 204.
        self.store.get(appointment_id, auth_token).await?;
        self.store.delete(appointment_id, auth_token).await?;

        info!("Appointment {} deleted", appointment_id);
        Ok(())
    }
}
