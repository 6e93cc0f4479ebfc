// libs/appointment-cell/src/services/lifecycle.rs
use tracing::{debug, info, warn};

use crate::models::{AppointmentError, AppointmentStatus};

#[derive(Debug, Clone, Copy, Default)]
pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Validate that a status transition is allowed
    pub fn validate_status_transition(
        &self,
        current_status: AppointmentStatus,
        new_status: AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        debug!("Validating status transition from {} to {}", current_status, new_status);

        if !self.get_valid_transitions(current_status).contains(&new_status) {
            warn!("Invalid status transition attempted: {} -> {}", current_status, new_status);
            return Err(AppointmentError::InvalidTransition {
                from: current_status,
                to: new_status,
            });
        }

        info!("Status transition validated: {} -> {}", current_status, new_status);
        Ok(())
    }

    /// Get all valid next statuses for a given current status
    pub fn get_valid_transitions(&self, current_status: AppointmentStatus) -> Vec<AppointmentStatus> {
        match current_status {
            AppointmentStatus::Scheduled => vec![
                AppointmentStatus::Completed,
                AppointmentStatus::Cancelled,
                AppointmentStatus::Rescheduled,
            ],
            // Terminal states - no transitions allowed
            AppointmentStatus::Completed => vec![],
            AppointmentStatus::Cancelled => vec![],
            AppointmentStatus::Rescheduled => vec![],
        }
    }

    pub fn is_terminal(&self, status: AppointmentStatus) -> bool {
        self.get_valid_transitions(status).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const ALL: [AppointmentStatus; 4] = [
        AppointmentStatus::Scheduled,
        AppointmentStatus::Completed,
        AppointmentStatus::Cancelled,
        AppointmentStatus::Rescheduled,
    ];

    #[test]
    fn test_scheduled_moves_to_each_outcome() {
        let lifecycle = AppointmentLifecycleService::new();

        for next in [
            AppointmentStatus::Completed,
            AppointmentStatus::Cancelled,
            AppointmentStatus::Rescheduled,
        ] {
            assert!(lifecycle.validate_status_transition(AppointmentStatus::Scheduled, next).is_ok());
        }
    }

    #[test]
    fn test_cancelled_cannot_be_rescheduled_back() {
        let lifecycle = AppointmentLifecycleService::new();

        let result = lifecycle.validate_status_transition(
            AppointmentStatus::Cancelled,
            AppointmentStatus::Scheduled,
        );

        assert_matches!(
            result,
            Err(AppointmentError::InvalidTransition {
                from: AppointmentStatus::Cancelled,
                to: AppointmentStatus::Scheduled,
            })
        );
    }

    #[test]
    fn test_only_scheduled_has_exits() {
        let lifecycle = AppointmentLifecycleService::new();

        for status in ALL {
            assert_eq!(lifecycle.is_terminal(status), status != AppointmentStatus::Scheduled);
        }
        for to in ALL {
            assert!(lifecycle
                .validate_status_transition(AppointmentStatus::Rescheduled, to)
                .is_err());
        }
    }

    #[test]
    fn test_self_transition_is_rejected() {
        let lifecycle = AppointmentLifecycleService::new();
        assert!(lifecycle
            .validate_status_transition(AppointmentStatus::Scheduled, AppointmentStatus::Scheduled)
            .is_err());
    }
}
