// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, patch, post},
};

use shared_config::AppConfig;

use crate::handlers;

pub fn appointment_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(handlers::list_appointments).post(handlers::propose_booking))
        .route("/slots", get(handlers::get_available_slots))
        .route("/calendar", get(handlers::get_calendar))
        .route("/validate", post(handlers::validate_booking))
        .route(
            "/{appointment_id}",
            get(handlers::get_appointment)
                .patch(handlers::update_appointment_notes)
                .delete(handlers::delete_appointment),
        )
        .route("/{appointment_id}/status", patch(handlers::change_appointment_status))
        .route("/{appointment_id}/transitions", get(handlers::get_allowed_transitions))
        .route("/{appointment_id}/cancel", post(handlers::cancel_appointment))
        .with_state(state)
}
