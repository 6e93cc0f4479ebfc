use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post},
};

use shared_config::AppConfig;

use crate::handlers;

pub fn therapist_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route(
            "/{therapist_id}/availability",
            get(handlers::get_therapist_availability).put(handlers::update_therapist_availability),
        )
        .route("/{therapist_id}/offline-dates", post(handlers::add_therapist_offline_date))
        .route(
            "/{therapist_id}/offline-dates/{date}",
            delete(handlers::remove_therapist_offline_date),
        )
        .with_state(state)
}

pub fn clinic_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route(
            "/offline-dates",
            get(handlers::list_clinic_offline_dates).post(handlers::add_clinic_offline_date),
        )
        .route("/offline-dates/{date}", delete(handlers::remove_clinic_offline_date))
        .with_state(state)
}
