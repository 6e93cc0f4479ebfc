use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use appointment_cell::router::appointment_routes;
use shared_config::AppConfig;
use therapist_cell::router::{clinic_routes, therapist_routes};

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic scheduling API is running!" }))
        .nest("/therapists", therapist_routes(state.clone()))
        .nest("/clinic", clinic_routes(state.clone()))
        .nest("/appointments", appointment_routes(state))
}
