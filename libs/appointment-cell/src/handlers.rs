// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{
    AppointmentFilter, ChangeStatusRequest, ProposeBookingRequest, SlotQuery, UpdateNotesRequest,
    ValidateBookingRequest, BookingWindow,
};
use crate::services::scheduler::AppointmentScheduler;

// ==============================================================================
// SLOT & CALENDAR HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_available_slots(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<SlotQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let scheduler = AppointmentScheduler::new(&state);
    let slots = scheduler.available_slots(&query, auth.token()).await?;

    Ok(Json(json!({
        "therapist_id": query.therapist_id,
        "slots": slots,
        "total": slots.len()
    })))
}

#[axum::debug_handler]
pub async fn get_calendar(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<SlotQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let scheduler = AppointmentScheduler::new(&state);
    let entries = scheduler.calendar(&query, auth.token()).await?;

    Ok(Json(json!({
        "therapist_id": query.therapist_id,
        "entries": entries
    })))
}

// ==============================================================================
// BOOKING HANDLERS
// ==============================================================================

/// Dry run: reports whether the window could be booked right now.
#[axum::debug_handler]
pub async fn validate_booking(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<ValidateBookingRequest>,
) -> Result<Json<Value>, AppError> {
    let scheduler = AppointmentScheduler::new(&state);
    let window = BookingWindow::new(request.start_time, request.end_time);
    let outcome = scheduler
        .check_booking(request.therapist_id, window, auth.token())
        .await?;

    Ok(Json(outcome.to_json()))
}

#[axum::debug_handler]
pub async fn propose_booking(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<ProposeBookingRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let scheduler = AppointmentScheduler::new(&state);
    let appointment = scheduler.propose_booking(request, auth.token()).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "appointment": appointment,
            "message": "Appointment booked successfully"
        })),
    ))
}

// ==============================================================================
// APPOINTMENT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<Arc<AppConfig>>,
    Query(filter): Query<AppointmentFilter>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let scheduler = AppointmentScheduler::new(&state);
    let appointments = scheduler.list_appointments(&filter, auth.token()).await?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let scheduler = AppointmentScheduler::new(&state);
    let appointment = scheduler.get_appointment(appointment_id, auth.token()).await?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn update_appointment_notes(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<UpdateNotesRequest>,
) -> Result<Json<Value>, AppError> {
    let scheduler = AppointmentScheduler::new(&state);
    let appointment = scheduler
        .update_notes(appointment_id, request.notes, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn change_appointment_status(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<ChangeStatusRequest>,
) -> Result<Json<Value>, AppError> {
    let scheduler = AppointmentScheduler::new(&state);
    let appointment = scheduler
        .change_status(appointment_id, request.status, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": format!("Appointment is now {}", appointment.status)
    })))
}

#[axum::debug_handler]
pub async fn get_allowed_transitions(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let scheduler = AppointmentScheduler::new(&state);
    let (status, allowed) = scheduler
        .allowed_transitions(appointment_id, auth.token())
        .await?;

    Ok(Json(json!({
        "appointment_id": appointment_id,
        "status": status,
        "allowed_transitions": allowed
    })))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let scheduler = AppointmentScheduler::new(&state);
    let appointment = scheduler.cancel(appointment_id, auth.token()).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment cancelled successfully"
    })))
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<StatusCode, AppError> {
    let scheduler = AppointmentScheduler::new(&state);
    scheduler.delete_appointment(appointment_id, auth.token()).await?;

    Ok(StatusCode::NO_CONTENT)
}
