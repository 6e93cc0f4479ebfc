use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use axum_extra::TypedHeader;
use chrono::NaiveDate;
use headers::{Authorization, authorization::Bearer};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{
    OfflineDateRequest, Therapist, TherapistAvailabilityResponse, UpdateAvailabilityRequest,
    WeekdayAvailability,
};
use crate::services::availability::{weekday_key, AvailabilityModel, WEEKDAYS};
use crate::services::therapist::TherapistService;

fn availability_response(therapist: Therapist) -> TherapistAvailabilityResponse {
    let available_hours = therapist.available_hours.clone().unwrap_or_default();
    let model = AvailabilityModel::from_stored(&available_hours, therapist.offline_dates());

    let weekly = WEEKDAYS
        .iter()
        .map(|day| {
            let interval = model.open_interval(*day);
            WeekdayAvailability {
                weekday: weekday_key(*day).to_string(),
                start_hour: interval.map(|i| i.start_hour),
                end_hour: interval.map(|i| i.end_hour),
            }
        })
        .collect();

    TherapistAvailabilityResponse {
        therapist_id: therapist.id,
        available_hours,
        offline_dates: model.offline_dates().collect(),
        weekly,
    }
}

pub async fn get_therapist_availability(
    State(state): State<Arc<AppConfig>>,
    Path(therapist_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let service = TherapistService::new(&state);
    let therapist = service.get_therapist(therapist_id, auth.token()).await?;

    Ok(Json(json!(availability_response(therapist))))
}

pub async fn update_therapist_availability(
    State(state): State<Arc<AppConfig>>,
    Path(therapist_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<UpdateAvailabilityRequest>,
) -> Result<Json<Value>, AppError> {
    let service = TherapistService::new(&state);
    let therapist = service
        .update_available_hours(therapist_id, request.available_hours, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "availability": availability_response(therapist),
        "message": "Availability updated"
    })))
}

pub async fn add_therapist_offline_date(
    State(state): State<Arc<AppConfig>>,
    Path(therapist_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<OfflineDateRequest>,
) -> Result<Json<Value>, AppError> {
    let service = TherapistService::new(&state);
    let therapist = service
        .add_offline_date(therapist_id, request.date, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "availability": availability_response(therapist)
    })))
}

pub async fn remove_therapist_offline_date(
    State(state): State<Arc<AppConfig>>,
    Path((therapist_id, date)): Path<(Uuid, NaiveDate)>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let service = TherapistService::new(&state);
    let therapist = service
        .remove_offline_date(therapist_id, date, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "availability": availability_response(therapist)
    })))
}

pub async fn list_clinic_offline_dates(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let service = TherapistService::new(&state);
    let dates = service.list_clinic_offline_dates(auth.token()).await?;

    Ok(Json(json!({
        "offline_dates": dates,
        "total": dates.len()
    })))
}

pub async fn add_clinic_offline_date(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<OfflineDateRequest>,
) -> Result<Json<Value>, AppError> {
    let service = TherapistService::new(&state);
    let created = service
        .add_clinic_offline_date(request.date, request.reason, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "offline_date": created
    })))
}

pub async fn remove_clinic_offline_date(
    State(state): State<Arc<AppConfig>>,
    Path(date): Path<NaiveDate>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let service = TherapistService::new(&state);
    service.remove_clinic_offline_date(date, auth.token()).await?;

    Ok(Json(json!({ "success": true })))
}
