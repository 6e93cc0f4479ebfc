use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_database::supabase::SupabaseClient;

use crate::models::{
    Appointment, AppointmentDraft, AppointmentError, AppointmentFilter, AppointmentPatch,
    AppointmentStatus,
};

/// Persistence collaborator for appointments. Every call is a single
/// all-or-nothing request; nothing is cached between calls.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn list(
        &self,
        filter: &AppointmentFilter,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError>;

    async fn get(&self, appointment_id: Uuid, auth_token: &str) -> Result<Appointment, AppointmentError>;

    async fn create(
        &self,
        draft: &AppointmentDraft,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError>;

    async fn update(
        &self,
        appointment_id: Uuid,
        patch: &AppointmentPatch,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError>;

    /// Moves the appointment from `from` to `to` only if it is still in
    /// `from`. A row that has moved on meanwhile yields `CommitConflict`.
    async fn transition(
        &self,
        appointment_id: Uuid,
        from: AppointmentStatus,
        to: AppointmentStatus,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError>;

    async fn delete(&self, appointment_id: Uuid, auth_token: &str) -> Result<(), AppointmentError>;
}

pub struct SupabaseAppointmentStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseAppointmentStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    fn parse_appointments(rows: Vec<Value>) -> Result<Vec<Appointment>, AppointmentError> {
        rows.into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Appointment>, _>>()
            .map_err(|e| AppointmentError::Transport(format!("Failed to parse appointments: {}", e)))
    }

    fn first_appointment(rows: Vec<Value>) -> Result<Appointment, AppointmentError> {
        Self::parse_appointments(rows)?
            .into_iter()
            .next()
            .ok_or(AppointmentError::NotFound)
    }

    async fn patch_rows(
        &self,
        path: &str,
        mut body: Value,
        auth_token: &str,
    ) -> Result<Vec<Value>, AppointmentError> {
        if let Value::Object(map) = &mut body {
            map.insert("updated_at".to_string(), Value::String(Utc::now().to_rfc3339()));
        }

        let rows: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            path,
            Some(auth_token),
            Some(body),
            Some(SupabaseClient::return_representation()),
        ).await?;

        Ok(rows)
    }
}

#[async_trait]
impl AppointmentStore for SupabaseAppointmentStore {
    async fn list(
        &self,
        filter: &AppointmentFilter,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let mut query_parts = Vec::new();

        if let Some(therapist_id) = filter.therapist_id {
            query_parts.push(format!("therapist_id=eq.{}", therapist_id));
        }
        if let Some(client_id) = filter.client_id {
            query_parts.push(format!("client_id=eq.{}", client_id));
        }
        if let Some(status) = filter.status {
            query_parts.push(format!("status=eq.{}", status));
        }
        query_parts.push("order=start_time.asc".to_string());

        let path = format!("/rest/v1/appointments?{}", query_parts.join("&"));
        debug!("Listing appointments: {}", path);

        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        Self::parse_appointments(result)
    }

    async fn get(&self, appointment_id: Uuid, auth_token: &str) -> Result<Appointment, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        Self::first_appointment(result)
    }

    async fn create(
        &self,
        draft: &AppointmentDraft,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let body = serde_json::to_value(draft)
            .map_err(|e| AppointmentError::ValidationError(e.to_string()))?;

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/appointments",
            Some(auth_token),
            Some(body),
            Some(SupabaseClient::return_representation()),
        ).await?;

        Self::first_appointment(result).map_err(|e| match e {
            AppointmentError::NotFound => {
                AppointmentError::Transport("Failed to create appointment".to_string())
            }
            other => other,
        })
    }

    async fn update(
        &self,
        appointment_id: Uuid,
        patch: &AppointmentPatch,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let body = serde_json::to_value(patch)
            .map_err(|e| AppointmentError::ValidationError(e.to_string()))?;

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let result = self.patch_rows(&path, body, auth_token).await?;

        Self::first_appointment(result)
    }

    async fn transition(
        &self,
        appointment_id: Uuid,
        from: AppointmentStatus,
        to: AppointmentStatus,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}&status=eq.{}", appointment_id, from);
        let result = self.patch_rows(&path, json!({ "status": to }), auth_token).await?;

        // The guard matched nothing: deleted or moved on since it was read.
        Self::first_appointment(result).map_err(|e| match e {
            AppointmentError::NotFound => AppointmentError::CommitConflict(format!(
                "appointment {} is no longer {}",
                appointment_id, from
            )),
            other => other,
        })
    }

    async fn delete(&self, appointment_id: Uuid, auth_token: &str) -> Result<(), AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        self.supabase.request::<()>(
            Method::DELETE,
            &path,
            Some(auth_token),
            None,
        ).await?;

        Ok(())
    }
}
