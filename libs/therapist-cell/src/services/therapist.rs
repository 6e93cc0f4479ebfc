use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{ClinicOfflineDate, Therapist, TherapistError};
use crate::services::availability::{calendar_day, validate_available_hours, AvailabilityModel};

/// Where the scheduling engine reads a therapist's availability from.
#[async_trait]
pub trait ScheduleSource: Send + Sync {
    /// `Ok(None)` when the therapist exists but has never set weekly hours.
    async fn schedule_for(
        &self,
        therapist_id: Uuid,
        auth_token: &str,
    ) -> Result<Option<AvailabilityModel>, TherapistError>;
}

pub struct TherapistService {
    supabase: Arc<SupabaseClient>,
}

impl TherapistService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
        }
    }

    pub fn with_client(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    pub async fn get_therapist(
        &self,
        therapist_id: Uuid,
        auth_token: &str,
    ) -> Result<Therapist, TherapistError> {
        debug!("Fetching therapist {}", therapist_id);

        let path = format!(
            "/rest/v1/therapists?id=eq.{}&select=id,full_name,available_hours,offline_dates",
            therapist_id
        );
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        let row = result.into_iter().next().ok_or(TherapistError::NotFound)?;
        serde_json::from_value(row)
            .map_err(|e| TherapistError::Transport(format!("Failed to parse therapist: {}", e)))
    }

    /// Replaces the weekly hours after checking every entry parses.
    pub async fn update_available_hours(
        &self,
        therapist_id: Uuid,
        available_hours: BTreeMap<String, String>,
        auth_token: &str,
    ) -> Result<Therapist, TherapistError> {
        validate_available_hours(&available_hours)
            .map_err(|e| TherapistError::InvalidAvailability(e.to_string()))?;

        info!("Updating weekly hours for therapist {}", therapist_id);
        self.patch_therapist(therapist_id, json!({ "available_hours": available_hours }), auth_token)
            .await
    }

    pub async fn add_offline_date(
        &self,
        therapist_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Therapist, TherapistError> {
        let therapist = self.get_therapist(therapist_id, auth_token).await?;
        let mut dates = normalized_dates(therapist.offline_dates());

        if dates.contains(&date) {
            debug!("Therapist {} already offline on {}", therapist_id, date);
            return Ok(therapist);
        }
        dates.push(date);
        dates.sort();

        info!("Marking therapist {} offline on {}", therapist_id, date);
        self.patch_therapist(therapist_id, offline_dates_patch(&dates), auth_token).await
    }

    pub async fn remove_offline_date(
        &self,
        therapist_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Therapist, TherapistError> {
        let therapist = self.get_therapist(therapist_id, auth_token).await?;
        let mut dates = normalized_dates(therapist.offline_dates());
        let before = dates.len();
        dates.retain(|d| *d != date);

        if dates.len() == before {
            return Ok(therapist);
        }

        info!("Clearing offline date {} for therapist {}", date, therapist_id);
        self.patch_therapist(therapist_id, offline_dates_patch(&dates), auth_token).await
    }

    pub async fn list_clinic_offline_dates(
        &self,
        auth_token: &str,
    ) -> Result<Vec<ClinicOfflineDate>, TherapistError> {
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            "/rest/v1/clinic_offline_dates?order=date.asc",
            Some(auth_token),
            None,
        ).await?;

        result.into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<ClinicOfflineDate>, _>>()
            .map_err(|e| TherapistError::Transport(format!("Failed to parse offline dates: {}", e)))
    }

    pub async fn add_clinic_offline_date(
        &self,
        date: NaiveDate,
        reason: Option<String>,
        auth_token: &str,
    ) -> Result<ClinicOfflineDate, TherapistError> {
        info!("Closing clinic on {}", date);

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/clinic_offline_dates",
            Some(auth_token),
            Some(json!({ "date": date.to_string(), "reason": reason })),
            Some(SupabaseClient::return_representation()),
        ).await?;

        let row = result.into_iter().next()
            .ok_or_else(|| TherapistError::Transport("Failed to create offline date".to_string()))?;
        serde_json::from_value(row)
            .map_err(|e| TherapistError::Transport(format!("Failed to parse offline date: {}", e)))
    }

    pub async fn remove_clinic_offline_date(
        &self,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<(), TherapistError> {
        info!("Reopening clinic on {}", date);

        let path = format!("/rest/v1/clinic_offline_dates?date=eq.{}", date);
        self.supabase.request::<()>(
            Method::DELETE,
            &path,
            Some(auth_token),
            None,
        ).await?;

        Ok(())
    }

    async fn patch_therapist(
        &self,
        therapist_id: Uuid,
        patch: Value,
        auth_token: &str,
    ) -> Result<Therapist, TherapistError> {
        let path = format!("/rest/v1/therapists?id=eq.{}", therapist_id);
        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(patch),
            Some(SupabaseClient::return_representation()),
        ).await?;

        let row = result.into_iter().next().ok_or(TherapistError::NotFound)?;
        serde_json::from_value(row)
            .map_err(|e| TherapistError::Transport(format!("Failed to parse therapist: {}", e)))
    }
}

#[async_trait]
impl ScheduleSource for TherapistService {
    async fn schedule_for(
        &self,
        therapist_id: Uuid,
        auth_token: &str,
    ) -> Result<Option<AvailabilityModel>, TherapistError> {
        let therapist = self.get_therapist(therapist_id, auth_token).await?;

        let Some(hours) = therapist.available_hours.as_ref() else {
            debug!("Therapist {} has no weekly hours", therapist_id);
            return Ok(None);
        };

        let clinic_dates = self.list_clinic_offline_dates(auth_token).await?;
        let model = AvailabilityModel::from_stored(hours, therapist.offline_dates())
            .with_offline_dates(clinic_dates.iter().filter_map(|d| calendar_day(&d.date)));

        Ok(Some(model))
    }
}

fn normalized_dates(raw: &[String]) -> Vec<NaiveDate> {
    let mut dates: Vec<NaiveDate> = raw.iter().filter_map(|d| calendar_day(d)).collect();
    dates.sort();
    dates.dedup();
    dates
}

fn offline_dates_patch(dates: &[NaiveDate]) -> Value {
    let as_strings: Vec<String> = dates.iter().map(|d| d.to_string()).collect();
    json!({ "offline_dates": as_strings })
}
