use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{StorageError, SupabaseClient};

use crate::models::{CreateDoctorRequest, Doctor, DoctorError};

pub struct DoctorService {
    supabase: SupabaseClient,
}

impl DoctorService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// List the clinic directory, optionally narrowed to one specialty.
    pub async fn list_doctors(
        &self,
        specialty: Option<&str>,
        auth_token: &str,
    ) -> Result<Vec<Doctor>, DoctorError> {
        debug!("Listing doctors (specialty filter: {:?})", specialty);

        let mut path = "/rest/v1/doctors?order=last_name.asc".to_string();
        if let Some(specialty) = specialty {
            path.push_str(&format!("&specialty=eq.{}", urlencoding::encode(specialty)));
        }

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        let doctors: Vec<Doctor> = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Doctor>, _>>()
            .map_err(|e| DoctorError::DatabaseError(format!("Failed to parse doctors: {}", e)))?;

        Ok(doctors)
    }

    pub async fn get_doctor(&self, doctor_id: Uuid, auth_token: &str) -> Result<Doctor, DoctorError> {
        debug!("Fetching doctor: {}", doctor_id);

        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(DoctorError::NotFound);
        }

        let doctor: Doctor = serde_json::from_value(result[0].clone())
            .map_err(|e| DoctorError::DatabaseError(format!("Failed to parse doctor: {}", e)))?;

        Ok(doctor)
    }

    pub async fn create_doctor(
        &self,
        request: CreateDoctorRequest,
        auth_token: &str,
    ) -> Result<Doctor, DoctorError> {
        debug!("Creating doctor profile for: {}", request.email);

        if let (Some(start), Some(end)) = (request.work_start, request.work_end) {
            if start >= end {
                return Err(DoctorError::InvalidWorkingHours(
                    "work_start must be before work_end".to_string(),
                ));
            }
        }
        if let Some(slot_minutes) = request.slot_minutes {
            if slot_minutes <= 0 {
                return Err(DoctorError::InvalidWorkingHours(
                    "slot_minutes must be positive".to_string(),
                ));
            }
        }

        let existing_path = format!(
            "/rest/v1/doctors?email=eq.{}",
            urlencoding::encode(&request.email)
        );
        let existing: Vec<Value> = self
            .supabase
            .request(Method::GET, &existing_path, Some(auth_token), None)
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        if !existing.is_empty() {
            return Err(DoctorError::AlreadyExists(request.email));
        }

        let now = Utc::now();
        let doctor_data = json!({
            "first_name": request.first_name,
            "last_name": request.last_name,
            "email": request.email,
            "specialty": request.specialty,
            "work_start": request.work_start.map(|t| t.format("%H:%M:%S").to_string()),
            "work_end": request.work_end.map(|t| t.format("%H:%M:%S").to_string()),
            "slot_minutes": request.slot_minutes,
            "created_at": now.to_rfc3339(),
            "updated_at": now.to_rfc3339()
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/doctors",
                Some(auth_token),
                Some(doctor_data),
                Some(headers),
            )
            .await
            .map_err(|e| match e {
                StorageError::Conflict(_) => DoctorError::AlreadyExists("email".to_string()),
                other => DoctorError::DatabaseError(other.to_string()),
            })?;

        if result.is_empty() {
            return Err(DoctorError::DatabaseError("Failed to create doctor".to_string()));
        }

        let doctor: Doctor = serde_json::from_value(result[0].clone())
            .map_err(|e| DoctorError::DatabaseError(format!("Failed to parse created doctor: {}", e)))?;

        debug!("Doctor profile created with ID: {}", doctor.id);
        Ok(doctor)
    }
}
