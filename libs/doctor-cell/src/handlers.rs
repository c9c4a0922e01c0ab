// libs/doctor-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};
use chrono::NaiveDate;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{CreateDoctorRequest, DoctorAvailabilityResponse, DoctorError};
use crate::services::availability::AvailabilityService;
use crate::services::doctor::DoctorService;

#[derive(Debug, Deserialize)]
pub struct DoctorListParams {
    pub specialty: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityParams {
    pub date: NaiveDate,
}

fn map_doctor_error(e: DoctorError) -> AppError {
    match e {
        DoctorError::NotFound => AppError::NotFound("Doctor not found".to_string()),
        DoctorError::AlreadyExists(email) => {
            AppError::Conflict(format!("Doctor with email {} already exists", email))
        }
        DoctorError::InvalidWorkingHours(msg) => AppError::BadRequest(msg),
        DoctorError::DatabaseError(msg) => AppError::Database(msg),
    }
}

#[axum::debug_handler]
pub async fn list_doctors(
    State(state): State<Arc<AppConfig>>,
    Query(params): Query<DoctorListParams>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let service = DoctorService::new(&state);

    let doctors = service
        .list_doctors(params.specialty.as_deref(), auth.token())
        .await
        .map_err(map_doctor_error)?;

    Ok(Json(json!({ "doctors": doctors })))
}

#[axum::debug_handler]
pub async fn get_doctor(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let service = DoctorService::new(&state);

    let doctor = service
        .get_doctor(doctor_id, auth.token())
        .await
        .map_err(map_doctor_error)?;

    Ok(Json(json!(doctor)))
}

#[axum::debug_handler]
pub async fn create_doctor(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<CreateDoctorRequest>,
) -> Result<Json<Value>, AppError> {
    let service = DoctorService::new(&state);

    let doctor = service
        .create_doctor(request, auth.token())
        .await
        .map_err(map_doctor_error)?;

    Ok(Json(json!({
        "success": true,
        "doctor": doctor
    })))
}

/// Free slots for one doctor on one calendar date.
#[axum::debug_handler]
pub async fn get_doctor_availability(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    Query(params): Query<AvailabilityParams>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<DoctorAvailabilityResponse>, AppError> {
    let doctor_service = DoctorService::new(&state);
    let availability_service = AvailabilityService::new(&state);

    let doctor = doctor_service
        .get_doctor(doctor_id, auth.token())
        .await
        .map_err(map_doctor_error)?;

    let slots = availability_service
        .get_available_slots(doctor_id, params.date, auth.token())
        .await
        .map_err(map_doctor_error)?;

    Ok(Json(DoctorAvailabilityResponse {
        doctor_id,
        doctor_name: doctor.display_name(),
        specialty: doctor.specialty,
        date: params.date,
        available_slots: slots,
    }))
}
