use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{IssuePrescriptionRequest, PrescriptionError};
use crate::services::prescription::PrescriptionService;

fn map_prescription_error(e: PrescriptionError) -> AppError {
    match e {
        PrescriptionError::NotFound => AppError::NotFound("Prescription not found".to_string()),
        PrescriptionError::PatientNotFound => AppError::NotFound("Patient not found".to_string()),
        PrescriptionError::DoctorNotFound => AppError::NotFound("Doctor not found".to_string()),
        PrescriptionError::Validation(msg) => AppError::BadRequest(msg),
        PrescriptionError::DatabaseError(msg) => AppError::Database(msg),
    }
}

#[axum::debug_handler]
pub async fn issue_prescription(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<IssuePrescriptionRequest>,
) -> Result<Json<Value>, AppError> {
    // Prescribing is a doctor action.
    let is_doctor = user.role.as_deref() == Some("doctor");
    let is_admin = user.role.as_deref() == Some("admin");

    if !is_doctor && !is_admin {
        return Err(AppError::Auth("Only doctors can issue prescriptions".to_string()));
    }

    let service = PrescriptionService::new(&state);

    let prescription = service
        .issue_prescription(request, auth.token())
        .await
        .map_err(map_prescription_error)?;

    Ok(Json(json!({
        "success": true,
        "prescription": prescription
    })))
}

#[axum::debug_handler]
pub async fn get_patient_prescriptions(
    State(state): State<Arc<AppConfig>>,
    Path(patient_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    // Patients see their own; doctors and admins see any.
    let is_patient = patient_id.to_string() == user.id;
    let is_doctor = user.role.as_deref() == Some("doctor");
    let is_admin = user.role.as_deref() == Some("admin");

    if !is_patient && !is_doctor && !is_admin {
        return Err(AppError::Auth("Not authorized to view these prescriptions".to_string()));
    }

    let service = PrescriptionService::new(&state);

    let prescriptions = service
        .prescriptions_for_patient(patient_id, auth.token())
        .await
        .map_err(map_prescription_error)?;

    Ok(Json(json!({
        "patient_id": patient_id,
        "prescriptions": prescriptions
    })))
}
