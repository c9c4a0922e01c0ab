use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{IssuePrescriptionRequest, Prescription, PrescriptionError};

pub struct PrescriptionService {
    supabase: SupabaseClient,
}

impl PrescriptionService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Issue a prescription. Both referenced records must exist; the issue
    /// date is stamped server-side.
    pub async fn issue_prescription(
        &self,
        request: IssuePrescriptionRequest,
        auth_token: &str,
    ) -> Result<Prescription, PrescriptionError> {
        debug!(
            "Issuing prescription for patient {} by doctor {}",
            request.patient_id, request.doctor_id
        );

        if request.medication.trim().is_empty() {
            return Err(PrescriptionError::Validation("Medication cannot be blank".to_string()));
        }
        if request.dosage.trim().is_empty() {
            return Err(PrescriptionError::Validation("Dosage cannot be blank".to_string()));
        }
        if let Some(refills) = request.refills {
            if refills < 0 {
                return Err(PrescriptionError::Validation("Refills cannot be negative".to_string()));
            }
        }

        self.verify_exists("/rest/v1/patients", request.patient_id, PrescriptionError::PatientNotFound, auth_token)
            .await?;
        self.verify_exists("/rest/v1/doctors", request.doctor_id, PrescriptionError::DoctorNotFound, auth_token)
            .await?;

        let now = Utc::now();
        let prescription_data = json!({
            "patient_id": request.patient_id,
            "doctor_id": request.doctor_id,
            "medication": request.medication,
            "dosage": request.dosage,
            "instructions": request.instructions,
            "issue_date": now.date_naive().format("%Y-%m-%d").to_string(),
            "refills": request.refills.unwrap_or(0),
            "created_at": now.to_rfc3339(),
            "updated_at": now.to_rfc3339()
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/prescriptions",
                Some(auth_token),
                Some(prescription_data),
                Some(headers),
            )
            .await
            .map_err(|e| PrescriptionError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(PrescriptionError::DatabaseError("Failed to create prescription".to_string()));
        }

        let prescription: Prescription = serde_json::from_value(result[0].clone())
            .map_err(|e| PrescriptionError::DatabaseError(format!("Failed to parse created prescription: {}", e)))?;

        info!("Prescription {} issued for patient {}", prescription.id, prescription.patient_id);
        Ok(prescription)
    }

    /// A patient's prescriptions, most recent first.
    pub async fn prescriptions_for_patient(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<Prescription>, PrescriptionError> {
        debug!("Fetching prescriptions for patient {}", patient_id);

        self.verify_exists("/rest/v1/patients", patient_id, PrescriptionError::PatientNotFound, auth_token)
            .await?;

        let path = format!(
            "/rest/v1/prescriptions?patient_id=eq.{}&order=issue_date.desc",
            patient_id
        );

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| PrescriptionError::DatabaseError(e.to_string()))?;

        let prescriptions: Vec<Prescription> = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Prescription>, _>>()
            .map_err(|e| PrescriptionError::DatabaseError(format!("Failed to parse prescriptions: {}", e)))?;

        Ok(prescriptions)
    }

    async fn verify_exists(
        &self,
        table_path: &str,
        id: Uuid,
        missing: PrescriptionError,
        auth_token: &str,
    ) -> Result<(), PrescriptionError> {
        let path = format!("{}?id=eq.{}", table_path, id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| PrescriptionError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(missing);
        }

        Ok(())
    }
}
