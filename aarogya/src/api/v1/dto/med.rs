//! Medical profile, history and analysis DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{self, MedicalField, OutcomeStatus};

/// Result of an upload analysis.
///
/// `message` is the analysed record on success and a short reason on failure.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct AnalysisResponse {
    /// `"success"` or `"failure"`.
    pub status: String,
    #[schema(value_type = Object)]
    pub message: Value,
}

impl From<models::AnalysisOutcome> for AnalysisResponse {
    fn from(outcome: models::AnalysisOutcome) -> Self {
        let status = match outcome.status {
            OutcomeStatus::Success => "success",
            OutcomeStatus::Failure => "failure",
        };
        Self {
            status: status.to_string(),
            message: outcome.message,
        }
    }
}

/// Multipart form for the image upload endpoints.
#[derive(Debug, utoipa::ToSchema)]
#[allow(dead_code)]
pub struct ImageUploadForm {
    #[schema(value_type = String, format = Binary)]
    pub image: Vec<u8>,
}

/// Multipart form for `POST /api/v1/med/upload-medical-report-pdf`.
#[derive(Debug, utoipa::ToSchema)]
#[allow(dead_code)]
pub struct PdfUploadForm {
    /// Must be sent with content type `application/pdf`.
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}

/// Request body for `POST /api/v1/med/infoupdate`.
///
/// Each field accepts a single string or a list of strings. Fields that are
/// absent keep their stored value; an empty string or list clears the field.
#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
pub struct UpdateMedicalInfoRequest {
    #[serde(default)]
    #[schema(value_type = Option<Vec<String>>)]
    pub allergy: Option<MedicalField>,
    #[serde(default)]
    #[schema(value_type = Option<Vec<String>>)]
    pub chronic_condition: Option<MedicalField>,
    #[serde(default)]
    #[schema(value_type = Option<Vec<String>>)]
    pub current_medication: Option<MedicalField>,
}

impl From<UpdateMedicalInfoRequest> for models::UpdateProfileRequest {
    fn from(req: UpdateMedicalInfoRequest) -> Self {
        Self {
            allergy: req.allergy,
            chronic_condition: req.chronic_condition,
            current_medication: req.current_medication,
        }
    }
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct UpdateResultResponse {
    pub result: String,
}

/// Stored profile fields for `GET /api/v1/med/infoget`.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct MedicalInfoResponse {
    pub email: String,
    pub allergy: Vec<String>,
    pub chronic_condition: Vec<String>,
    pub current_medication: Vec<String>,
}

impl From<models::MedicalProfile> for MedicalInfoResponse {
    fn from(profile: models::MedicalProfile) -> Self {
        Self {
            email: profile.email,
            allergy: profile.allergy.values().to_vec(),
            chronic_condition: profile.chronic_condition.values().to_vec(),
            current_medication: profile.current_medication.values().to_vec(),
        }
    }
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct HistoryEntryResponse {
    pub id: String,
    pub image_ref: String,
    #[schema(value_type = String)]
    pub date: DateTime<Utc>,
    /// `"med"` or `"report"`.
    #[serde(rename = "type")]
    pub kind: String,
    #[schema(value_type = Option<Object>)]
    pub response: Option<Value>,
}

impl From<models::HistoryEntry> for HistoryEntryResponse {
    fn from(entry: models::HistoryEntry) -> Self {
        Self {
            id: entry.id,
            image_ref: entry.image_ref,
            date: entry.date,
            kind: entry.kind.to_string(),
            response: entry.response.map(Value::Object),
        }
    }
}
