//! v1 medicine, report and medical profile handlers.
//!
//! Upload endpoints take a multipart form. The analysis result is returned
//! inside the envelope as `{status, message}`; a `failure` status means the
//! upload could not be read and nothing was recorded.

use axum::extract::{Multipart, State};
use axum::Extension;

use crate::api::v1::dto::{
    AnalysisResponse, HistoryEntryResponse, ImageUploadForm, MedicalInfoResponse,
    PdfUploadForm, UpdateMedicalInfoRequest, UpdateResultResponse,
};
use crate::api::v1::response::{ApiError, ApiResponse};
use crate::api::{AppJson, AppState};
use crate::error::{AppError, Result};
use crate::models::{UpdateProfileRequest, Upload, User};

const IMAGE_FIELD: &str = "image";
const PDF_FIELD: &str = "file";

/// `POST /api/v1/med/upload-medicine-image`
///
/// Identifies the medicine in the photo, looks it up in openFDA and assesses
/// it against the caller's allergies, conditions and medications.
#[utoipa::path(
    post,
    path = "/api/v1/med/upload-medicine-image",
    tag = "med",
    operation_id = "med.uploadMedicineImage",
    request_body(content = ImageUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Analysis outcome", body = AnalysisResponse),
        (status = 400, description = "Missing or unreadable form field", body = ApiError),
        (status = 401, description = "Missing or invalid token", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn upload_medicine_image(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    mut multipart: Multipart,
) -> ApiResponse<AnalysisResponse> {
    let upload = match read_upload(&mut multipart, IMAGE_FIELD).await {
        Ok(upload) => upload,
        Err(e) => return e.into(),
    };

    match state.analysis.analyze_medicine(&user, upload).await {
        Ok(outcome) => ApiResponse::success(outcome.into()),
        Err(e) => e.into(),
    }
}

/// `POST /api/v1/med/upload-medical-report-image`
#[utoipa::path(
    post,
    path = "/api/v1/med/upload-medical-report-image",
    tag = "med",
    operation_id = "med.uploadReportImage",
    request_body(content = ImageUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Analysis outcome", body = AnalysisResponse),
        (status = 400, description = "Missing or unreadable form field", body = ApiError),
        (status = 401, description = "Missing or invalid token", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn upload_report_image(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    mut multipart: Multipart,
) -> ApiResponse<AnalysisResponse> {
    let upload = match read_upload(&mut multipart, IMAGE_FIELD).await {
        Ok(upload) => upload,
        Err(e) => return e.into(),
    };

    match state.analysis.analyze_report_image(&user, upload).await {
        Ok(outcome) => ApiResponse::success(outcome.into()),
        Err(e) => e.into(),
    }
}

/// `POST /api/v1/med/upload-medical-report-pdf`
///
/// Every page is rendered and stacked into one image before analysis.
#[utoipa::path(
    post,
    path = "/api/v1/med/upload-medical-report-pdf",
    tag = "med",
    operation_id = "med.uploadReportPdf",
    request_body(content = PdfUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Analysis outcome", body = AnalysisResponse),
        (status = 400, description = "Missing or unreadable form field", body = ApiError),
        (status = 401, description = "Missing or invalid token", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn upload_report_pdf(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    mut multipart: Multipart,
) -> ApiResponse<AnalysisResponse> {
    let upload = match read_upload(&mut multipart, PDF_FIELD).await {
        Ok(upload) => upload,
        Err(e) => return e.into(),
    };

    match state.analysis.analyze_report_pdf(&user, upload).await {
        Ok(outcome) => ApiResponse::success(outcome.into()),
        Err(e) => e.into(),
    }
}

/// `POST /api/v1/med/infoupdate`
#[utoipa::path(
    post,
    path = "/api/v1/med/infoupdate",
    tag = "med",
    operation_id = "med.updateInfo",
    request_body = UpdateMedicalInfoRequest,
    responses(
        (status = 200, description = "Profile updated", body = UpdateResultResponse),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 401, description = "Missing or invalid token", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_medical_info(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    AppJson(req): AppJson<UpdateMedicalInfoRequest>,
) -> ApiResponse<UpdateResultResponse> {
    let update: UpdateProfileRequest = req.into();
    if let Err(e) = state
        .db
        .upsert_profile_fields(&user.id, &user.email, &update)
        .await
    {
        return e.into();
    }

    tracing::info!(user_id = %user.id, "Medical info updated");
    ApiResponse::success(UpdateResultResponse {
        result: "updated medical info".to_string(),
    })
}

/// `GET /api/v1/med/infoget`
#[utoipa::path(
    get,
    path = "/api/v1/med/infoget",
    tag = "med",
    operation_id = "med.getInfo",
    responses(
        (status = 200, description = "Stored medical info", body = MedicalInfoResponse),
        (status = 401, description = "Missing or invalid token", body = ApiError),
        (status = 404, description = "No medical profile yet", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_medical_info(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> ApiResponse<MedicalInfoResponse> {
    match state.db.get_profile(&user.id).await {
        Ok(Some(profile)) => ApiResponse::success(profile.into()),
        Ok(None) => AppError::NotFound("Medical report not found".to_string()).into(),
        Err(e) => e.into(),
    }
}

/// `GET /api/v1/med/history`
///
/// Most recent first. Empty for a user who has never uploaded anything.
#[utoipa::path(
    get,
    path = "/api/v1/med/history",
    tag = "med",
    operation_id = "med.history",
    responses(
        (status = 200, description = "History entries", body = Vec<HistoryEntryResponse>),
        (status = 401, description = "Missing or invalid token", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_history(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> ApiResponse<Vec<HistoryEntryResponse>> {
    match state.history.list(&user.id).await {
        Ok(entries) => ApiResponse::success(entries.into_iter().map(Into::into).collect()),
        Err(e) => e.into(),
    }
}

/// The first file sent under `field_name`. Other fields are skipped.
async fn read_upload(multipart: &mut Multipart, field_name: &str) -> Result<Upload> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {}", e.body_text())))?
    {
        if field.name() != Some(field_name) {
            continue;
        }

        let file_name = field.file_name().unwrap_or(field_name).to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read file: {}", e.body_text())))?;

        if bytes.is_empty() {
            return Err(AppError::Validation("Uploaded file is empty".to_string()));
        }

        return Ok(Upload::new(file_name, content_type, bytes.to_vec()));
    }

    Err(AppError::Validation(format!(
        "Missing `{field_name}` file field"
    )))
}
