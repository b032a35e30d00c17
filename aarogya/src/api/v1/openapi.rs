use axum::Json;
use utoipa::OpenApi;
use utoipa_redoc::{Redoc, Servable};

use super::dto;
use super::handlers;
use super::response;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Aarogya API",
        version = "1.0.0",
        description = "Medicine and medical report analysis. Uploads are read by a vision model, cross-checked against openFDA and the user's medical profile, and kept in a per-user history.",
    ),
    paths(
        handlers::health::health_check,
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::logout,
        handlers::auth::current_user,
        handlers::med::upload_medicine_image,
        handlers::med::upload_report_image,
        handlers::med::upload_report_pdf,
        handlers::med::update_medical_info,
        handlers::med::get_medical_info,
        handlers::med::get_history,
    ),
    components(schemas(
        // Response envelope
        response::ErrorCode,
        response::ApiError,
        // Auth
        dto::auth::RegisterRequest,
        dto::auth::LoginRequest,
        dto::auth::UserResponse,
        dto::auth::CurrentUserResponse,
        dto::auth::TokenResponse,
        dto::auth::MessageResponse,
        // Med
        dto::med::AnalysisResponse,
        dto::med::ImageUploadForm,
        dto::med::PdfUploadForm,
        dto::med::UpdateMedicalInfoRequest,
        dto::med::UpdateResultResponse,
        dto::med::MedicalInfoResponse,
        dto::med::HistoryEntryResponse,
        // Health (handler-local types)
        handlers::health::HealthData,
        handlers::health::DatabaseStatus,
        handlers::health::ModelStatus,
        handlers::health::AuthStatus,
    )),
    tags(
        (name = "health", description = "Health check"),
        (name = "auth", description = "Registration, login and the current account"),
        (name = "med", description = "Uploads, medical profile and analysis history (auth required)"),
    ),
    modifiers(&SecurityAddon),
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            utoipa::openapi::security::SecurityScheme::Http(utoipa::openapi::security::Http::new(
                utoipa::openapi::security::HttpAuthScheme::Bearer,
            )),
        );
    }
}

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub fn redoc_router<S: Clone + Send + Sync + 'static>() -> axum::Router<S> {
    Redoc::with_url("/docs", ApiDoc::openapi()).into()
}
