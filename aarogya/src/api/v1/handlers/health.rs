use axum::extract::State;
use serde::Serialize;

use crate::api::state::AppState;
use crate::api::v1::response::ApiResponse;
use crate::llm::LlmBackend;

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct HealthData {
    pub status: String,
    pub version: String,
    pub database: DatabaseStatus,
    pub model: ModelStatus,
    pub auth: AuthStatus,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct DatabaseStatus {
    pub status: String,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct ModelStatus {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Whether the API client has been built yet.
    pub initialized: bool,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct AuthStatus {
    pub configured: bool,
}

/// `GET /api/v1/health`
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "health",
    responses(
        (status = 200, description = "Service health status", body = HealthData),
    )
)]
pub async fn health_check(State(state): State<AppState>) -> ApiResponse<HealthData> {
    let database = match state.db.sync().await {
        Ok(_) => DatabaseStatus {
            status: "ok".to_string(),
        },
        Err(e) => {
            tracing::warn!(error = %e, "Database health check failed");
            DatabaseStatus {
                status: "error".to_string(),
            }
        }
    };

    let model = match state.llm.backend() {
        LlmBackend::Unavailable { .. } => ModelStatus {
            status: "unavailable".to_string(),
            provider: None,
            model: None,
            initialized: false,
        },
        backend => {
            let provider = match backend {
                LlmBackend::OpenAI => "openai",
                LlmBackend::OpenRouter => "openrouter",
                LlmBackend::Ollama => "ollama",
                LlmBackend::LmStudio => "lmstudio",
                _ => "openai-compatible",
            };
            ModelStatus {
                status: "available".to_string(),
                provider: Some(provider.to_string()),
                model: state.llm.config().map(|c| c.model.clone()),
                initialized: state.llm.is_initialized(),
            }
        }
    };

    ApiResponse::success(HealthData {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database,
        model,
        auth: AuthStatus {
            configured: state.auth.is_configured(),
        },
    })
}
