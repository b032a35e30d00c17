use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::services::ServeDir;

use crate::api::state::AppState;

use super::handlers;
use super::middleware::v1_auth_middleware;

pub fn v1_router(state: AppState) -> Router<AppState> {
    let public_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/openapi.json", get(super::openapi::openapi_json))
        .merge(super::openapi::redoc_router())
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/logout", post(handlers::auth::logout))
        .nest_service("/images", ServeDir::new(&state.config.storage.image_dir));

    let med = Router::new()
        .route(
            "/upload-medicine-image",
            post(handlers::med::upload_medicine_image),
        )
        .route(
            "/upload-medical-report-image",
            post(handlers::med::upload_report_image),
        )
        .route(
            "/upload-medical-report-pdf",
            post(handlers::med::upload_report_pdf),
        )
        .route("/infoupdate", post(handlers::med::update_medical_info))
        .route("/infoget", get(handlers::med::get_medical_info))
        .route("/history", get(handlers::med::get_history));

    let protected_routes = Router::new()
        .route("/auth/current", get(handlers::auth::current_user))
        .nest("/med", med)
        .route_layer(middleware::from_fn_with_state(state, v1_auth_middleware));

    Router::new().merge(public_routes).merge(protected_routes)
}
