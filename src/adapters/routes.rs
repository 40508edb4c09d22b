use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::adapters::{
    controllers::{
        cleanup_controller::CleanupController, file_controller::FileController,
        health_controller::HealthController, tenant_controller::TenantController,
        upload_controller::UploadController,
    },
    middleware::validate_admin_secret,
    state::AppState,
};

/// Room for multipart boundaries and text fields on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

fn cors_layer(origins: Option<&[String]>) -> CorsLayer {
    match origins {
        Some(origins) => {
            let origins: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|origin| match origin.parse::<HeaderValue>() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        warn!(%origin, "Ignoring invalid CORS origin");
                        None
                    }
                })
                .collect();
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any)
        }
        // Allow all origins if not specified (only for development)
        None => CorsLayer::permissive(),
    }
}

pub fn router(app_state: AppState) -> Router {
    let upload_limit =
        app_state.coordinator.max_upload_bytes() as usize + MULTIPART_OVERHEAD_BYTES;
    let cors = cors_layer(app_state.settings.server.cors_allowed_origins.as_deref());

    // Protected routes that require X-ADMIN-SECRET header
    let admin_routes = Router::new()
        .route("/api/v1/health", get(HealthController::health_check))
        .route(
            "/api/v1/tenants/{tenant_id}/keys",
            post(TenantController::issue_api_key),
        )
        .route_layer(middleware::from_fn_with_state(
            app_state.settings.clone(),
            validate_admin_secret,
        ));

    // Tenant routes, authorized per handler by the bearer API key
    let tenant_routes = Router::new()
        .route("/api/v1/uploads", post(UploadController::begin_upload))
        .route(
            "/api/v1/uploads/{id}/complete",
            post(UploadController::complete_upload),
        )
        .route(
            "/api/v1/uploads/{id}/fail",
            post(UploadController::fail_upload),
        )
        .route(
            "/api/v1/files",
            post(FileController::upload_file).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/v1/files/{id}", get(FileController::get_file))
        .route(
            "/api/v1/files/{id}/content",
            get(FileController::download_file),
        )
        .route(
            "/api/v1/entities/{entity_type}/{entity_id}/files",
            get(FileController::list_entity_files),
        )
        .route("/api/v1/cleanup", get(CleanupController::cleanup));

    Router::new()
        .merge(admin_routes)
        .merge(tenant_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
