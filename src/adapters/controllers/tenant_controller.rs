use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::info;
use uuid::Uuid;

use crate::{
    adapters::{dto::api_key_dto::ApiKeyResponse, state::AppState},
    application::error::ApplicationError,
};

pub struct TenantController;

impl TenantController {
    /// Issues an API key acting for `tenant_id`. Admin only.
    /// POST /api/v1/tenants/{tenantId}/keys
    pub async fn issue_api_key(
        State(app_state): State<AppState>,
        Path(tenant_id): Path<Uuid>,
    ) -> Result<(StatusCode, Json<ApiKeyResponse>), ApplicationError> {
        let ttl_seconds = app_state.settings.policy.api_key_ttl_seconds;

        let api_key = app_state
            .api_keys
            .issue_key(tenant_id, ttl_seconds)
            .await?;

        info!(%tenant_id, "API key handed out");

        Ok((
            StatusCode::CREATED,
            Json(ApiKeyResponse {
                api_key,
                expires_in: ttl_seconds,
            }),
        ))
    }
}
