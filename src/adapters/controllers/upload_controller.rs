use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::info;
use uuid::Uuid;

use crate::{
    adapters::{
        dto::upload_dto::{
            BeginUploadRequest, BeginUploadResponse, CompleteUploadRequest,
            CompleteUploadResponse, FailUploadResponse,
        },
        middleware::{AuthorizedTenant, ValidatedJson},
        state::AppState,
    },
    application::error::ApplicationError,
};

pub struct UploadController;

impl UploadController {
    /// Records an upload intent; the caller then transfers bytes to `uploadKey`.
    /// POST /api/v1/uploads
    pub async fn begin_upload(
        State(app_state): State<AppState>,
        AuthorizedTenant(tenant_id): AuthorizedTenant,
        ValidatedJson(body): ValidatedJson<BeginUploadRequest>,
    ) -> Result<(StatusCode, Json<BeginUploadResponse>), ApplicationError> {
        let intent = app_state
            .coordinator
            .begin_upload(tenant_id, body.into())
            .await?;

        Ok((StatusCode::CREATED, Json(intent.into())))
    }

    /// POST /api/v1/uploads/{id}/complete
    pub async fn complete_upload(
        State(app_state): State<AppState>,
        AuthorizedTenant(tenant_id): AuthorizedTenant,
        Path(id): Path<Uuid>,
        ValidatedJson(body): ValidatedJson<CompleteUploadRequest>,
    ) -> Result<Json<CompleteUploadResponse>, ApplicationError> {
        let storage_key = body.storage_key.unwrap_or_default();
        let record = app_state
            .coordinator
            .complete_upload(tenant_id, id, &storage_key)
            .await?;

        Ok(Json(record.into()))
    }

    /// POST /api/v1/uploads/{id}/fail
    pub async fn fail_upload(
        State(app_state): State<AppState>,
        AuthorizedTenant(tenant_id): AuthorizedTenant,
        Path(id): Path<Uuid>,
    ) -> Result<Json<FailUploadResponse>, ApplicationError> {
        app_state.coordinator.fail_upload(tenant_id, id).await?;
        info!(%tenant_id, file_id = %id, "Upload failure acknowledged");

        Ok(Json(FailUploadResponse { ack: true }))
    }
}
