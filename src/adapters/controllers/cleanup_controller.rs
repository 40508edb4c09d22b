use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use tracing::warn;

use crate::{
    adapters::{
        dto::file_dto::{CleanupQuery, CleanupResponse},
        middleware::AuthorizedTenant,
        state::AppState,
    },
    application::error::ApplicationError,
};

pub struct CleanupController;

impl CleanupController {
    /// Runs one reconciliation pass for the caller's tenant.
    /// GET /api/v1/cleanup?secret=<shared secret>
    pub async fn cleanup(
        State(app_state): State<AppState>,
        AuthorizedTenant(tenant_id): AuthorizedTenant,
        Query(query): Query<CleanupQuery>,
    ) -> Result<Json<CleanupResponse>, ApplicationError> {
        let expected = &app_state.settings.secrets.cleanup_secret;
        if query.secret.as_deref() != Some(expected.as_str()) {
            warn!(%tenant_id, "Cleanup requested with an invalid secret");
            return Err(ApplicationError::Unauthorized);
        }

        let report = app_state
            .reconciliation_job
            .reconcile(tenant_id, Utc::now())
            .await?;

        Ok(Json(report.into()))
    }
}
