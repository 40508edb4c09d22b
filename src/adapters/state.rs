use axum::extract::FromRef;
use std::sync::Arc;

use crate::{
    application::{
        repositories::api_key_repository::ApiKeyRepository,
        services::{reconciliation_job::ReconciliationJob, upload_coordinator::UploadCoordinator},
    },
    domain::config::settings::Settings,
};

#[derive(Clone, FromRef)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub coordinator: Arc<UploadCoordinator>,
    pub reconciliation_job: Arc<ReconciliationJob>,
    pub api_keys: Arc<dyn ApiKeyRepository>,
}
