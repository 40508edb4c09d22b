use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    application::services::reconciliation_job::ReconcileReport,
    domain::{
        config::local::UploadStrategy,
        models::file_record::{FileRecord, FileState},
    },
};

#[derive(Debug, Serialize)]
pub struct FileResponse {
    pub id: Uuid,
    #[serde(rename = "storageKey")]
    pub storage_key: Option<String>,
    pub filename: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    pub size: u64,
    pub category: String,
    #[serde(rename = "entityType")]
    pub entity_type: String,
    #[serde(rename = "entityId")]
    pub entity_id: String,
    #[serde(rename = "expiresAt")]
    pub expires_at: Option<DateTime<Utc>>,
    pub state: FileState,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl From<FileRecord> for FileResponse {
    fn from(record: FileRecord) -> Self {
        Self {
            id: record.id,
            storage_key: record.storage_key,
            filename: record.filename,
            mime_type: record.mime_type,
            size: record.size,
            category: record.category,
            entity_type: record.entity_type,
            entity_id: record.entity_id,
            expires_at: record.expires_at,
            state: record.state,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct UploadQuery {
    pub strategy: Option<UploadStrategy>,
}

#[derive(Debug, Deserialize, Default)]
pub struct CleanupQuery {
    pub secret: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CleanupResponse {
    #[serde(rename = "storageKeys")]
    pub storage_keys: Vec<String>,
    pub purged: usize,
    pub retried: usize,
    pub skipped: usize,
    pub failed: usize,
    #[serde(rename = "orphansRemoved")]
    pub orphans_removed: usize,
}

impl From<ReconcileReport> for CleanupResponse {
    fn from(report: ReconcileReport) -> Self {
        Self {
            storage_keys: report.storage_keys,
            purged: report.purged,
            retried: report.retried,
            skipped: report.skipped,
            failed: report.failed,
            orphans_removed: report.orphans_removed,
        }
    }
}
