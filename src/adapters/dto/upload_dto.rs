use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    application::services::upload_coordinator::UploadIntent,
    domain::models::{file::FileDescriptor, file_record::FileRecord},
};

/// Fields are optional so a missing one surfaces as a validation error naming it,
/// not as a body rejection.
#[derive(Debug, Deserialize, Default)]
pub struct BeginUploadRequest {
    pub filename: Option<String>,
    #[serde(rename = "mimeType")]
    pub mime_type: Option<String>,
    pub size: Option<u64>,
    pub category: Option<String>,
    #[serde(rename = "entityType")]
    pub entity_type: Option<String>,
    #[serde(rename = "entityId")]
    pub entity_id: Option<String>,
    #[serde(rename = "expiresAt")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<BeginUploadRequest> for FileDescriptor {
    fn from(request: BeginUploadRequest) -> Self {
        FileDescriptor {
            filename: request.filename.unwrap_or_default(),
            mime_type: request.mime_type.unwrap_or_default(),
            size: request.size.unwrap_or(0),
            category: request.category.unwrap_or_default(),
            entity_type: request.entity_type.unwrap_or_default(),
            entity_id: request.entity_id.unwrap_or_default(),
            expires_at: request.expires_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BeginUploadResponse {
    pub id: Uuid,
    #[serde(rename = "uploadKey")]
    pub upload_key: String,
}

impl From<UploadIntent> for BeginUploadResponse {
    fn from(intent: UploadIntent) -> Self {
        Self {
            id: intent.id,
            upload_key: intent.upload_key,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct CompleteUploadRequest {
    #[serde(rename = "storageKey")]
    pub storage_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CompleteUploadResponse {
    pub id: Uuid,
    #[serde(rename = "storageKey")]
    pub storage_key: Option<String>,
}

impl From<FileRecord> for CompleteUploadResponse {
    fn from(record: FileRecord) -> Self {
        Self {
            id: record.id,
            storage_key: record.storage_key,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FailUploadResponse {
    pub ack: bool,
}
