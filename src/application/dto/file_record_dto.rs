use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    application::error::ApplicationError,
    domain::models::file_record::{FileRecord, FileState},
};

/// Persistence shape of a [`FileRecord`]: sizes as signed integers and the state as text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecordDTO {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub storage_key: Option<String>,
    pub filename: String,
    pub mime_type: String,
    pub size: i64,
    pub category: String,
    pub entity_type: String,
    pub entity_id: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub state: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<FileRecord> for FileRecordDTO {
    fn from(value: FileRecord) -> Self {
        FileRecordDTO {
            id: value.id,
            tenant_id: value.tenant_id,
            storage_key: value.storage_key,
            filename: value.filename,
            mime_type: value.mime_type,
            size: std::cmp::min(value.size, i64::MAX as u64) as i64,
            category: value.category,
            entity_type: value.entity_type,
            entity_id: value.entity_id,
            expires_at: value.expires_at,
            state: value.state.as_str().to_string(),
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

impl TryFrom<FileRecordDTO> for FileRecord {
    type Error = ApplicationError;

    fn try_from(value: FileRecordDTO) -> Result<Self, Self::Error> {
        let state = value
            .state
            .parse::<FileState>()
            .map_err(ApplicationError::DatabaseError)?;

        Ok(FileRecord {
            id: value.id,
            tenant_id: value.tenant_id,
            storage_key: value.storage_key,
            filename: value.filename,
            mime_type: value.mime_type,
            size: value.size.max(0) as u64,
            category: value.category,
            entity_type: value.entity_type,
            entity_id: value.entity_id,
            expires_at: value.expires_at,
            state,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}
