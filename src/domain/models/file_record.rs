use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::file::{derive_storage_key, FileDescriptor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileState {
    Pending,
    Uploaded,
    Failed,
}

impl FileState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Uploaded => "uploaded",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for FileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "uploaded" => Ok(Self::Uploaded),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown file state '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub storage_key: Option<String>,
    pub filename: String,
    pub mime_type: String,
    pub size: u64,
    pub category: String,
    pub entity_type: String,
    /// Lookup key of the business entity (driver, truck, load...). Not owned by this record.
    pub entity_id: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub state: FileState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FileRecord {
    pub fn pending(
        id: Uuid,
        tenant_id: Uuid,
        descriptor: FileDescriptor,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            tenant_id,
            storage_key: None,
            filename: descriptor.filename,
            mime_type: descriptor.mime_type,
            size: descriptor.size,
            category: descriptor.category,
            entity_type: descriptor.entity_type,
            entity_id: descriptor.entity_id,
            expires_at: descriptor.expires_at,
            state: FileState::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    /// Key the bytes of this attempt are expected at.
    pub fn upload_key(&self) -> String {
        derive_storage_key(self.tenant_id, &self.category, self.id, &self.filename)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}
