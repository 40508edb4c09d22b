use serde::{Deserialize, Serialize};

use crate::domain::models::file::MAX_UPLOAD_BYTES;

/// Limits shared by every tenant.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct UploadPolicy {
    #[serde(rename = "maxUploadBytes")]
    pub max_upload_bytes: u64,
    /// Age a pending or failed record must exceed before reconciliation reclaims it.
    #[serde(rename = "retentionSeconds")]
    pub retention_seconds: u64,
    #[serde(rename = "apiKeyTtlSeconds")]
    pub api_key_ttl_seconds: u64,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_upload_bytes: MAX_UPLOAD_BYTES,
            retention_seconds: 24 * 60 * 60,
            api_key_ttl_seconds: 30 * 24 * 60 * 60,
        }
    }
}

impl UploadPolicy {
    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.retention_seconds.min(i64::MAX as u64) as i64)
    }
}
