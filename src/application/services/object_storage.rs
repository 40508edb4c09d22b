use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{application::error::ApplicationError, domain::models::file::FileData};

#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub key: String,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Byte storage addressed by key. Implementations hold no per-upload state.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn put(&self, key: &str, file_data: FileData) -> Result<(), ApplicationError>;
    async fn get(&self, key: &str) -> Result<Vec<u8>, ApplicationError>;
    /// Removing a key that does not exist succeeds.
    async fn delete(&self, key: &str) -> Result<(), ApplicationError>;
    async fn list(&self, prefix: &str) -> Result<Vec<StoredObject>, ApplicationError>;
    /// Top-level key segments, each with its trailing `/`.
    async fn list_prefixes(&self) -> Result<Vec<String>, ApplicationError>;
}
