use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    application::error::ApplicationError,
    domain::models::file_record::{FileRecord, FileState},
};

/// Fields written together with a state transition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransitionPatch {
    pub storage_key: Option<String>,
}

/// Result of a compare-and-swap transition.
#[derive(Debug, Clone, PartialEq)]
pub enum CasOutcome {
    /// The record was in the expected state and now holds the new one.
    Applied(FileRecord),
    /// The record exists but was not in the expected state; carries what was observed.
    Conflict(FileRecord),
    NotFound,
}

/// Selection used by the reconciliation scan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StaleFilter {
    /// Pending and failed records created strictly before this instant.
    pub created_before: DateTime<Utc>,
    /// Uploaded records whose expiry is at or before this instant.
    pub expired_at_or_before: DateTime<Utc>,
}

impl StaleFilter {
    pub fn matches(&self, record: &FileRecord) -> bool {
        match record.state {
            FileState::Pending | FileState::Failed => record.created_at < self.created_before,
            FileState::Uploaded => record.is_expired_at(self.expired_at_or_before),
        }
    }
}

/// Metadata store for upload intents.
///
/// Every tenant-scoped call fails with `Unauthorized` when the id belongs to another tenant.
/// The only concurrency requirement is that `cas_transition` and `delete_if_state` are atomic.
#[async_trait]
pub trait FileRecordRepository: Send + Sync {
    async fn insert(&self, record: FileRecord) -> Result<Uuid, ApplicationError>;
    async fn get(&self, tenant_id: Uuid, id: Uuid) -> Result<FileRecord, ApplicationError>;
    async fn cas_transition(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        from: FileState,
        to: FileState,
        patch: TransitionPatch,
    ) -> Result<CasOutcome, ApplicationError>;
    async fn query_stale(
        &self,
        tenant_id: Uuid,
        filter: StaleFilter,
    ) -> Result<Vec<FileRecord>, ApplicationError>;
    /// Deletes the record only if it is still in `state`. Returns false when nothing matched,
    /// including when the record is already gone.
    async fn delete_if_state(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        state: FileState,
    ) -> Result<bool, ApplicationError>;
    async fn list_by_entity(
        &self,
        tenant_id: Uuid,
        entity_type: &str,
        entity_id: &str,
    ) -> Result<Vec<FileRecord>, ApplicationError>;
    async fn list_tenants(&self) -> Result<Vec<Uuid>, ApplicationError>;
    /// Unscoped existence check, used to attribute blobs found by prefix.
    async fn exists(&self, id: Uuid) -> Result<bool, ApplicationError>;
}
