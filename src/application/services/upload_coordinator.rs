use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    application::{
        error::ApplicationError,
        repositories::file_record_repository::{
            CasOutcome, FileRecordRepository, TransitionPatch,
        },
        services::object_storage::ObjectStorage,
    },
    domain::{
        config::local::UploadStrategy,
        models::{
            file::{derive_storage_key, tenant_prefix, FileData, FileDescriptor, MAX_UPLOAD_BYTES},
            file_record::{FileRecord, FileState},
        },
    },
};

/// Handle returned by [`UploadCoordinator::begin_upload`].
#[derive(Debug, Clone, PartialEq)]
pub struct UploadIntent {
    pub id: Uuid,
    /// Where the caller is expected to place the bytes.
    pub upload_key: String,
}

/// Drives one upload attempt across the metadata store and object storage.
///
/// Holds no per-upload state: concurrent attempts only meet in the metadata store,
/// where every transition is a compare-and-swap against `Pending`.
pub struct UploadCoordinator {
    files: Arc<dyn FileRecordRepository>,
    storage: Arc<dyn ObjectStorage>,
    max_upload_bytes: u64,
}

impl UploadCoordinator {
    pub fn new(
        files: Arc<dyn FileRecordRepository>,
        storage: Arc<dyn ObjectStorage>,
        max_upload_bytes: u64,
    ) -> Self {
        Self {
            files,
            storage,
            max_upload_bytes: max_upload_bytes.min(MAX_UPLOAD_BYTES),
        }
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_bytes
    }

    fn validate(&self, descriptor: &FileDescriptor) -> Result<(), ApplicationError> {
        if let Some(field) = descriptor.missing_field() {
            return Err(ApplicationError::Validation(format!(
                "missing required field '{}'",
                field
            )));
        }
        if descriptor.size == 0 {
            return Err(ApplicationError::Validation(
                "size must be greater than zero".to_string(),
            ));
        }
        if !descriptor.validate_size(self.max_upload_bytes) {
            return Err(ApplicationError::PayloadTooLarge {
                size: descriptor.size,
                max: self.max_upload_bytes,
            });
        }
        Ok(())
    }

    /// Records the intent to upload. Nothing may be transferred before this returns.
    pub async fn begin_upload(
        &self,
        tenant_id: Uuid,
        descriptor: FileDescriptor,
    ) -> Result<UploadIntent, ApplicationError> {
        self.validate(&descriptor)?;

        let record = FileRecord::pending(Uuid::new_v4(), tenant_id, descriptor, Utc::now());
        let upload_key = record.upload_key();
        let id = self.files.insert(record).await?;

        info!(%tenant_id, file_id = %id, upload_key = %upload_key, "Upload intent recorded");

        Ok(UploadIntent { id, upload_key })
    }

    /// `Pending -> Uploaded`. Repeating a successful call with the same key returns the same record.
    ///
    /// The key must live under the caller's tenant prefix; anything else is `Unauthorized`.
    pub async fn complete_upload(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        storage_key: &str,
    ) -> Result<FileRecord, ApplicationError> {
        if storage_key.trim().is_empty() {
            return Err(ApplicationError::Validation(
                "missing required field 'storageKey'".to_string(),
            ));
        }
        if !storage_key.starts_with(&tenant_prefix(tenant_id)) {
            warn!(
                %tenant_id,
                file_id = %id,
                storage_key,
                "Completion outside the tenant prefix rejected"
            );
            return Err(ApplicationError::Unauthorized);
        }

        let patch = TransitionPatch {
            storage_key: Some(storage_key.to_string()),
        };
        let outcome = self
            .files
            .cas_transition(tenant_id, id, FileState::Pending, FileState::Uploaded, patch)
            .await?;

        match outcome {
            CasOutcome::Applied(record) => {
                info!(%tenant_id, file_id = %id, storage_key, "Upload completed");
                Ok(record)
            }
            CasOutcome::Conflict(current) => match current.state {
                FileState::Uploaded if current.storage_key.as_deref() == Some(storage_key) => {
                    info!(%tenant_id, file_id = %id, "Repeated completion, nothing to do");
                    Ok(current)
                }
                FileState::Uploaded => {
                    warn!(
                        %tenant_id,
                        file_id = %id,
                        existing_key = ?current.storage_key,
                        requested_key = storage_key,
                        "Completion with a different key rejected"
                    );
                    Err(ApplicationError::Conflict(format!(
                        "file {} is already uploaded under another key",
                        id
                    )))
                }
                state => Err(ApplicationError::Conflict(format!(
                    "file {} is {}, cannot complete",
                    id, state
                ))),
            },
            CasOutcome::NotFound => Err(ApplicationError::NotFound),
        }
    }

    /// `Pending -> Failed`, then a best-effort removal of anything that landed at the derived key.
    pub async fn fail_upload(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<FileRecord, ApplicationError> {
        let outcome = self
            .files
            .cas_transition(
                tenant_id,
                id,
                FileState::Pending,
                FileState::Failed,
                TransitionPatch::default(),
            )
            .await?;

        match outcome {
            CasOutcome::Applied(record) => {
                info!(%tenant_id, file_id = %id, "Upload marked as failed");
                self.compensate(&record).await;
                Ok(record)
            }
            CasOutcome::Conflict(current) if current.state == FileState::Failed => Ok(current),
            CasOutcome::Conflict(current) => Err(ApplicationError::Conflict(format!(
                "file {} is {}, cannot fail",
                id, current.state
            ))),
            CasOutcome::NotFound => Err(ApplicationError::NotFound),
        }
    }

    async fn compensate(&self, record: &FileRecord) {
        let key = record.upload_key();
        if let Err(e) = self.storage.delete(&key).await {
            // Reconciliation reclaims the blob later.
            warn!(
                tenant_id = %record.tenant_id,
                file_id = %record.id,
                storage_key = %key,
                error = %e,
                "Compensating delete failed"
            );
        }
    }

    /// Server-side upload: this process moves the bytes itself, in the order `strategy` names.
    pub async fn upload_bytes(
        &self,
        tenant_id: Uuid,
        mut descriptor: FileDescriptor,
        content: Vec<u8>,
        strategy: UploadStrategy,
    ) -> Result<FileRecord, ApplicationError> {
        descriptor.size = content.len() as u64;
        self.validate(&descriptor)?;

        match strategy {
            UploadStrategy::RecordFirst => {
                self.upload_record_first(tenant_id, descriptor, content)
                    .await
            }
            UploadStrategy::TransferFirst => {
                self.upload_transfer_first(tenant_id, descriptor, content)
                    .await
            }
        }
    }

    async fn upload_record_first(
        &self,
        tenant_id: Uuid,
        descriptor: FileDescriptor,
        content: Vec<u8>,
    ) -> Result<FileRecord, ApplicationError> {
        let file_data = FileData::new(
            content,
            descriptor.filename.clone(),
            descriptor.mime_type.clone(),
        );
        let intent = self.begin_upload(tenant_id, descriptor).await?;

        if let Err(e) = self.storage.put(&intent.upload_key, file_data).await {
            if let Err(fail_err) = self.fail_upload(tenant_id, intent.id).await {
                warn!(
                    %tenant_id,
                    file_id = %intent.id,
                    error = %fail_err,
                    "Could not mark upload as failed, leaving it to reconciliation"
                );
            }
            return Err(e);
        }

        self.complete_upload(tenant_id, intent.id, &intent.upload_key)
            .await
    }

    async fn upload_transfer_first(
        &self,
        tenant_id: Uuid,
        descriptor: FileDescriptor,
        content: Vec<u8>,
    ) -> Result<FileRecord, ApplicationError> {
        let id = Uuid::new_v4();
        let storage_key = derive_storage_key(tenant_id, &descriptor.category, id, &descriptor.filename);
        let file_data = FileData::new(
            content,
            descriptor.filename.clone(),
            descriptor.mime_type.clone(),
        );

        self.storage.put(&storage_key, file_data).await?;

        let mut record = FileRecord::pending(id, tenant_id, descriptor, Utc::now());
        record.state = FileState::Uploaded;
        record.storage_key = Some(storage_key.clone());

        match self.files.insert(record.clone()).await {
            Ok(_) => {
                info!(%tenant_id, file_id = %id, storage_key = %storage_key, "Upload stored");
                Ok(record)
            }
            Err(e) => {
                warn!(
                    %tenant_id,
                    file_id = %id,
                    storage_key = %storage_key,
                    error = %e,
                    "Blob stored without a record, orphan sweep will reclaim it"
                );
                Err(e)
            }
        }
    }

    pub async fn get_file(&self, tenant_id: Uuid, id: Uuid) -> Result<FileRecord, ApplicationError> {
        self.files.get(tenant_id, id).await
    }

    pub async fn list_entity_files(
        &self,
        tenant_id: Uuid,
        entity_type: &str,
        entity_id: &str,
    ) -> Result<Vec<FileRecord>, ApplicationError> {
        self.files
            .list_by_entity(tenant_id, entity_type, entity_id)
            .await
    }

    /// Bytes of an uploaded file. Pending and failed records have nothing to serve.
    pub async fn download(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<(FileRecord, Vec<u8>), ApplicationError> {
        let record = self.files.get(tenant_id, id).await?;
        let storage_key = match (&record.state, &record.storage_key) {
            (FileState::Uploaded, Some(key)) => key.clone(),
            _ => return Err(ApplicationError::NotFound),
        };
        let content = self.storage.get(&storage_key).await?;
        Ok((record, content))
    }
}
