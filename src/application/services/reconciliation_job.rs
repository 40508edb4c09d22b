use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
    application::{
        error::ApplicationError,
        repositories::file_record_repository::{FileRecordRepository, StaleFilter},
        services::object_storage::ObjectStorage,
    },
    domain::models::{
        file::{parse_storage_token, tenant_prefix},
        file_record::FileState,
    },
};

/// A record selected for removal, with the state it was observed in.
#[derive(Debug, Clone, PartialEq)]
pub struct StaleCandidate {
    pub id: Uuid,
    pub observed_state: FileState,
    pub storage_key: Option<String>,
    pub derived_key: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconcileReport {
    pub scanned: usize,
    /// Records deleted together with their blob.
    pub purged: usize,
    /// Blob deletion failed; the record is kept for the next pass.
    pub retried: usize,
    /// The record changed state or disappeared after selection.
    pub skipped: usize,
    /// Metadata deletion failed.
    pub failed: usize,
    pub orphans_removed: usize,
    /// Keys removed during the pass, or safe to remove.
    pub storage_keys: Vec<String>,
}

/// Converges the metadata store and object storage for one tenant.
///
/// Holds no schedule of its own; the interval scheduler and the cleanup endpoint invoke it.
/// Two overlapping passes are safe: every metadata delete is conditional on the state
/// observed during the scan.
pub struct ReconciliationJob {
    files: Arc<dyn FileRecordRepository>,
    storage: Arc<dyn ObjectStorage>,
    retention: Duration,
}

impl ReconciliationJob {
    pub fn new(
        files: Arc<dyn FileRecordRepository>,
        storage: Arc<dyn ObjectStorage>,
        retention: Duration,
    ) -> Self {
        Self {
            files,
            storage,
            retention,
        }
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// Tenants with records plus tenants that only have blobs left, so orphans of a
    /// tenant without records still get swept.
    pub async fn tenants(&self) -> Result<Vec<Uuid>, ApplicationError> {
        let mut tenants = self.files.list_tenants().await?;

        match self.storage.list_prefixes().await {
            Ok(prefixes) => tenants.extend(
                prefixes
                    .iter()
                    .filter_map(|prefix| Uuid::try_parse(prefix.trim_end_matches('/')).ok()),
            ),
            Err(e) => warn!(
                error = %e,
                "Could not list storage prefixes, sweeping known tenants only"
            ),
        }

        tenants.sort();
        tenants.dedup();
        Ok(tenants)
    }

    /// Pending/failed records older than the retention window and expired uploads.
    pub async fn scan_stale(
        &self,
        tenant_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<StaleCandidate>, ApplicationError> {
        let filter = StaleFilter {
            created_before: now - self.retention,
            expired_at_or_before: now,
        };
        let records = self.files.query_stale(tenant_id, filter).await?;

        Ok(records
            .into_iter()
            .map(|record| StaleCandidate {
                id: record.id,
                observed_state: record.state,
                derived_key: record.upload_key(),
                storage_key: record.storage_key,
            })
            .collect())
    }

    /// Full pass: stale records first, then blobs nothing points at.
    ///
    /// Only a failing scan aborts; per-candidate failures are counted and retried next run.
    pub async fn reconcile(
        &self,
        tenant_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<ReconcileReport, ApplicationError> {
        let candidates = self.scan_stale(tenant_id, now).await?;
        let mut report = self.purge(tenant_id, candidates).await;

        match self.sweep_orphans(tenant_id, now).await {
            Ok(keys) => {
                report.orphans_removed = keys.len();
                report.storage_keys.extend(keys);
            }
            Err(e) => error!(%tenant_id, error = %e, "Orphan sweep failed"),
        }

        info!(
            %tenant_id,
            scanned = report.scanned,
            purged = report.purged,
            retried = report.retried,
            skipped = report.skipped,
            failed = report.failed,
            orphans_removed = report.orphans_removed,
            "Reconciliation pass finished"
        );

        Ok(report)
    }

    /// Removes each candidate. A candidate with a blob loses the blob before the record, so a
    /// failed blob delete never drops the only pointer to it.
    pub async fn purge(&self, tenant_id: Uuid, candidates: Vec<StaleCandidate>) -> ReconcileReport {
        let mut report = ReconcileReport {
            scanned: candidates.len(),
            ..Default::default()
        };

        for candidate in candidates {
            if let Some(storage_key) = &candidate.storage_key {
                if let Err(e) = self.storage.delete(storage_key).await {
                    error!(
                        %tenant_id,
                        file_id = %candidate.id,
                        storage_key = %storage_key,
                        error = %e,
                        "Failed to delete blob, keeping record for the next pass"
                    );
                    report.retried += 1;
                    continue;
                }
            }

            match self
                .files
                .delete_if_state(tenant_id, candidate.id, candidate.observed_state)
                .await
            {
                Ok(true) => {
                    debug!(%tenant_id, file_id = %candidate.id, state = %candidate.observed_state, "Purged record");
                    report.purged += 1;
                    match &candidate.storage_key {
                        Some(storage_key) => report.storage_keys.push(storage_key.clone()),
                        None => {
                            // An abandoned transfer may still have landed at the derived key.
                            if let Err(e) = self.storage.delete(&candidate.derived_key).await {
                                warn!(
                                    %tenant_id,
                                    file_id = %candidate.id,
                                    storage_key = %candidate.derived_key,
                                    error = %e,
                                    "Failed to delete derived key, leaving it to the orphan sweep"
                                );
                            }
                            report.storage_keys.push(candidate.derived_key.clone());
                        }
                    }
                }
                Ok(false) => {
                    debug!(%tenant_id, file_id = %candidate.id, "Record changed since scan, skipped");
                    report.skipped += 1;
                }
                Err(e) => {
                    error!(
                        %tenant_id,
                        file_id = %candidate.id,
                        error = %e,
                        "Failed to delete record"
                    );
                    report.failed += 1;
                }
            }
        }

        report
    }

    /// Deletes blobs under the tenant prefix that are older than the retention window and whose
    /// embedded record id no longer exists. Keys that do not carry a record id are left alone.
    pub async fn sweep_orphans(
        &self,
        tenant_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<String>, ApplicationError> {
        let cutoff = now - self.retention;
        let objects = self.storage.list(&tenant_prefix(tenant_id)).await?;
        let mut removed = Vec::new();

        for object in objects {
            if !object.last_modified.is_some_and(|modified| modified < cutoff) {
                continue;
            }
            let Some(record_id) = parse_storage_token(&object.key) else {
                continue;
            };

            match self.files.exists(record_id).await {
                Ok(true) => {}
                Ok(false) => match self.storage.delete(&object.key).await {
                    Ok(()) => {
                        info!(%tenant_id, storage_key = %object.key, size = object.size, "Removed orphan blob");
                        removed.push(object.key);
                    }
                    Err(e) => {
                        error!(%tenant_id, storage_key = %object.key, error = %e, "Failed to remove orphan blob")
                    }
                },
                Err(e) => {
                    error!(%tenant_id, storage_key = %object.key, error = %e, "Could not attribute blob")
                }
            }
        }

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        application::services::upload_coordinator::UploadCoordinator,
        domain::{
            config::local::UploadStrategy,
            models::file::{derive_storage_key, MAX_UPLOAD_BYTES},
        },
        test_support::{descriptor, InMemoryFileRecordRepository, InMemoryObjectStorage},
    };

    struct Fixture {
        coordinator: UploadCoordinator,
        job: ReconciliationJob,
        files: Arc<InMemoryFileRecordRepository>,
        storage: Arc<InMemoryObjectStorage>,
    }

    fn fixture(retention: Duration) -> Fixture {
        let files = InMemoryFileRecordRepository::new();
        let storage = InMemoryObjectStorage::new();
        Fixture {
            coordinator: UploadCoordinator::new(files.clone(), storage.clone(), MAX_UPLOAD_BYTES),
            job: ReconciliationJob::new(files.clone(), storage.clone(), retention),
            files,
            storage,
        }
    }

    #[tokio::test]
    async fn test_retention_boundary() {
        let f = fixture(Duration::hours(1));
        let tenant = Uuid::new_v4();
        let intent = f
            .coordinator
            .begin_upload(tenant, descriptor(100))
            .await
            .unwrap();
        let created_at = f.files.snapshot(intent.id).unwrap().created_at;

        let at_boundary = f
            .job
            .scan_stale(tenant, created_at + Duration::hours(1))
            .await
            .unwrap();
        assert!(at_boundary.is_empty());

        let past_boundary = f
            .job
            .scan_stale(tenant, created_at + Duration::hours(1) + Duration::seconds(1))
            .await
            .unwrap();
        assert_eq!(past_boundary.len(), 1);
        assert_eq!(past_boundary[0].id, intent.id);
        assert_eq!(past_boundary[0].observed_state, FileState::Pending);
        assert_eq!(past_boundary[0].storage_key, None);
    }

    #[tokio::test]
    async fn test_failed_upload_is_reclaimed_after_retention() {
        let f = fixture(Duration::hours(1));
        let tenant = Uuid::new_v4();
        let intent = f
            .coordinator
            .begin_upload(tenant, descriptor(100))
            .await
            .unwrap();
        f.coordinator.fail_upload(tenant, intent.id).await.unwrap();
        let later = Utc::now() + Duration::hours(2);

        let stale = f.job.scan_stale(tenant, later).await.unwrap();
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].observed_state, FileState::Failed);

        let report = f.job.reconcile(tenant, later).await.unwrap();
        assert_eq!(report.purged, 1);
        assert!(f.files.snapshot(intent.id).is_none());
    }

    #[tokio::test]
    async fn test_uploaded_records_are_kept_until_expiry() {
        let f = fixture(Duration::hours(1));
        let tenant = Uuid::new_v4();
        let mut d = descriptor(100);
        d.expires_at = Some(Utc::now() + Duration::days(1));
        let intent = f.coordinator.begin_upload(tenant, d).await.unwrap();
        f.storage.put_at(&intent.upload_key, b"scan", Utc::now());
        f.coordinator
            .complete_upload(tenant, intent.id, &intent.upload_key)
            .await
            .unwrap();

        let before_expiry = f
            .job
            .reconcile(tenant, Utc::now() + Duration::hours(12))
            .await
            .unwrap();
        assert_eq!(before_expiry.scanned, 0);
        assert!(f.storage.contains(&intent.upload_key));

        let after_expiry = f
            .job
            .reconcile(tenant, Utc::now() + Duration::days(2))
            .await
            .unwrap();
        assert_eq!(after_expiry.purged, 1);
        assert_eq!(after_expiry.storage_keys, vec![intent.upload_key.clone()]);
        assert!(!f.storage.contains(&intent.upload_key));
        assert!(f.files.snapshot(intent.id).is_none());
    }

    #[tokio::test]
    async fn test_uploaded_without_expiry_is_never_stale() {
        let f = fixture(Duration::hours(1));
        let tenant = Uuid::new_v4();
        let record = f
            .coordinator
            .upload_bytes(tenant, descriptor(0), b"x".to_vec(), UploadStrategy::RecordFirst)
            .await
            .unwrap();

        let report = f
            .job
            .reconcile(tenant, Utc::now() + Duration::days(365))
            .await
            .unwrap();
        assert_eq!(report, ReconcileReport::default());
        assert!(f.files.snapshot(record.id).is_some());
    }

    #[tokio::test]
    async fn test_second_pass_is_a_noop() {
        let f = fixture(Duration::hours(1));
        let tenant = Uuid::new_v4();
        for _ in 0..3 {
            f.coordinator
                .begin_upload(tenant, descriptor(100))
                .await
                .unwrap();
        }
        let later = Utc::now() + Duration::hours(2);

        let first = f.job.reconcile(tenant, later).await.unwrap();
        assert_eq!(first.purged, 3);
        assert_eq!(first.failed, 0);

        let deletes = f.storage.delete_calls();
        let second = f.job.reconcile(tenant, later).await.unwrap();
        assert_eq!(second, ReconcileReport::default());
        assert_eq!(f.storage.delete_calls(), deletes);
    }

    #[tokio::test]
    async fn test_blob_delete_failure_keeps_record() {
        let f = fixture(Duration::hours(1));
        let tenant = Uuid::new_v4();
        let mut d = descriptor(100);
        d.expires_at = Some(Utc::now());
        let intent = f.coordinator.begin_upload(tenant, d).await.unwrap();
        f.storage.put_at(&intent.upload_key, b"x", Utc::now());
        f.coordinator
            .complete_upload(tenant, intent.id, &intent.upload_key)
            .await
            .unwrap();
        let later = Utc::now() + Duration::minutes(1);

        f.storage.fail_deletes(true);
        let report = f.job.reconcile(tenant, later).await.unwrap();
        assert_eq!(report.retried, 1);
        assert_eq!(report.purged, 0);
        assert!(report.storage_keys.is_empty());
        assert!(f.files.snapshot(intent.id).is_some());

        f.storage.fail_deletes(false);
        let report = f.job.reconcile(tenant, later).await.unwrap();
        assert_eq!(report.purged, 1);
        assert!(f.files.snapshot(intent.id).is_none());
        assert!(!f.storage.contains(&intent.upload_key));
    }

    #[tokio::test]
    async fn test_record_completed_after_scan_is_not_deleted() {
        let f = fixture(Duration::hours(1));
        let tenant = Uuid::new_v4();
        let intent = f
            .coordinator
            .begin_upload(tenant, descriptor(100))
            .await
            .unwrap();
        let later = Utc::now() + Duration::hours(2);

        let candidates = f.job.scan_stale(tenant, later).await.unwrap();
        assert_eq!(candidates.len(), 1);

        f.storage.put_at(&intent.upload_key, b"late", Utc::now());
        f.coordinator
            .complete_upload(tenant, intent.id, &intent.upload_key)
            .await
            .unwrap();

        let report = f.job.purge(tenant, candidates).await;
        assert_eq!(report.skipped, 1);
        assert_eq!(report.purged, 0);
        assert_eq!(
            f.files.snapshot(intent.id).unwrap().state,
            FileState::Uploaded
        );
        assert!(f.storage.contains(&intent.upload_key));
    }

    #[tokio::test]
    async fn test_overlapping_passes_do_not_error() {
        let f = fixture(Duration::hours(1));
        let tenant = Uuid::new_v4();
        f.coordinator
            .begin_upload(tenant, descriptor(100))
            .await
            .unwrap();
        let later = Utc::now() + Duration::hours(2);

        let first_scan = f.job.scan_stale(tenant, later).await.unwrap();
        let second_scan = f.job.scan_stale(tenant, later).await.unwrap();

        let first = f.job.purge(tenant, first_scan).await;
        let second = f.job.purge(tenant, second_scan).await;

        assert_eq!(first.purged, 1);
        assert_eq!(second.skipped, 1);
        assert_eq!(second.failed, 0);
    }

    #[tokio::test]
    async fn test_abandoned_transfer_blob_is_removed_with_record() {
        let f = fixture(Duration::hours(1));
        let tenant = Uuid::new_v4();
        let intent = f
            .coordinator
            .begin_upload(tenant, descriptor(100))
            .await
            .unwrap();
        f.storage.put_at(&intent.upload_key, b"half", Utc::now());

        let report = f
            .job
            .reconcile(tenant, Utc::now() + Duration::hours(2))
            .await
            .unwrap();

        assert_eq!(report.purged, 1);
        assert_eq!(report.storage_keys, vec![intent.upload_key.clone()]);
        assert!(!f.storage.contains(&intent.upload_key));
    }

    #[tokio::test]
    async fn test_sweep_removes_only_old_unattributed_blobs() {
        let f = fixture(Duration::hours(1));
        let tenant = Uuid::new_v4();
        let now = Utc::now();
        let old = now - Duration::hours(3);

        let orphan = derive_storage_key(tenant, "bol", Uuid::new_v4(), "load.pdf");
        let fresh_orphan = derive_storage_key(tenant, "bol", Uuid::new_v4(), "load.pdf");
        let foreign = format!("{}/imports/legacy.csv", tenant);
        let other_tenant = derive_storage_key(Uuid::new_v4(), "bol", Uuid::new_v4(), "x.pdf");
        f.storage.put_at(&orphan, b"o", old);
        f.storage.put_at(&fresh_orphan, b"o", now);
        f.storage.put_at(&foreign, b"o", old);
        f.storage.put_at(&other_tenant, b"o", old);

        let live = f
            .coordinator
            .upload_bytes(tenant, descriptor(0), b"x".to_vec(), UploadStrategy::TransferFirst)
            .await
            .unwrap();
        let live_key = live.storage_key.clone().unwrap();
        f.storage.put_at(&live_key, b"x", old);

        let removed = f.job.sweep_orphans(tenant, now).await.unwrap();

        assert_eq!(removed, vec![orphan.clone()]);
        assert!(!f.storage.contains(&orphan));
        assert!(f.storage.contains(&fresh_orphan));
        assert!(f.storage.contains(&foreign));
        assert!(f.storage.contains(&other_tenant));
        assert!(f.storage.contains(&live_key));
    }

    #[tokio::test]
    async fn test_transfer_first_orphan_is_reclaimed_by_reconcile() {
        let f = fixture(Duration::hours(1));
        let tenant = Uuid::new_v4();
        f.files.fail_inserts(true);
        assert!(f
            .coordinator
            .upload_bytes(tenant, descriptor(0), b"x".to_vec(), UploadStrategy::TransferFirst)
            .await
            .is_err());
        assert_eq!(f.storage.len(), 1);

        let report = f
            .job
            .reconcile(tenant, Utc::now() + Duration::hours(2))
            .await
            .unwrap();

        assert_eq!(report.orphans_removed, 1);
        assert_eq!(f.storage.len(), 0);
    }

    #[tokio::test]
    async fn test_tenants_include_those_known_only_from_storage() {
        let f = fixture(Duration::hours(1));
        let with_record = Uuid::new_v4();
        let blob_only = Uuid::new_v4();
        f.coordinator
            .begin_upload(with_record, descriptor(100))
            .await
            .unwrap();
        let key = derive_storage_key(blob_only, "cdl", Uuid::new_v4(), "report.pdf");
        f.storage.put_at(&key, b"x", Utc::now());
        f.storage.put_at("not-a-tenant/loose.bin", b"x", Utc::now());

        let mut expected = vec![with_record, blob_only];
        expected.sort();
        assert_eq!(f.job.tenants().await.unwrap(), expected);
    }
}
