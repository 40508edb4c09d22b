//! In-memory doubles for the two stores and the authorization gate.

use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    application::{
        error::ApplicationError,
        repositories::{
            api_key_repository::ApiKeyRepository,
            file_record_repository::{
                CasOutcome, FileRecordRepository, StaleFilter, TransitionPatch,
            },
        },
        services::object_storage::{ObjectStorage, StoredObject},
    },
    domain::{
        config::{
            global::UploadPolicy,
            local::ServerConfig,
            secrets::{S3Secrets, Secrets},
            settings::Settings,
        },
        models::{
            file::{FileData, FileDescriptor},
            file_record::{FileRecord, FileState},
        },
    },
};

pub const CLEANUP_SECRET: &str = "test-cleanup-secret";

pub fn descriptor(size: u64) -> FileDescriptor {
    FileDescriptor {
        filename: "report.pdf".to_string(),
        mime_type: "application/pdf".to_string(),
        size,
        category: "cdl".to_string(),
        entity_type: "driver".to_string(),
        entity_id: "driver-17".to_string(),
        expires_at: None,
    }
}

pub fn settings() -> Settings {
    Settings {
        server: ServerConfig::default(),
        policy: UploadPolicy::default(),
        secrets: Secrets {
            database_url: "postgres://unused".to_string(),
            redis_url: "redis://unused".to_string(),
            cleanup_secret: CLEANUP_SECRET.to_string(),
            s3: S3Secrets {
                bucket_name: "unused".to_string(),
                region: "us-east-1".to_string(),
                endpoint: None,
                access_key_id: "unused".to_string(),
                secret_access_key: "unused".to_string(),
                force_path_style: false,
            },
        },
    }
}

#[derive(Default)]
pub struct InMemoryFileRecordRepository {
    records: Mutex<HashMap<Uuid, FileRecord>>,
    fail_inserts: AtomicBool,
}

impl InMemoryFileRecordRepository {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn snapshot(&self, id: Uuid) -> Option<FileRecord> {
        self.records.lock().unwrap().get(&id).cloned()
    }

    fn scoped<'a>(
        records: &'a mut HashMap<Uuid, FileRecord>,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<Option<&'a mut FileRecord>, ApplicationError> {
        match records.get_mut(&id) {
            Some(record) if record.tenant_id != tenant_id => Err(ApplicationError::Unauthorized),
            other => Ok(other),
        }
    }
}

#[async_trait]
impl FileRecordRepository for InMemoryFileRecordRepository {
    async fn insert(&self, record: FileRecord) -> Result<Uuid, ApplicationError> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(ApplicationError::DatabaseError(
                "connection reset".to_string(),
            ));
        }
        let mut records = self.records.lock().unwrap();
        if records.contains_key(&record.id) {
            return Err(ApplicationError::Conflict(format!(
                "record {} already exists",
                record.id
            )));
        }
        let id = record.id;
        records.insert(id, record);
        Ok(id)
    }

    async fn get(&self, tenant_id: Uuid, id: Uuid) -> Result<FileRecord, ApplicationError> {
        let mut records = self.records.lock().unwrap();
        Self::scoped(&mut records, tenant_id, id)?
            .map(|record| record.clone())
            .ok_or(ApplicationError::NotFound)
    }

    async fn cas_transition(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        from: FileState,
        to: FileState,
        patch: TransitionPatch,
    ) -> Result<CasOutcome, ApplicationError> {
        let mut records = self.records.lock().unwrap();
        let Some(record) = Self::scoped(&mut records, tenant_id, id)? else {
            return Ok(CasOutcome::NotFound);
        };
        if record.state != from {
            return Ok(CasOutcome::Conflict(record.clone()));
        }
        record.state = to;
        record.storage_key = patch.storage_key;
        record.updated_at = Utc::now();
        Ok(CasOutcome::Applied(record.clone()))
    }

    async fn query_stale(
        &self,
        tenant_id: Uuid,
        filter: StaleFilter,
    ) -> Result<Vec<FileRecord>, ApplicationError> {
        let records = self.records.lock().unwrap();
        let mut stale: Vec<FileRecord> = records
            .values()
            .filter(|r| r.tenant_id == tenant_id && filter.matches(r))
            .cloned()
            .collect();
        stale.sort_by_key(|r| r.created_at);
        Ok(stale)
    }

    async fn delete_if_state(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        state: FileState,
    ) -> Result<bool, ApplicationError> {
        let mut records = self.records.lock().unwrap();
        let matches = Self::scoped(&mut records, tenant_id, id)?.is_some_and(|r| r.state == state);
        if matches {
            records.remove(&id);
        }
        Ok(matches)
    }

    async fn list_by_entity(
        &self,
        tenant_id: Uuid,
        entity_type: &str,
        entity_id: &str,
    ) -> Result<Vec<FileRecord>, ApplicationError> {
        let records = self.records.lock().unwrap();
        let mut found: Vec<FileRecord> = records
            .values()
            .filter(|r| {
                r.tenant_id == tenant_id && r.entity_type == entity_type && r.entity_id == entity_id
            })
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn list_tenants(&self) -> Result<Vec<Uuid>, ApplicationError> {
        let records = self.records.lock().unwrap();
        let mut tenants: Vec<Uuid> = records.values().map(|r| r.tenant_id).collect();
        tenants.sort();
        tenants.dedup();
        Ok(tenants)
    }

    async fn exists(&self, id: Uuid) -> Result<bool, ApplicationError> {
        Ok(self.records.lock().unwrap().contains_key(&id))
    }
}

#[derive(Default)]
pub struct InMemoryObjectStorage {
    objects: Mutex<BTreeMap<String, (Vec<u8>, DateTime<Utc>)>>,
    fail_puts: AtomicBool,
    fail_deletes: AtomicBool,
    delete_calls: AtomicUsize,
}

impl InMemoryObjectStorage {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    /// Places a blob directly, as a client transferring bytes on its own would.
    pub fn put_at(&self, key: &str, content: &[u8], last_modified: DateTime<Utc>) {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), (content.to_vec(), last_modified));
    }
}

#[async_trait]
impl ObjectStorage for InMemoryObjectStorage {
    async fn put(&self, key: &str, file_data: FileData) -> Result<(), ApplicationError> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(ApplicationError::Storage("put refused".to_string()));
        }
        self.put_at(key, &file_data.content, Utc::now());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, ApplicationError> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .map(|(content, _)| content.clone())
            .ok_or(ApplicationError::NotFound)
    }

    async fn delete(&self, key: &str) -> Result<(), ApplicationError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(ApplicationError::Storage("delete refused".to_string()));
        }
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<StoredObject>, ApplicationError> {
        Ok(self
            .objects
            .lock()
            .unwrap()
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, (content, modified))| StoredObject {
                key: key.clone(),
                size: content.len() as u64,
                last_modified: Some(*modified),
            })
            .collect())
    }

    async fn list_prefixes(&self) -> Result<Vec<String>, ApplicationError> {
        let objects = self.objects.lock().unwrap();
        let mut prefixes: Vec<String> = objects
            .keys()
            .filter_map(|key| key.split_once('/'))
            .map(|(segment, _)| format!("{}/", segment))
            .collect();
        prefixes.sort();
        prefixes.dedup();
        Ok(prefixes)
    }
}

#[derive(Default)]
pub struct InMemoryApiKeyRepository {
    keys: Mutex<HashMap<String, Uuid>>,
}

impl InMemoryApiKeyRepository {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_key(&self, api_key: &str, tenant_id: Uuid) {
        self.keys
            .lock()
            .unwrap()
            .insert(api_key.to_string(), tenant_id);
    }
}

#[async_trait]
impl ApiKeyRepository for InMemoryApiKeyRepository {
    async fn issue_key(
        &self,
        tenant_id: Uuid,
        _ttl_seconds: u64,
    ) -> Result<String, ApplicationError> {
        let key = format!("ffk_{}", Uuid::new_v4().simple());
        self.with_key(&key, tenant_id);
        Ok(key)
    }

    async fn resolve_tenant(&self, api_key: &str) -> Result<Uuid, ApplicationError> {
        self.keys
            .lock()
            .unwrap()
            .get(api_key)
            .copied()
            .ok_or(ApplicationError::Unauthorized)
    }
}
