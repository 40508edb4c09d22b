use async_trait::async_trait;
use sqlx::query_as;
use tracing::info;
use uuid::Uuid;

use crate::{
    application::{
        dto::file_record_dto::FileRecordDTO,
        error::ApplicationError,
        repositories::file_record_repository::{
            CasOutcome, FileRecordRepository, StaleFilter, TransitionPatch,
        },
    },
    domain::models::file_record::{FileRecord, FileState},
};

const SCHEMA: &str = r#"
    CREATE SCHEMA IF NOT EXISTS application;

    CREATE TABLE IF NOT EXISTS application.file_records (
        id UUID PRIMARY KEY,
        tenant_id UUID NOT NULL,
        storage_key TEXT,
        filename TEXT NOT NULL,
        mime_type TEXT NOT NULL,
        size BIGINT NOT NULL CHECK (size >= 0),
        category TEXT NOT NULL,
        entity_type TEXT NOT NULL,
        entity_id TEXT NOT NULL,
        expires_at TIMESTAMPTZ,
        state TEXT NOT NULL CHECK (state IN ('pending', 'uploaded', 'failed')),
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL
    );

    CREATE INDEX IF NOT EXISTS file_records_stale_idx
        ON application.file_records (tenant_id, state, created_at);

    CREATE INDEX IF NOT EXISTS file_records_entity_idx
        ON application.file_records (tenant_id, entity_type, entity_id);
"#;

pub struct PgFileRecordRepository {
    pool: sqlx::PgPool,
}

impl PgFileRecordRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }

    /// Creates the table and its indexes if they are missing.
    pub async fn ensure_schema(&self) -> Result<(), ApplicationError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| ApplicationError::DatabaseError(e.to_string()))?;
        info!("File record schema ready");
        Ok(())
    }

    async fn fetch(&self, id: Uuid) -> Result<Option<FileRecord>, ApplicationError> {
        let query = "SELECT * FROM application.file_records WHERE id = $1";

        let fetched: Option<FileRecordDTO> = query_as::<_, FileRecordDTO>(query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ApplicationError::DatabaseError(e.to_string()))?;

        fetched.map(FileRecord::try_from).transpose()
    }

    /// Looks the record up and checks it belongs to `tenant_id`.
    async fn fetch_scoped(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<Option<FileRecord>, ApplicationError> {
        match self.fetch(id).await? {
            Some(record) if record.tenant_id != tenant_id => Err(ApplicationError::Unauthorized),
            other => Ok(other),
        }
    }
}

fn collect(rows: Vec<FileRecordDTO>) -> Result<Vec<FileRecord>, ApplicationError> {
    rows.into_iter().map(FileRecord::try_from).collect()
}

#[async_trait]
impl FileRecordRepository for PgFileRecordRepository {
    async fn insert(&self, record: FileRecord) -> Result<Uuid, ApplicationError> {
        let query = r#"
            INSERT INTO application.file_records (
                id, tenant_id, storage_key, filename, mime_type, size,
                category, entity_type, entity_id, expires_at, state,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (id) DO NOTHING
            RETURNING id
        "#;

        let dto = FileRecordDTO::from(record);

        let inserted: Option<(Uuid,)> = query_as(query)
            .bind(dto.id)
            .bind(dto.tenant_id)
            .bind(&dto.storage_key)
            .bind(&dto.filename)
            .bind(&dto.mime_type)
            .bind(dto.size)
            .bind(&dto.category)
            .bind(&dto.entity_type)
            .bind(&dto.entity_id)
            .bind(dto.expires_at)
            .bind(&dto.state)
            .bind(dto.created_at)
            .bind(dto.updated_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ApplicationError::DatabaseError(e.to_string()))?;

        match inserted {
            Some((id,)) => Ok(id),
            None => Err(ApplicationError::Conflict(format!(
                "record {} already exists",
                dto.id
            ))),
        }
    }

    async fn get(&self, tenant_id: Uuid, id: Uuid) -> Result<FileRecord, ApplicationError> {
        self.fetch_scoped(tenant_id, id)
            .await?
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
        let query = r#"
            UPDATE application.file_records
            SET state = $4, storage_key = $5, updated_at = now()
            WHERE id = $1 AND tenant_id = $2 AND state = $3
            RETURNING *
        "#;

        let updated: Option<FileRecordDTO> = query_as::<_, FileRecordDTO>(query)
            .bind(id)
            .bind(tenant_id)
            .bind(from.as_str())
            .bind(to.as_str())
            .bind(&patch.storage_key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ApplicationError::DatabaseError(e.to_string()))?;

        if let Some(dto) = updated {
            return Ok(CasOutcome::Applied(dto.try_into()?));
        }

        // Nothing matched: tell apart a missing row, another tenant's row and a lost race.
        match self.fetch_scoped(tenant_id, id).await? {
            Some(current) => Ok(CasOutcome::Conflict(current)),
            None => Ok(CasOutcome::NotFound),
        }
    }

    async fn query_stale(
        &self,
        tenant_id: Uuid,
        filter: StaleFilter,
    ) -> Result<Vec<FileRecord>, ApplicationError> {
        let query = r#"
            SELECT * FROM application.file_records
            WHERE tenant_id = $1
              AND (
                (state IN ('pending', 'failed') AND created_at < $2)
                OR (state = 'uploaded' AND expires_at IS NOT NULL AND expires_at <= $3)
              )
            ORDER BY created_at
        "#;

        let rows: Vec<FileRecordDTO> = query_as::<_, FileRecordDTO>(query)
            .bind(tenant_id)
            .bind(filter.created_before)
            .bind(filter.expired_at_or_before)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ApplicationError::DatabaseError(e.to_string()))?;

        collect(rows)
    }

    async fn delete_if_state(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        state: FileState,
    ) -> Result<bool, ApplicationError> {
        let query = r#"
            DELETE FROM application.file_records
            WHERE id = $1 AND tenant_id = $2 AND state = $3
        "#;

        let result = sqlx::query(query)
            .bind(id)
            .bind(tenant_id)
            .bind(state.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| ApplicationError::DatabaseError(e.to_string()))?;

        if result.rows_affected() > 0 {
            return Ok(true);
        }

        // Surfaces a cross-tenant id instead of reporting a silent no-op.
        self.fetch_scoped(tenant_id, id).await?;
        Ok(false)
    }

    async fn list_by_entity(
        &self,
        tenant_id: Uuid,
        entity_type: &str,
        entity_id: &str,
    ) -> Result<Vec<FileRecord>, ApplicationError> {
        let query = r#"
            SELECT * FROM application.file_records
            WHERE tenant_id = $1 AND entity_type = $2 AND entity_id = $3
            ORDER BY created_at DESC
        "#;

        let rows: Vec<FileRecordDTO> = query_as::<_, FileRecordDTO>(query)
            .bind(tenant_id)
            .bind(entity_type)
            .bind(entity_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ApplicationError::DatabaseError(e.to_string()))?;

        collect(rows)
    }

    async fn list_tenants(&self) -> Result<Vec<Uuid>, ApplicationError> {
        let query = "SELECT DISTINCT tenant_id FROM application.file_records ORDER BY tenant_id";

        let rows: Vec<(Uuid,)> = query_as(query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ApplicationError::DatabaseError(e.to_string()))?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn exists(&self, id: Uuid) -> Result<bool, ApplicationError> {
        let query = "SELECT EXISTS(SELECT 1 FROM application.file_records WHERE id = $1)";

        let (found,): (bool,) = query_as(query)
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| ApplicationError::DatabaseError(e.to_string()))?;

        Ok(found)
    }
}
