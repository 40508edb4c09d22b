use sqlx::{postgres::PgRow, FromRow, Row};

use crate::application::dto::file_record_dto::FileRecordDTO;

impl FromRow<'_, PgRow> for FileRecordDTO {
    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(FileRecordDTO {
            id: row.try_get("id")?,
            tenant_id: row.try_get("tenant_id")?,
            storage_key: row.try_get("storage_key")?,
            filename: row.try_get("filename")?,
            mime_type: row.try_get("mime_type")?,
            size: row.try_get("size")?,
            category: row.try_get("category")?,
            entity_type: row.try_get("entity_type")?,
            entity_id: row.try_get("entity_id")?,
            expires_at: row.try_get("expires_at")?,
            state: row.try_get("state")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}
