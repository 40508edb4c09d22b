use axum::{
    body::Body,
    extract::{multipart::Field, Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::Response,
    Json,
};
use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    adapters::{
        dto::file_dto::{FileResponse, UploadQuery},
        middleware::AuthorizedTenant,
        state::AppState,
    },
    application::error::ApplicationError,
    domain::models::file::FileDescriptor,
};

pub struct FileController;

impl FileController {
    /// Server-side upload: this service moves the bytes itself.
    /// POST /api/v1/files?strategy=record-first|transfer-first
    pub async fn upload_file(
        State(app_state): State<AppState>,
        AuthorizedTenant(tenant_id): AuthorizedTenant,
        Query(query): Query<UploadQuery>,
        mut multipart: Multipart,
    ) -> Result<(StatusCode, Json<FileResponse>), ApplicationError> {
        let max_size = app_state.coordinator.max_upload_bytes();

        let mut file_bytes: Option<Vec<u8>> = None;
        let mut descriptor = FileDescriptor {
            filename: String::new(),
            mime_type: String::new(),
            size: 0,
            category: String::new(),
            entity_type: String::new(),
            entity_id: String::new(),
            expires_at: None,
        };

        while let Some(field) = multipart.next_field().await.map_err(|e| {
            warn!("Invalid multipart data: {}", e);
            ApplicationError::Validation("invalid multipart body".to_string())
        })? {
            let name = field.name().unwrap_or("").to_string();

            match name.as_str() {
                "file" => {
                    if descriptor.filename.is_empty() {
                        descriptor.filename = field.file_name().unwrap_or("").to_string();
                    }
                    if descriptor.mime_type.is_empty() {
                        descriptor.mime_type = field
                            .content_type()
                            .unwrap_or("application/octet-stream")
                            .to_string();
                    }
                    file_bytes = Some(read_limited(field, max_size).await?);
                }
                "filename" => descriptor.filename = read_text(field, &name).await?,
                "mimeType" => descriptor.mime_type = read_text(field, &name).await?,
                "category" => descriptor.category = read_text(field, &name).await?,
                "entityType" => descriptor.entity_type = read_text(field, &name).await?,
                "entityId" => descriptor.entity_id = read_text(field, &name).await?,
                "expiresAt" => {
                    let raw = read_text(field, &name).await?;
                    let expires_at = raw.trim().parse::<DateTime<Utc>>().map_err(|_| {
                        ApplicationError::Validation(
                            "'expiresAt' must be an RFC 3339 timestamp".to_string(),
                        )
                    })?;
                    descriptor.expires_at = Some(expires_at);
                }
                _ => {}
            }
        }

        let file_bytes = file_bytes.ok_or_else(|| {
            warn!("Missing required 'file' field in upload");
            ApplicationError::Validation("missing required field 'file'".to_string())
        })?;

        let strategy = query
            .strategy
            .unwrap_or(app_state.settings.server.default_strategy);

        let record = app_state
            .coordinator
            .upload_bytes(tenant_id, descriptor, file_bytes, strategy)
            .await?;

        info!(%tenant_id, file_id = %record.id, %strategy, "File uploaded");

        Ok((StatusCode::CREATED, Json(FileResponse::from(record))))
    }

    /// GET /api/v1/files/{id}
    pub async fn get_file(
        State(app_state): State<AppState>,
        AuthorizedTenant(tenant_id): AuthorizedTenant,
        Path(id): Path<Uuid>,
    ) -> Result<Json<FileResponse>, ApplicationError> {
        let record = app_state.coordinator.get_file(tenant_id, id).await?;
        Ok(Json(FileResponse::from(record)))
    }

    /// GET /api/v1/files/{id}/content
    pub async fn download_file(
        State(app_state): State<AppState>,
        AuthorizedTenant(tenant_id): AuthorizedTenant,
        Path(id): Path<Uuid>,
    ) -> Result<Response, ApplicationError> {
        let (record, file_bytes) = app_state.coordinator.download(tenant_id, id).await?;

        Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, record.mime_type)
            .header(header::CONTENT_LENGTH, file_bytes.len())
            .header(
                header::CONTENT_DISPOSITION,
                format!(
                    "attachment; filename=\"{}\"",
                    record.filename.replace(['"', '\\'], "_")
                ),
            )
            .body(Body::from(file_bytes))
            .map_err(|e| ApplicationError::InternalError(e.to_string()))
    }

    /// GET /api/v1/entities/{entityType}/{entityId}/files
    pub async fn list_entity_files(
        State(app_state): State<AppState>,
        AuthorizedTenant(tenant_id): AuthorizedTenant,
        Path((entity_type, entity_id)): Path<(String, String)>,
    ) -> Result<Json<Vec<FileResponse>>, ApplicationError> {
        let records = app_state
            .coordinator
            .list_entity_files(tenant_id, &entity_type, &entity_id)
            .await?;

        Ok(Json(records.into_iter().map(FileResponse::from).collect()))
    }
}

async fn read_text(field: Field<'_>, name: &str) -> Result<String, ApplicationError> {
    field.text().await.map_err(|e| {
        warn!("Invalid {} field: {}", name, e);
        ApplicationError::Validation(format!("invalid field '{}'", name))
    })
}

/// Reads the file part chunk by chunk, stopping as soon as it passes `max_size`.
async fn read_limited(mut field: Field<'_>, max_size: u64) -> Result<Vec<u8>, ApplicationError> {
    let mut content = Vec::new();

    loop {
        let chunk = field.chunk().await.map_err(|e| {
            if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                ApplicationError::PayloadTooLarge {
                    size: content.len() as u64,
                    max: max_size,
                }
            } else {
                warn!("Cannot read file bytes: {}", e);
                ApplicationError::Validation("invalid file data".to_string())
            }
        })?;

        let Some(chunk) = chunk else {
            return Ok(content);
        };

        let size = (content.len() + chunk.len()) as u64;
        if size > max_size {
            return Err(ApplicationError::PayloadTooLarge {
                size,
                max: max_size,
            });
        }
        content.extend_from_slice(&chunk);
    }
}
