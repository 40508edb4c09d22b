use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Hard ceiling for a single upload (10 MiB). Configuration may lower it, never raise it.
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct FileData {
    pub content: Vec<u8>,
    pub filename: String,
    pub mime_type: String,
}

impl FileData {
    pub fn new(content: Vec<u8>, filename: String, mime_type: String) -> Self {
        Self {
            content,
            filename,
            mime_type,
        }
    }

    pub fn size(&self) -> u64 {
        self.content.len() as u64
    }

    /// `Content-Disposition` stored with the object so a direct download keeps the original name.
    pub fn content_disposition(&self) -> String {
        let name: String = self
            .filename
            .chars()
            .map(|c| if c == '"' || c == '\\' || c.is_control() { '_' } else { c })
            .collect();
        format!("attachment; filename=\"{}\"", name)
    }
}

/// What a caller declares about a file before any bytes move.
#[derive(Debug, Clone, PartialEq)]
pub struct FileDescriptor {
    pub filename: String,
    pub mime_type: String,
    pub size: u64,
    pub category: String,
    pub entity_type: String,
    pub entity_id: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl FileDescriptor {
    pub fn validate_size(&self, max_size: u64) -> bool {
        self.size > 0 && self.size <= max_size
    }

    /// Name of the first required field that is blank, if any.
    pub fn missing_field(&self) -> Option<&'static str> {
        [
            ("filename", &self.filename),
            ("mimeType", &self.mime_type),
            ("category", &self.category),
            ("entityType", &self.entity_type),
            ("entityId", &self.entity_id),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
    }
}

fn sanitize(segment: &str) -> String {
    segment
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Blob key for one upload attempt: `{tenant}/{category}/{token}-{filename}`.
///
/// The token is the record id in simple form, so a blob can be attributed back
/// to its record (or to the absence of one) from the key alone.
pub fn derive_storage_key(tenant_id: Uuid, category: &str, token: Uuid, filename: &str) -> String {
    format!(
        "{}/{}/{}-{}",
        tenant_id,
        sanitize(category),
        token.simple(),
        sanitize(filename)
    )
}

pub fn tenant_prefix(tenant_id: Uuid) -> String {
    format!("{}/", tenant_id)
}

/// Recovers the record id embedded in a key produced by [`derive_storage_key`].
pub fn parse_storage_token(storage_key: &str) -> Option<Uuid> {
    let name = storage_key.rsplit('/').next()?;
    let (token, _) = name.split_once('-')?;
    if token.len() != 32 {
        return None;
    }
    Uuid::try_parse(token).ok()
}
