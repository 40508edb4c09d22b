use async_trait::async_trait;
use aws_sdk_s3::{
    config::{BehaviorVersion, Credentials, Region},
    primitives::ByteStream,
    Client,
};
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::{
    application::{
        error::ApplicationError,
        services::object_storage::{ObjectStorage, StoredObject},
    },
    domain::{config::secrets::S3Secrets, models::file::FileData},
    services::error::StorageError,
};

pub struct S3StorageService {
    client: Client,
    bucket_name: String,
}

impl S3StorageService {
    pub fn new(secrets: S3Secrets) -> Result<Self, StorageError> {
        if secrets.bucket_name.trim().is_empty() {
            return Err(StorageError::InvalidConfiguration(
                "bucket name is empty".to_string(),
            ));
        }

        let credentials = Credentials::new(
            secrets.access_key_id,
            secrets.secret_access_key,
            None,
            None,
            "fleet-files-env",
        );

        let mut builder = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(secrets.region))
            .credentials_provider(credentials);

        if let Some(endpoint) = secrets.endpoint {
            let lower = endpoint.to_ascii_lowercase();
            let endpoint = if lower.starts_with("http://") || lower.starts_with("https://") {
                endpoint
            } else {
                format!("http://{}", endpoint)
            };
            builder = builder.endpoint_url(endpoint);
        }

        if secrets.force_path_style {
            builder = builder.force_path_style(true);
        }

        Ok(Self {
            client: Client::from_conf(builder.build()),
            bucket_name: secrets.bucket_name,
        })
    }
}

fn to_chrono(value: &aws_sdk_s3::primitives::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(value.secs(), value.subsec_nanos())
}

#[async_trait]
impl ObjectStorage for S3StorageService {
    async fn put(&self, key: &str, file_data: FileData) -> Result<(), ApplicationError> {
        let size = file_data.size();
        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(key)
            .content_disposition(file_data.content_disposition())
            .content_type(file_data.mime_type)
            .content_length(size as i64)
            .body(ByteStream::from(file_data.content))
            .send()
            .await
            .map_err(|e| StorageError::from_sdk(e, key))?;

        debug!(key = %key, size, "Object stored");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, ApplicationError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket_name)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::from_sdk(e, key))?;

        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| StorageError::NetworkError(e.to_string()))?
            .into_bytes();

        Ok(bytes.to_vec())
    }

    async fn delete(&self, key: &str) -> Result<(), ApplicationError> {
        let result = self
            .client
            .delete_object()
            .bucket(&self.bucket_name)
            .key(key)
            .send()
            .await;

        match result.map_err(|e| StorageError::from_sdk(e, key)) {
            Ok(_) | Err(StorageError::NotFound(_)) => Ok(()),
            Err(e) => {
                warn!(key = %key, error = %e, "Object delete failed");
                Err(e.into())
            }
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<StoredObject>, ApplicationError> {
        let mut objects = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket_name)
                .prefix(prefix);

            if let Some(token) = continuation_token.take() {
                request = request.continuation_token(token);
            }

            let output = request
                .send()
                .await
                .map_err(|e| StorageError::from_sdk(e, prefix))?;

            for object in output.contents() {
                if let Some(key) = object.key() {
                    objects.push(StoredObject {
                        key: key.to_string(),
                        size: object.size().unwrap_or(0).max(0) as u64,
                        last_modified: object.last_modified().and_then(to_chrono),
                    });
                }
            }

            if output.is_truncated() == Some(true) {
                continuation_token = output.next_continuation_token().map(|s| s.to_string());
            } else {
                break;
            }
        }

        Ok(objects)
    }

    async fn list_prefixes(&self) -> Result<Vec<String>, ApplicationError> {
        let mut prefixes = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket_name)
                .delimiter("/");

            if let Some(token) = continuation_token.take() {
                request = request.continuation_token(token);
            }

            let output = request
                .send()
                .await
                .map_err(|e| StorageError::from_sdk(e, "/"))?;

            prefixes.extend(
                output
                    .common_prefixes()
                    .iter()
                    .filter_map(|p| p.prefix())
                    .map(|p| p.to_string()),
            );

            if output.is_truncated() == Some(true) {
                continuation_token = output.next_continuation_token().map(|s| s.to_string());
            } else {
                break;
            }
        }

        Ok(prefixes)
    }
}
