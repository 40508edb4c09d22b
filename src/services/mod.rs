mod error;
mod s3_storage;

pub use error::StorageError;
pub use s3_storage::S3StorageService;

use std::sync::Arc;

use crate::{
    application::services::object_storage::ObjectStorage, domain::config::secrets::S3Secrets,
};

pub fn create_object_storage(secrets: &S3Secrets) -> Result<Arc<dyn ObjectStorage>, StorageError> {
    let service = S3StorageService::new(secrets.clone())?;
    Ok(Arc::new(service))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secrets(bucket: &str) -> S3Secrets {
        S3Secrets {
            bucket_name: bucket.to_string(),
            region: "us-east-1".to_string(),
            endpoint: Some("minio:9000".to_string()),
            access_key_id: "minio".to_string(),
            secret_access_key: "minio123".to_string(),
            force_path_style: true,
        }
    }

    #[test]
    fn test_rejects_blank_bucket() {
        let result = create_object_storage(&secrets("  "));
        assert!(matches!(result, Err(StorageError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_builds_client_for_custom_endpoint() {
        assert!(create_object_storage(&secrets("fleet-files")).is_ok());
    }

    #[test]
    fn test_not_found_maps_to_application_not_found() {
        let err: crate::application::error::ApplicationError =
            StorageError::NotFound("a/b".to_string()).into();
        assert!(matches!(
            err,
            crate::application::error::ApplicationError::NotFound
        ));
    }
}
