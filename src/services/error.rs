use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use thiserror::Error;

use crate::application::error::ApplicationError;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Storage provider error: {0}")]
    ProviderError(String),
}

impl From<StorageError> for ApplicationError {
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::NotFound(_) => ApplicationError::NotFound,
            StorageError::Unauthorized(msg)
            | StorageError::NetworkError(msg)
            | StorageError::InvalidConfiguration(msg)
            | StorageError::ProviderError(msg) => ApplicationError::Storage(msg),
        }
    }
}

impl StorageError {
    pub fn from_sdk<E>(error: SdkError<E>, key: &str) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        let status = match &error {
            SdkError::ServiceError(service_err) => Some(service_err.raw().status().as_u16()),
            _ => None,
        };

        match (&error, status) {
            (_, Some(404)) => StorageError::NotFound(key.to_string()),
            (_, Some(401 | 403)) => {
                StorageError::Unauthorized(DisplayErrorContext(&error).to_string())
            }
            (SdkError::TimeoutError(_), _) => {
                StorageError::NetworkError(format!("Request timeout for {}", key))
            }
            (SdkError::DispatchFailure(_), _) => StorageError::NetworkError(format!(
                "Connection failed: {}",
                DisplayErrorContext(&error)
            )),
            _ => StorageError::ProviderError(DisplayErrorContext(&error).to_string()),
        }
    }
}
