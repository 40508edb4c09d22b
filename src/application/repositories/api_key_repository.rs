use async_trait::async_trait;
use uuid::Uuid;

use crate::application::error::ApplicationError;

/// Authorization gate: maps caller API keys to the tenant they act for.
#[async_trait]
pub trait ApiKeyRepository: Send + Sync {
    /// Issues a new key for `tenant_id` that stops resolving after `ttl_seconds`.
    async fn issue_key(&self, tenant_id: Uuid, ttl_seconds: u64)
        -> Result<String, ApplicationError>;

    /// Resolves a key to its tenant.
    ///
    /// # Returns
    /// - Ok(tenant_id) if the key is known and unexpired
    /// - Err(Unauthorized) otherwise
    async fn resolve_tenant(&self, api_key: &str) -> Result<Uuid, ApplicationError>;
}
