use async_trait::async_trait;
use redis::AsyncCommands;
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::{
    error::ApplicationError, repositories::api_key_repository::ApiKeyRepository,
};

pub struct RedisApiKeyRepository {
    client: redis::aio::ConnectionManager,
}

impl RedisApiKeyRepository {
    pub fn new(client: redis::aio::ConnectionManager) -> Self {
        Self { client }
    }

    fn get_redis_key(api_key: &str) -> String {
        format!("tenant_api_key:{}", api_key)
    }
}

#[async_trait]
impl ApiKeyRepository for RedisApiKeyRepository {
    async fn issue_key(
        &self,
        tenant_id: Uuid,
        ttl_seconds: u64,
    ) -> Result<String, ApplicationError> {
        let api_key = format!("ffk_{}", Uuid::new_v4().simple());
        let key = Self::get_redis_key(&api_key);

        let mut conn = self.client.clone();

        conn.set_ex::<_, _, ()>(&key, tenant_id.to_string(), ttl_seconds)
            .await
            .map_err(|e| {
                ApplicationError::InternalError(format!("Failed to store API key: {}", e))
            })?;

        info!(%tenant_id, ttl_seconds, "API key issued");
        Ok(api_key)
    }

    async fn resolve_tenant(&self, api_key: &str) -> Result<Uuid, ApplicationError> {
        let key = Self::get_redis_key(api_key);
        let mut conn = self.client.clone();

        let value: Option<String> = conn.get(&key).await.map_err(|e| {
            ApplicationError::InternalError(format!("Failed to resolve API key: {}", e))
        })?;

        match value {
            None => Err(ApplicationError::Unauthorized),
            Some(tenant) => Uuid::parse_str(&tenant).map_err(|e| {
                warn!(error = %e, "API key maps to a malformed tenant id");
                ApplicationError::Unauthorized
            }),
        }
    }
}
