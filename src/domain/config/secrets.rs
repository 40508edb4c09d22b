use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct S3Secrets {
    #[serde(rename = "bucketName")]
    pub bucket_name: String,
    #[serde(rename = "region")]
    pub region: String,
    #[serde(rename = "endpoint")]
    pub endpoint: Option<String>,
    #[serde(rename = "accessKeyId")]
    pub access_key_id: String,
    #[serde(rename = "secretAccessKey")]
    pub secret_access_key: String,
    #[serde(rename = "forcePathStyle")]
    pub force_path_style: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Secrets {
    #[serde(rename = "databaseUrl")]
    pub database_url: String,
    #[serde(rename = "redisUrl")]
    pub redis_url: String,
    /// Shared secret for the cleanup endpoint and the admin routes.
    #[serde(rename = "cleanupSecret")]
    pub cleanup_secret: String,
    #[serde(rename = "s3")]
    pub s3: S3Secrets,
}
