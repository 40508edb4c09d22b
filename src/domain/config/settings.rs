use thiserror::Error;

use crate::domain::{
    config::{
        global::UploadPolicy,
        local::{ServerConfig, UploadStrategy},
        secrets::{S3Secrets, Secrets},
    },
    models::file::MAX_UPLOAD_BYTES,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} environment variable must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub policy: UploadPolicy,
    pub secrets: Secrets,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds settings from any variable source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let defaults = UploadPolicy::default();
        let max_upload_bytes = parse_or(&get, "MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?;
        if max_upload_bytes == 0 || max_upload_bytes > MAX_UPLOAD_BYTES {
            return Err(ConfigError::Invalid {
                name: "MAX_UPLOAD_BYTES",
                reason: format!("must be between 1 and {}", MAX_UPLOAD_BYTES),
            });
        }

        let policy = UploadPolicy {
            max_upload_bytes,
            retention_seconds: parse_or(&get, "RETENTION_SECONDS", defaults.retention_seconds)?,
            api_key_ttl_seconds: parse_or(
                &get,
                "API_KEY_TTL_SECONDS",
                defaults.api_key_ttl_seconds,
            )?,
        };

        let reconcile_interval_seconds = match get("RECONCILE_INTERVAL_SECONDS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(0) | Err(_) => {
                    return Err(ConfigError::Invalid {
                        name: "RECONCILE_INTERVAL_SECONDS",
                        reason: format!("'{}' is not a positive number of seconds", raw),
                    })
                }
                Ok(seconds) => Some(seconds),
            },
            None => None,
        };

        let server = ServerConfig {
            port: parse_or(&get, "PORT", 8080u16)?,
            cors_allowed_origins: get("CORS_ALLOWED_ORIGINS").map(|origins| {
                origins
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            }),
            reconcile_interval_seconds,
            default_strategy: parse_or(&get, "UPLOAD_STRATEGY", UploadStrategy::RecordFirst)?,
        };

        let secrets = Secrets {
            database_url: required("DATABASE_URL")?,
            redis_url: required("REDIS_URL")?,
            cleanup_secret: required("CLEANUP_SECRET")?,
            s3: S3Secrets {
                bucket_name: required("S3_BUCKET")?,
                region: get("S3_REGION").unwrap_or_else(|| "us-east-1".to_string()),
                endpoint: get("S3_ENDPOINT"),
                access_key_id: required("S3_ACCESS_KEY_ID")?,
                secret_access_key: required("S3_SECRET_ACCESS_KEY")?,
                force_path_style: parse_or(&get, "S3_FORCE_PATH_STYLE", false)?,
            },
        };

        Ok(Self {
            server,
            policy,
            secrets,
        })
    }
}

fn parse_or<G, T>(get: &G, name: &'static str, default: T) -> Result<T, ConfigError>
where
    G: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get(name) {
        Some(raw) => raw.parse::<T>().map_err(|e| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}
