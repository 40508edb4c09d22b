use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Order in which a server-side upload touches the two stores.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploadStrategy {
    /// Pending record first, then bytes, then the transition. Every blob has a traceable intent.
    #[default]
    #[serde(rename = "record-first")]
    RecordFirst,
    /// Bytes first, then an already-uploaded record. A crash in between leaves an orphan
    /// blob that only the prefix sweep can find.
    #[serde(rename = "transfer-first")]
    TransferFirst,
}

impl UploadStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RecordFirst => "record-first",
            Self::TransferFirst => "transfer-first",
        }
    }
}

impl fmt::Display for UploadStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UploadStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "record-first" => Ok(Self::RecordFirst),
            "transfer-first" => Ok(Self::TransferFirst),
            other => Err(format!("unknown upload strategy '{}'", other)),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    #[serde(rename = "corsAllowedOrigins")]
    pub cors_allowed_origins: Option<Vec<String>>,
    /// Unset means reconciliation only runs through the cleanup endpoint.
    #[serde(rename = "reconcileIntervalSeconds")]
    pub reconcile_interval_seconds: Option<u64>,
    #[serde(rename = "defaultStrategy")]
    pub default_strategy: UploadStrategy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            cors_allowed_origins: None,
            reconcile_interval_seconds: None,
            default_strategy: UploadStrategy::RecordFirst,
        }
    }
}
