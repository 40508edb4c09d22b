use axum::{extract::State, Json};
use serde::Serialize;
use sysinfo::System;
use tracing::info;

use crate::adapters::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub config: HealthConfigInfo,
    pub metrics: SystemMetrics,
}

#[derive(Debug, Serialize)]
pub struct SystemMetrics {
    #[serde(rename = "cpuUsagePercent")]
    pub cpu_usage_percent: f32,
    #[serde(rename = "memoryUsedBytes")]
    pub memory_used_bytes: u64,
    #[serde(rename = "memoryTotalBytes")]
    pub memory_total_bytes: u64,
    #[serde(rename = "memoryUsagePercent")]
    pub memory_usage_percent: f32,
}

#[derive(Debug, Serialize)]
pub struct HealthConfigInfo {
    #[serde(rename = "maxUploadBytes")]
    pub max_upload_bytes: u64,
    #[serde(rename = "retentionSeconds")]
    pub retention_seconds: u64,
    #[serde(rename = "defaultStrategy")]
    pub default_strategy: String,
    #[serde(rename = "reconcileIntervalSeconds")]
    pub reconcile_interval_seconds: Option<u64>,
}

pub struct HealthController;

impl HealthController {
    /// GET /api/v1/health
    pub async fn health_check(State(app_state): State<AppState>) -> Json<HealthResponse> {
        info!("Health check requested");

        let settings = &app_state.settings;
        let config_info = HealthConfigInfo {
            max_upload_bytes: app_state.coordinator.max_upload_bytes(),
            retention_seconds: app_state.reconciliation_job.retention().num_seconds().max(0) as u64,
            default_strategy: settings.server.default_strategy.to_string(),
            reconcile_interval_seconds: settings.server.reconcile_interval_seconds,
        };

        let mut sys = System::new();
        sys.refresh_cpu_usage();
        sys.refresh_memory();

        let cpu_usage = sys.global_cpu_usage();
        let memory_used = sys.used_memory();
        let memory_total = sys.total_memory();
        let memory_usage_percent = if memory_total > 0 {
            (memory_used as f32 / memory_total as f32) * 100.0
        } else {
            0.0
        };

        Json(HealthResponse {
            status: "healthy".to_string(),
            config: config_info,
            metrics: SystemMetrics {
                cpu_usage_percent: cpu_usage,
                memory_used_bytes: memory_used,
                memory_total_bytes: memory_total,
                memory_usage_percent,
            },
        })
    }
}
