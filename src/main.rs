mod adapters;
mod application;
mod domain;
mod services;
#[cfg(test)]
mod test_support;

use std::{sync::Arc, time::Duration};

use adapters::{
    repositories::{PgFileRecordRepository, RedisApiKeyRepository},
    routes::router,
    scheduler::ReconciliationScheduler,
    state::AppState,
};
use application::{
    repositories::{
        api_key_repository::ApiKeyRepository, file_record_repository::FileRecordRepository,
    },
    services::{reconciliation_job::ReconciliationJob, upload_coordinator::UploadCoordinator},
};
use domain::config::settings::Settings;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Initialize AWS SDK crypto provider (required for aws-sdk-s3)
    // This must be called before any AWS SDK operations
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let settings = match Settings::from_env() {
        Ok(settings) => Arc::new(settings),
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!(
        port = settings.server.port,
        strategy = %settings.server.default_strategy,
        max_upload_bytes = settings.policy.max_upload_bytes,
        retention_seconds = settings.policy.retention_seconds,
        "Starting fleet-files-service"
    );

    // Connect to PostgreSQL and Redis in parallel for faster startup
    tracing::info!("Connecting to databases...");
    let (pool, redis_conn_manager) = tokio::join!(
        async {
            sqlx::postgres::PgPoolOptions::new()
                .max_connections(5)
                .acquire_timeout(Duration::from_secs(30))
                .connect(&settings.secrets.database_url)
                .await
                .expect("ERROR: Failed to connect to PostgreSQL database. Check DATABASE_URL and network connectivity.")
        },
        async {
            let redis_client = redis::Client::open(settings.secrets.redis_url.as_str())
                .expect("ERROR: Failed to create Redis client. Check REDIS_URL format.");
            redis::aio::ConnectionManager::new(redis_client)
                .await
                .expect(
                    "ERROR: Failed to connect to Redis. Check REDIS_URL and network connectivity.",
                )
        }
    );
    tracing::info!("Database connections established");

    let file_records = PgFileRecordRepository::new(pool);
    file_records
        .ensure_schema()
        .await
        .expect("Failed to prepare the file record schema");
    let file_records = Arc::new(file_records) as Arc<dyn FileRecordRepository>;

    let object_storage = services::create_object_storage(&settings.secrets.s3)
        .expect("Failed to create object storage client");

    let coordinator = Arc::new(UploadCoordinator::new(
        file_records.clone(),
        object_storage.clone(),
        settings.policy.max_upload_bytes,
    ));
    let reconciliation_job = Arc::new(ReconciliationJob::new(
        file_records,
        object_storage,
        settings.policy.retention(),
    ));

    let scheduler = settings.server.reconcile_interval_seconds.map(|seconds| {
        tracing::info!(interval_seconds = seconds, "Scheduling reconciliation");
        ReconciliationScheduler::new(reconciliation_job.clone(), Duration::from_secs(seconds))
            .start()
    });

    let app_state = AppState {
        settings: settings.clone(),
        coordinator,
        reconciliation_job,
        api_keys: Arc::new(RedisApiKeyRepository::new(redis_conn_manager))
            as Arc<dyn ApiKeyRepository>,
    };

    let app = router(app_state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", settings.server.port))
        .await
        .expect("Failed to bind to port");

    tracing::info!("Server listening on 0.0.0.0:{}", settings.server.port);

    let served = axum::serve(listener, app).await;

    if let Some(handle) = scheduler {
        handle.abort();
    }

    served.expect("Failed to start server");
}
