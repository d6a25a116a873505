//! Doctero backup API composition root.

#![forbid(unsafe_code)]

mod api_config;
mod api_router;
mod dto;
mod error;
mod handlers;
mod state;
#[cfg(test)]
mod test_support;

use std::sync::Arc;
use std::time::Duration;

use doctero_application::{
    BackupScheduler, BackupService, Clock, RetentionService, SchedulerStatusBoard, SystemClock,
};
use doctero_core::AppError;
use doctero_infrastructure::{FilesystemArtifactStore, PgDumpExporter};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use tokio::signal;
use tracing::{info, warn};

use crate::api_config::{ApiConfig, init_tracing};
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ApiConfig::load()?;

    let mut connect_options = PgConnectOptions::new()
        .host(&config.database.host)
        .port(config.database.port)
        .database(&config.database.name)
        .username(&config.database.user);
    if let Some(password) = &config.database.password {
        connect_options = connect_options.password(password);
    }
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .acquire_timeout(Duration::from_secs(5))
        .connect_lazy_with(connect_options);

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store = Arc::new(FilesystemArtifactStore::new(config.backup_root.clone()));
    let exporter = Arc::new(PgDumpExporter::new(config.pg_dump_config()));

    let backup_service =
        BackupService::new(exporter, store.clone(), clock.clone(), config.timeouts);
    let retention_service =
        RetentionService::new(store, config.retention, clock.clone(), config.timeouts.io);
    let scheduler_status = SchedulerStatusBoard::new();

    let scheduler_handle = if config.scheduler_enabled {
        Some(
            BackupScheduler::new(
                backup_service.clone(),
                retention_service.clone(),
                config.triggers.clone(),
                config.schedule_offset,
                scheduler_status.clone(),
                clock,
            )
            .start()
            .await,
        )
    } else {
        warn!("backup scheduler disabled by BACKUP_SCHEDULER_ENABLED");
        None
    };

    let app_state = AppState {
        backup_service,
        retention_service,
        scheduler_status,
        scheduler_enabled: config.scheduler_enabled,
        postgres_pool: pool.clone(),
    };
    let app = api_router::build_router(app_state, &config.frontend_url)?;

    let address = config.socket_address()?;
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind listener: {error}")))?;

    info!(
        %address,
        backup_root = %config.backup_root.display(),
        database = %config.database.name,
        "doctero-api listening"
    );

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|error| AppError::Internal(format!("api server error: {error}")));

    if let Some(handle) = scheduler_handle {
        handle.stop().await;
    }
    pool.close().await;
    info!("doctero-api stopped");

    served
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            warn!(error = %error, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(error) => {
                warn!(error = %error, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("shutdown signal received, draining connections");
}
