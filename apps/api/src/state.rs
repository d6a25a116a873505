use doctero_application::{BackupService, RetentionService, SchedulerStatusBoard};
use sqlx::PgPool;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub backup_service: BackupService,
    pub retention_service: RetentionService,
    pub scheduler_status: SchedulerStatusBoard,
    pub scheduler_enabled: bool,
    pub postgres_pool: PgPool,
}
