mod backup;
mod health;

pub use backup::{
    BackupArtifactResponse, BackupDashboardResponse, BackupListResponse,
    BackupTierArtifactsResponse, BackupTierDashboardResponse, CreateBackupRequest,
    CreateBackupResponse, format_timestamp,
};
pub use health::{HealthDependencyStatus, HealthResponse};
