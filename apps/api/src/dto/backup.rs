mod conversions;
mod types;

pub use conversions::format_timestamp;
pub use types::{
    BackupArtifactResponse, BackupDashboardResponse, BackupListResponse,
    BackupTierArtifactsResponse, BackupTierDashboardResponse, CreateBackupRequest,
    CreateBackupResponse,
};
