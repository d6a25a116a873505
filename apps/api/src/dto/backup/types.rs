use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Incoming payload for a manual backup. The body may be omitted.
#[derive(Debug, Default, Deserialize, TS)]
pub struct CreateBackupRequest {
    pub tier: Option<String>,
}

/// API representation of one backup artifact.
#[derive(Debug, Serialize, TS)]
pub struct BackupArtifactResponse {
    pub tier: String,
    pub file_name: String,
    pub file_path: String,
    pub size_bytes: u64,
    /// RFC 3339 UTC timestamp with milliseconds.
    pub created_at: String,
}

/// Response to a completed manual backup.
#[derive(Debug, Serialize, TS)]
pub struct CreateBackupResponse {
    pub message: String,
    pub artifact: BackupArtifactResponse,
}

/// Artifacts of one tier, newest first.
#[derive(Debug, Serialize, TS)]
pub struct BackupTierArtifactsResponse {
    pub tier: String,
    pub artifacts: Vec<BackupArtifactResponse>,
}

/// Backup listing grouped by tier.
#[derive(Debug, Serialize, TS)]
pub struct BackupListResponse {
    pub tiers: Vec<BackupTierArtifactsResponse>,
}

/// Expired artifact that a cleanup could not delete.
#[derive(Debug, Serialize, TS)]
pub struct BackupCleanupWarningResponse {
    pub file_path: String,
    pub message: String,
}

/// Most recent scheduled run of a tier.
#[derive(Debug, Serialize, TS)]
pub struct BackupRunResponse {
    pub run_id: String,
    /// One of `completed`, `cleanup_failed`, `failed`, `skipped`.
    pub status: String,
    pub started_at: String,
    pub finished_at: String,
    pub file_name: Option<String>,
    pub size_bytes: Option<u64>,
    pub deleted_count: Option<usize>,
    /// Expired artifacts left in place by the cleanup of a completed run.
    pub cleanup_warnings: Vec<BackupCleanupWarningResponse>,
    pub error: Option<String>,
    pub message: Option<String>,
}

/// Dashboard entry for one tier.
#[derive(Debug, Serialize, TS)]
pub struct BackupTierDashboardResponse {
    pub tier: String,
    pub artifact_count: usize,
    pub total_size_bytes: u64,
    pub latest_created_at: Option<String>,
    /// Human readable window such as `30 days`, `None` when never cleaned.
    pub retention: Option<String>,
    pub schedule: Option<String>,
    pub next_run_at: Option<String>,
    pub running: bool,
    pub last_run: Option<BackupRunResponse>,
}

/// Backup dashboard payload.
#[derive(Debug, Serialize, TS)]
pub struct BackupDashboardResponse {
    pub scheduler_running: bool,
    pub total_artifacts: usize,
    pub total_size_bytes: u64,
    pub tiers: Vec<BackupTierDashboardResponse>,
}
