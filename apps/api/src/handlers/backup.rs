use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::extract::rejection::BytesRejection;
use axum::http::StatusCode;
use doctero_core::AppError;
use doctero_domain::BackupTier;
use tracing::info;

use crate::dto::{
    BackupArtifactResponse, BackupDashboardResponse, BackupListResponse,
    BackupTierArtifactsResponse, BackupTierDashboardResponse, CreateBackupRequest,
    CreateBackupResponse, format_timestamp,
};
use crate::error::ApiResult;
use crate::state::AppState;

mod create;
mod dashboard;
mod list;

pub use create::create_backup_handler;
pub use dashboard::backup_dashboard_handler;
pub use list::list_backups_handler;

#[cfg(test)]
mod tests;
