use chrono::{DateTime, SecondsFormat, Utc};
use doctero_application::{CleanupWarning, TierArtifacts, TierRunOutcome, TierRunRecord};
use doctero_domain::BackupArtifact;

use super::types::{
    BackupArtifactResponse, BackupCleanupWarningResponse, BackupRunResponse,
    BackupTierArtifactsResponse,
};

pub fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl From<&BackupArtifact> for BackupArtifactResponse {
    fn from(value: &BackupArtifact) -> Self {
        Self {
            tier: value.tier().as_str().to_owned(),
            file_name: value.file_name().unwrap_or_default().to_owned(),
            file_path: value.file_path().display().to_string(),
            size_bytes: value.size_bytes(),
            created_at: format_timestamp(value.created_at()),
        }
    }
}

impl From<TierArtifacts> for BackupTierArtifactsResponse {
    fn from(value: TierArtifacts) -> Self {
        Self {
            tier: value.tier.as_str().to_owned(),
            artifacts: value
                .artifacts
                .iter()
                .map(BackupArtifactResponse::from)
                .collect(),
        }
    }
}

impl From<CleanupWarning> for BackupCleanupWarningResponse {
    fn from(value: CleanupWarning) -> Self {
        Self {
            file_path: value.file_path.display().to_string(),
            message: value.message,
        }
    }
}

impl From<TierRunRecord> for BackupRunResponse {
    fn from(value: TierRunRecord) -> Self {
        let mut response = Self {
            run_id: value.run_id.to_string(),
            status: value.outcome.label().to_owned(),
            started_at: format_timestamp(value.started_at),
            finished_at: format_timestamp(value.finished_at),
            file_name: None,
            size_bytes: None,
            deleted_count: None,
            cleanup_warnings: Vec::new(),
            error: None,
            message: None,
        };

        match value.outcome {
            TierRunOutcome::Completed {
                file_name,
                size_bytes,
                deleted_count,
                cleanup_warnings,
            } => {
                response.file_name = Some(file_name);
                response.size_bytes = Some(size_bytes);
                response.deleted_count = Some(deleted_count);
                response.cleanup_warnings = cleanup_warnings
                    .into_iter()
                    .map(BackupCleanupWarningResponse::from)
                    .collect();
            }
            TierRunOutcome::CleanupFailed { file_name, message } => {
                response.file_name = Some(file_name);
                response.message = Some(message);
            }
            TierRunOutcome::Failed {
                error_code,
                message,
            } => {
                response.error = Some(error_code);
                response.message = Some(message);
            }
            TierRunOutcome::Skipped => {}
        }

        response
    }
}
