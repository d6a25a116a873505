use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use doctero_domain::{BackupError, BackupTier, RetentionPolicies};
use tokio::time::timeout;
use tracing::{info, warn};

use crate::backup_ports::{ArtifactStore, Clock};

/// One artifact that could not be deleted during cleanup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupWarning {
    /// Artifact that was left in place.
    pub file_path: PathBuf,
    /// Reason the deletion failed.
    pub message: String,
}

/// Outcome of one cleanup pass over a tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    /// Cleaned tier.
    pub tier: BackupTier,
    /// Number of artifacts actually deleted.
    pub deleted_count: usize,
    /// Per-file failures that did not stop the pass.
    pub warnings: Vec<CleanupWarning>,
}

/// Deletes artifacts that have outlived their tier's retention window.
#[derive(Clone)]
pub struct RetentionService {
    store: Arc<dyn ArtifactStore>,
    policies: RetentionPolicies,
    clock: Arc<dyn Clock>,
    io_timeout: Duration,
}

impl RetentionService {
    /// Creates a retention service.
    #[must_use]
    pub fn new(
        store: Arc<dyn ArtifactStore>,
        policies: RetentionPolicies,
        clock: Arc<dyn Clock>,
        io_timeout: Duration,
    ) -> Self {
        Self {
            store,
            policies,
            clock,
            io_timeout,
        }
    }

    /// Returns the configured retention windows.
    #[must_use]
    pub fn policies(&self) -> RetentionPolicies {
        self.policies
    }

    /// Deletes expired artifacts of `tier` relative to the current time.
    pub async fn cleanup(&self, tier: BackupTier) -> Result<CleanupReport, BackupError> {
        self.cleanup_at(tier, self.clock.now()).await
    }

    /// Deletes artifacts of `tier` whose age at `now` has reached the window.
    ///
    /// Individual deletion failures are collected as warnings. Only a failure
    /// to list the tier is returned as an error.
    pub async fn cleanup_at(
        &self,
        tier: BackupTier,
        now: DateTime<Utc>,
    ) -> Result<CleanupReport, BackupError> {
        let mut report = CleanupReport {
            tier,
            deleted_count: 0,
            warnings: Vec::new(),
        };

        let Some(window) = self.policies.window_for(tier) else {
            return Ok(report);
        };

        let artifacts = timeout(self.io_timeout, self.store.list(tier))
            .await
            .map_err(|_| {
                BackupError::Timeout(format!(
                    "listing {tier} backups exceeded {:?}",
                    self.io_timeout
                ))
            })??;

        for artifact in artifacts
            .iter()
            .filter(|artifact| window.is_expired(artifact.created_at(), now))
        {
            let removed = match timeout(self.io_timeout, self.store.remove(artifact)).await {
                Ok(result) => result,
                Err(_) => Err(BackupError::Timeout(format!(
                    "deleting backup exceeded {:?}",
                    self.io_timeout
                ))),
            };

            match removed {
                Ok(()) => {
                    report.deleted_count += 1;
                    info!(
                        tier = %tier,
                        file = %artifact.file_path().display(),
                        retention = %window,
                        "expired backup deleted"
                    );
                }
                Err(error) => {
                    warn!(
                        tier = %tier,
                        file = %artifact.file_path().display(),
                        error = %error,
                        "failed to delete expired backup"
                    );
                    report.warnings.push(CleanupWarning {
                        file_path: artifact.file_path().to_path_buf(),
                        message: error.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }
}
