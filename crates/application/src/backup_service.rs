use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::SubsecRound;
use doctero_domain::{BackupArtifact, BackupError, BackupTier, artifact_file_name};
use tokio::time::timeout;
use tracing::{info, warn};

use crate::backup_ports::{ArtifactStore, Clock, DatabaseExporter};
use crate::tier_guard::{TierGuard, TierPermit};

mod catalog;

pub use catalog::{TierArtifacts, TierUsage};

/// Upper bounds for the suspension points of a backup run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackupTimeouts {
    /// Bound for the database export process.
    pub export: Duration,
    /// Bound for each filesystem step (directory creation, rename, listing, delete).
    pub io: Duration,
}

impl Default for BackupTimeouts {
    fn default() -> Self {
        Self {
            export: Duration::from_secs(30 * 60),
            io: Duration::from_secs(30),
        }
    }
}

/// Executes backup runs and reads the artifact catalog.
#[derive(Clone)]
pub struct BackupService {
    exporter: Arc<dyn DatabaseExporter>,
    store: Arc<dyn ArtifactStore>,
    clock: Arc<dyn Clock>,
    guard: Arc<TierGuard>,
    timeouts: BackupTimeouts,
}

impl BackupService {
    /// Creates a backup service with its own tier guard.
    #[must_use]
    pub fn new(
        exporter: Arc<dyn DatabaseExporter>,
        store: Arc<dyn ArtifactStore>,
        clock: Arc<dyn Clock>,
        timeouts: BackupTimeouts,
    ) -> Self {
        Self {
            exporter,
            store,
            clock,
            guard: Arc::new(TierGuard::new()),
            timeouts,
        }
    }

    /// Returns the configured time bounds.
    #[must_use]
    pub fn timeouts(&self) -> BackupTimeouts {
        self.timeouts
    }

    /// Returns whether a run for `tier` is in progress.
    #[must_use]
    pub fn is_running(&self, tier: BackupTier) -> bool {
        self.guard.is_running(tier)
    }

    /// Claims the run slot for `tier`.
    pub fn try_acquire(&self, tier: BackupTier) -> Result<TierPermit, BackupError> {
        self.guard
            .try_acquire(tier)
            .ok_or(BackupError::SkippedOverlap(tier))
    }

    /// Runs one backup for `tier`, unless another run of that tier is active.
    pub async fn run_backup(&self, tier: BackupTier) -> Result<BackupArtifact, BackupError> {
        let permit = self.try_acquire(tier)?;
        self.execute(&permit).await
    }

    /// Runs one backup for the tier held by `permit`.
    ///
    /// Produces exactly one artifact, or none and an error. The staging file
    /// is removed before any error is returned.
    pub async fn execute(&self, permit: &TierPermit) -> Result<BackupArtifact, BackupError> {
        let tier = permit.tier();
        let created_at = self.clock.now().trunc_subsecs(3);
        let file_name = artifact_file_name(tier, created_at, self.exporter.file_extension());

        let staging_path = self
            .within_io_bound(
                "preparing the backup directory",
                self.store.prepare(tier, &file_name),
            )
            .await?;

        info!(tier = %tier, file = %file_name, "database export started");

        let exported =
            match timeout(self.timeouts.export, self.exporter.export(&staging_path)).await {
                Ok(result) => result,
                Err(_) => Err(BackupError::Timeout(format!(
                    "database export exceeded {:?}",
                    self.timeouts.export
                ))),
            };

        if let Err(error) = exported {
            self.discard_staging(tier, &staging_path).await;
            return Err(error);
        }

        match self.commit(tier, &staging_path, &file_name).await {
            Ok(artifact) => {
                info!(
                    tier = %tier,
                    file = %artifact.file_path().display(),
                    size_bytes = artifact.size_bytes(),
                    "backup artifact written"
                );
                Ok(artifact)
            }
            Err(error) => {
                self.discard_staging(tier, &staging_path).await;
                Err(error)
            }
        }
    }

    /// Commits the staging file under the io bound.
    ///
    /// The store call runs as its own task, since a filesystem rename cannot
    /// be cancelled once started. When the bound expires the final file is
    /// removed right away and again once the late commit settles.
    async fn commit(
        &self,
        tier: BackupTier,
        staging_path: &Path,
        file_name: &str,
    ) -> Result<BackupArtifact, BackupError> {
        let mut commit = tokio::spawn({
            let store = Arc::clone(&self.store);
            let staging_path = staging_path.to_path_buf();
            let file_name = file_name.to_owned();
            async move { store.commit(tier, &staging_path, &file_name).await }
        });

        match timeout(self.timeouts.io, &mut commit).await {
            Ok(Ok(result)) => result,
            Ok(Err(error)) => Err(BackupError::Io(format!(
                "finalizing the backup artifact failed: {error}"
            ))),
            Err(_) => {
                self.discard_committed(tier, file_name).await;

                let service = self.clone();
                let staging_path = staging_path.to_path_buf();
                let file_name = file_name.to_owned();
                tokio::spawn(async move {
                    match commit.await {
                        Ok(Ok(_)) => service.discard_committed(tier, &file_name).await,
                        Ok(Err(_)) => service.discard_staging(tier, &staging_path).await,
                        Err(_) => {}
                    }
                });

                Err(BackupError::Timeout(format!(
                    "finalizing the backup artifact exceeded {:?}",
                    self.timeouts.io
                )))
            }
        }
    }

    async fn within_io_bound<T>(
        &self,
        stage: &str,
        operation: impl Future<Output = Result<T, BackupError>>,
    ) -> Result<T, BackupError> {
        timeout(self.timeouts.io, operation).await.map_err(|_| {
            BackupError::Timeout(format!("{stage} exceeded {:?}", self.timeouts.io))
        })?
    }

    async fn discard_staging(&self, tier: BackupTier, staging_path: &Path) {
        match timeout(self.timeouts.io, self.store.discard(staging_path)).await {
            Ok(Ok(())) => {}
            Ok(Err(error)) => warn!(
                tier = %tier,
                file = %staging_path.display(),
                error = %error,
                "failed to remove partial backup file"
            ),
            Err(_) => warn!(
                tier = %tier,
                file = %staging_path.display(),
                "timed out removing partial backup file"
            ),
        }
    }

    async fn discard_committed(&self, tier: BackupTier, file_name: &str) {
        match timeout(self.timeouts.io, self.store.discard_committed(tier, file_name)).await {
            Ok(Ok(())) => {}
            Ok(Err(error)) => warn!(
                tier = %tier,
                file = %file_name,
                error = %error,
                "failed to remove abandoned backup artifact"
            ),
            Err(_) => warn!(
                tier = %tier,
                file = %file_name,
                "timed out removing abandoned backup artifact"
            ),
        }
    }
}
