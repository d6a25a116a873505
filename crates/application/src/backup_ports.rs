use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use doctero_domain::{BackupArtifact, BackupError, BackupTier};

/// Source of the current instant.
pub trait Clock: Send + Sync {
    /// Returns the current UTC instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock backed by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Port for the external database export step.
#[async_trait]
pub trait DatabaseExporter: Send + Sync {
    /// Extension of the files this exporter produces, without the leading dot.
    fn file_extension(&self) -> &str;

    /// Writes a full database export to `destination`.
    ///
    /// The destination may contain partial output when this returns an error;
    /// the caller removes it.
    async fn export(&self, destination: &Path) -> Result<(), BackupError>;
}

/// Port for the tier-partitioned artifact directory tree.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Creates the tier directory on demand and returns the staging path the
    /// exporter writes `file_name` to.
    ///
    /// Fails when a finished artifact named `file_name` already exists.
    async fn prepare(&self, tier: BackupTier, file_name: &str) -> Result<PathBuf, BackupError>;

    /// Moves a finished staging file to its final name and returns its metadata.
    ///
    /// On error no final file is left behind.
    async fn commit(
        &self,
        tier: BackupTier,
        staging_path: &Path,
        file_name: &str,
    ) -> Result<BackupArtifact, BackupError>;

    /// Removes a staging file. A missing file is not an error.
    async fn discard(&self, path: &Path) -> Result<(), BackupError>;

    /// Removes the finished artifact `file_name` of `tier` left by an
    /// abandoned commit. A missing file is not an error.
    async fn discard_committed(&self, tier: BackupTier, file_name: &str) -> Result<(), BackupError>;

    /// Lists finished artifacts of one tier, in no particular order.
    async fn list(&self, tier: BackupTier) -> Result<Vec<BackupArtifact>, BackupError>;

    /// Deletes one finished artifact.
    async fn remove(&self, artifact: &BackupArtifact) -> Result<(), BackupError>;
}
