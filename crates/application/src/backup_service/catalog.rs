use chrono::{DateTime, Utc};

use super::*;

/// Finished artifacts of one tier, newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierArtifacts {
    /// Tier the artifacts belong to.
    pub tier: BackupTier,
    /// Artifacts ordered by creation time, newest first.
    pub artifacts: Vec<BackupArtifact>,
}

/// Storage usage summary for one tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierUsage {
    /// Summarized tier.
    pub tier: BackupTier,
    /// Number of finished artifacts.
    pub artifact_count: usize,
    /// Sum of artifact sizes.
    pub total_size_bytes: u64,
    /// Creation time of the newest artifact.
    pub latest_created_at: Option<DateTime<Utc>>,
    /// Whether a run for the tier is in progress.
    pub running: bool,
}

impl BackupService {
    /// Lists finished artifacts of every tier. Empty tiers are included.
    pub async fn list_artifacts(&self) -> Result<Vec<TierArtifacts>, BackupError> {
        let mut groups = Vec::with_capacity(BackupTier::COUNT);
        for tier in BackupTier::ALL {
            let mut artifacts = self
                .within_io_bound("listing backup artifacts", self.store.list(tier))
                .await?;
            artifacts.sort_by(|left, right| {
                right
                    .created_at()
                    .cmp(&left.created_at())
                    .then_with(|| right.file_path().cmp(left.file_path()))
            });
            groups.push(TierArtifacts { tier, artifacts });
        }

        Ok(groups)
    }

    /// Summarizes artifact counts and sizes per tier.
    pub async fn summarize(&self) -> Result<Vec<TierUsage>, BackupError> {
        Ok(self
            .list_artifacts()
            .await?
            .into_iter()
            .map(|group| TierUsage {
                tier: group.tier,
                artifact_count: group.artifacts.len(),
                total_size_bytes: group
                    .artifacts
                    .iter()
                    .map(BackupArtifact::size_bytes)
                    .sum(),
                latest_created_at: group.artifacts.first().map(BackupArtifact::created_at),
                running: self.is_running(group.tier),
            })
            .collect())
    }
}
