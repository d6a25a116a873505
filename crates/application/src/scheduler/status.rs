use std::sync::Arc;

use chrono::{DateTime, Utc};
use doctero_domain::{BackupTier, ScheduleRule};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::retention_service::CleanupWarning;

/// Result of one scheduled fire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TierRunOutcome {
    /// Backup and cleanup both succeeded.
    Completed {
        /// Name of the new artifact.
        file_name: String,
        /// Size of the new artifact.
        size_bytes: u64,
        /// Number of expired artifacts deleted.
        deleted_count: usize,
        /// Expired artifacts that could not be deleted.
        cleanup_warnings: Vec<CleanupWarning>,
    },
    /// The backup succeeded but listing the tier for cleanup failed.
    CleanupFailed {
        /// Name of the new artifact.
        file_name: String,
        /// Cleanup error message.
        message: String,
    },
    /// The backup failed. Cleanup did not run.
    Failed {
        /// Machine-readable error code.
        error_code: String,
        /// Error message.
        message: String,
    },
    /// A previous run of the tier was still active.
    Skipped,
}

impl TierRunOutcome {
    /// Returns a short status label.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Completed { .. } => "completed",
            Self::CleanupFailed { .. } => "cleanup_failed",
            Self::Failed { .. } => "failed",
            Self::Skipped => "skipped",
        }
    }
}

/// Record of the most recent scheduled fire of a tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierRunRecord {
    /// Identifier attached to every log line of the fire.
    pub run_id: Uuid,
    /// Fire start.
    pub started_at: DateTime<Utc>,
    /// Fire end.
    pub finished_at: DateTime<Utc>,
    /// What happened.
    pub outcome: TierRunOutcome,
}

/// Schedule state of one tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierScheduleStatus {
    /// Tier.
    pub tier: BackupTier,
    /// Configured rule, `None` when the tier is not scheduled.
    pub rule: Option<ScheduleRule>,
    /// Next planned fire.
    pub next_fire_at: Option<DateTime<Utc>>,
    /// Most recent scheduled fire.
    pub last_run: Option<TierRunRecord>,
}

/// Point-in-time view of the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerStatus {
    /// Whether the driving loop is active.
    pub running: bool,
    /// One entry per tier, in tier order.
    pub tiers: Vec<TierScheduleStatus>,
}

impl Default for SchedulerStatus {
    fn default() -> Self {
        Self {
            running: false,
            tiers: BackupTier::ALL
                .into_iter()
                .map(|tier| TierScheduleStatus {
                    tier,
                    rule: None,
                    next_fire_at: None,
                    last_run: None,
                })
                .collect(),
        }
    }
}

impl SchedulerStatus {
    /// Returns the entry for `tier`.
    #[must_use]
    pub fn tier(&self, tier: BackupTier) -> Option<&TierScheduleStatus> {
        self.tiers.get(tier.index())
    }
}

/// Shared, readable scheduler state written by the driving loop.
#[derive(Debug, Clone, Default)]
pub struct SchedulerStatusBoard {
    inner: Arc<RwLock<SchedulerStatus>>,
}

impl SchedulerStatusBoard {
    /// Creates an idle board.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the current state.
    pub async fn snapshot(&self) -> SchedulerStatus {
        self.inner.read().await.clone()
    }

    pub(super) async fn set_running(&self, running: bool) {
        self.inner.write().await.running = running;
    }

    pub(super) async fn plan(
        &self,
        tier: BackupTier,
        rule: ScheduleRule,
        next_fire_at: Option<DateTime<Utc>>,
    ) {
        if let Some(entry) = self.inner.write().await.tiers.get_mut(tier.index()) {
            entry.rule = Some(rule);
            entry.next_fire_at = next_fire_at;
        }
    }

    pub(super) async fn record(&self, tier: BackupTier, record: TierRunRecord) {
        if let Some(entry) = self.inner.write().await.tiers.get_mut(tier.index()) {
            entry.last_run = Some(record);
        }
    }
}
