//! Application services and ports.

#![forbid(unsafe_code)]

mod backup_ports;
mod backup_service;
mod retention_service;
mod scheduler;
mod tier_guard;

#[cfg(test)]
mod test_support;

pub use backup_ports::{ArtifactStore, Clock, DatabaseExporter, SystemClock};
pub use backup_service::{BackupService, BackupTimeouts, TierArtifacts, TierUsage};
pub use retention_service::{CleanupReport, CleanupWarning, RetentionService};
pub use scheduler::{
    BackupScheduler, DEFAULT_POLL_INTERVAL, SchedulerHandle, SchedulerStatus,
    SchedulerStatusBoard, TierRunOutcome, TierRunRecord, TierScheduleStatus,
};
pub use tier_guard::{TierGuard, TierPermit};
