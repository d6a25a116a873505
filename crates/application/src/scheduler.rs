use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, Utc};
use doctero_domain::{BackupTier, ScheduleTrigger};
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::backup_ports::Clock;
use crate::backup_service::BackupService;
use crate::retention_service::RetentionService;

mod status;

pub use status::{
    SchedulerStatus, SchedulerStatusBoard, TierRunOutcome, TierRunRecord, TierScheduleStatus,
};

/// Longest sleep between two schedule evaluations.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Drives scheduled backups and retention cleanup for every configured trigger.
#[derive(Clone)]
pub struct BackupScheduler {
    backup_service: BackupService,
    retention_service: RetentionService,
    triggers: Vec<ScheduleTrigger>,
    offset: FixedOffset,
    status: SchedulerStatusBoard,
    clock: Arc<dyn Clock>,
    poll_interval: Duration,
}

/// Running scheduler. Dropping it without [`SchedulerHandle::stop`] leaves the
/// loop running until the runtime shuts down.
#[derive(Debug)]
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Stops firing new triggers and waits for in-flight runs to finish.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(join_error) = self.task.await {
            error!(error = %join_error, "backup scheduler task ended abnormally");
        }
    }
}

struct PlannedTrigger {
    trigger: ScheduleTrigger,
    next_fire_at: Option<DateTime<Utc>>,
}

struct DriveState {
    planned: Vec<PlannedTrigger>,
    in_flight: JoinSet<()>,
}

impl BackupScheduler {
    /// Creates a scheduler. Wall-clock rules are evaluated at `offset`.
    #[must_use]
    pub fn new(
        backup_service: BackupService,
        retention_service: RetentionService,
        triggers: Vec<ScheduleTrigger>,
        offset: FixedOffset,
        status: SchedulerStatusBoard,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            backup_service,
            retention_service,
            triggers,
            offset,
            status,
            clock,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Overrides the longest sleep between schedule evaluations.
    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Marks the scheduler running and spawns the driving loop on the
    /// current runtime.
    pub async fn start(self) -> SchedulerHandle {
        self.status.set_running(true).await;
        let (shutdown, receiver) = watch::channel(false);
        let task = tokio::spawn(self.drive(receiver));
        SchedulerHandle { shutdown, task }
    }

    async fn drive(self, mut shutdown: watch::Receiver<bool>) {
        let mut state = self.plan(self.clock.now()).await;
        info!(
            triggers = state.planned.len(),
            offset = %self.offset,
            "backup scheduler started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let now = self.clock.now();
            self.tick(&mut state, now).await;
            while let Some(result) = state.in_flight.try_join_next() {
                log_join_result(result);
            }

            let wait = self.wait_until_next_fire(&state, now);
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                () = tokio::time::sleep(wait) => {}
            }
        }

        self.status.set_running(false).await;
        info!(
            in_flight = state.in_flight.len(),
            "backup scheduler stopping, waiting for in-flight runs"
        );
        while let Some(result) = state.in_flight.join_next().await {
            log_join_result(result);
        }
        info!("backup scheduler stopped");
    }

    async fn plan(&self, now: DateTime<Utc>) -> DriveState {
        let mut planned = Vec::with_capacity(self.triggers.len());
        for trigger in &self.triggers {
            let next_fire_at = self.next_fire_after(trigger, now);
            self.status
                .plan(trigger.tier(), trigger.rule(), next_fire_at)
                .await;
            info!(
                tier = %trigger.tier(),
                rule = %trigger.rule(),
                next_fire_at = ?next_fire_at,
                "backup trigger planned"
            );
            planned.push(PlannedTrigger {
                trigger: *trigger,
                next_fire_at,
            });
        }

        DriveState {
            planned,
            in_flight: JoinSet::new(),
        }
    }

    /// Fires every trigger that is due at `now` and advances it past `now`.
    ///
    /// A trigger that missed several fire instants fires once.
    async fn tick(&self, state: &mut DriveState, now: DateTime<Utc>) -> usize {
        let mut fired = 0;
        for entry in &mut state.planned {
            let Some(due_at) = entry.next_fire_at else {
                continue;
            };
            if due_at > now {
                continue;
            }

            let tier = entry.trigger.tier();
            entry.next_fire_at = self.next_fire_after(&entry.trigger, now);
            self.status
                .plan(tier, entry.trigger.rule(), entry.next_fire_at)
                .await;
            if entry.next_fire_at.is_none() {
                warn!(tier = %tier, "backup trigger has no further fire time");
            }

            let fire = TierFire {
                backup_service: self.backup_service.clone(),
                retention_service: self.retention_service.clone(),
                status: self.status.clone(),
                clock: Arc::clone(&self.clock),
                tier,
            };
            state.in_flight.spawn(fire.run());
            fired += 1;
        }

        fired
    }

    fn next_fire_after(
        &self,
        trigger: &ScheduleTrigger,
        now: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        trigger
            .rule()
            .next_after(&now.with_timezone(&self.offset))
            .map(|next| next.with_timezone(&Utc))
    }

    fn wait_until_next_fire(&self, state: &DriveState, now: DateTime<Utc>) -> Duration {
        state
            .planned
            .iter()
            .filter_map(|entry| entry.next_fire_at)
            .min()
            .map(|next| (next - now).to_std().unwrap_or(Duration::ZERO))
            .map_or(self.poll_interval, |until| until.min(self.poll_interval))
    }
}

struct TierFire {
    backup_service: BackupService,
    retention_service: RetentionService,
    status: SchedulerStatusBoard,
    clock: Arc<dyn Clock>,
    tier: BackupTier,
}

impl TierFire {
    async fn run(self) {
        let run_id = Uuid::new_v4();
        let tier = self.tier;
        let started_at = self.clock.now();
        info!(run_id = %run_id, tier = %tier, "scheduled backup started");

        let outcome = self.backup_then_cleanup(run_id).await;

        self.status
            .record(
                tier,
                TierRunRecord {
                    run_id,
                    started_at,
                    finished_at: self.clock.now(),
                    outcome,
                },
            )
            .await;
    }

    async fn backup_then_cleanup(&self, run_id: Uuid) -> TierRunOutcome {
        let tier = self.tier;
        let permit = match self.backup_service.try_acquire(tier) {
            Ok(permit) => permit,
            Err(error) => {
                info!(run_id = %run_id, tier = %tier, reason = %error, "scheduled backup skipped");
                return TierRunOutcome::Skipped;
            }
        };

        let artifact = match self.backup_service.execute(&permit).await {
            Ok(artifact) => artifact,
            Err(error) => {
                warn!(run_id = %run_id, tier = %tier, error = %error, "scheduled backup failed");
                return TierRunOutcome::Failed {
                    error_code: error.code().to_owned(),
                    message: error.to_string(),
                };
            }
        };
        let file_name = artifact.file_name().unwrap_or_default().to_owned();

        match self.retention_service.cleanup(tier).await {
            Ok(report) => {
                info!(
                    run_id = %run_id,
                    tier = %tier,
                    file = %file_name,
                    deleted = report.deleted_count,
                    warnings = report.warnings.len(),
                    "scheduled backup completed"
                );
                TierRunOutcome::Completed {
                    file_name,
                    size_bytes: artifact.size_bytes(),
                    deleted_count: report.deleted_count,
                    cleanup_warnings: report.warnings,
                }
            }
            Err(error) => {
                warn!(
                    run_id = %run_id,
                    tier = %tier,
                    file = %file_name,
                    error = %error,
                    "backup retention cleanup failed"
                );
                TierRunOutcome::CleanupFailed {
                    file_name,
                    message: error.to_string(),
                }
            }
        }
    }
}

fn log_join_result(result: Result<(), tokio::task::JoinError>) {
    if let Err(join_error) = result {
        error!(error = %join_error, "scheduled backup task panicked");
    }
}
