use std::path::{Path, PathBuf};
use std::sync::Mutex as StdMutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use doctero_domain::{
    BackupArtifact, BackupError, BackupTier, STAGING_SUFFIX, parse_artifact_file_name,
};
use tokio::sync::Mutex;

use crate::backup_ports::{ArtifactStore, Clock, DatabaseExporter};

pub(crate) fn instant(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
        .single()
        .unwrap_or_else(|| unreachable!())
}

/// Clock whose time only moves when a test moves it.
pub(crate) struct FakeClock {
    now: StdMutex<DateTime<Utc>>,
}

impl FakeClock {
    pub(crate) fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: StdMutex::new(now),
        }
    }

    pub(crate) fn set(&self, now: DateTime<Utc>) {
        *self
            .now
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = now;
    }

    pub(crate) fn advance(&self, delta: TimeDelta) {
        let mut now = self
            .now
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *now += delta;
    }
}

impl Clock for FakeClock {
    fn now(&self) -> DateTime<Utc> {
        *self
            .now
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Behavior of [`FakeExporter`] for every export call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ExportBehavior {
    Succeed,
    FailAfterPartialWrite,
    Fail,
    Hang,
}

/// Exporter that writes into the in-memory store instead of running a process.
pub(crate) struct FakeExporter {
    store: std::sync::Arc<FakeArtifactStore>,
    behavior: ExportBehavior,
    delay: Duration,
    calls: AtomicUsize,
}

impl FakeExporter {
    pub(crate) fn new(store: std::sync::Arc<FakeArtifactStore>, behavior: ExportBehavior) -> Self {
        Self {
            store,
            behavior,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DatabaseExporter for FakeExporter {
    fn file_extension(&self) -> &str {
        "dump"
    }

    async fn export(&self, destination: &Path) -> Result<(), BackupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match self.behavior {
            ExportBehavior::Succeed => {
                self.store.write_file(destination, 128).await;
                Ok(())
            }
            ExportBehavior::FailAfterPartialWrite => {
                self.store.write_file(destination, 16).await;
                Err(BackupError::ExportFailed(
                    "pg_dump exited with status 1: connection reset".to_owned(),
                ))
            }
            ExportBehavior::Fail => Err(BackupError::ExportFailed(
                "pg_dump exited with status 1: role does not exist".to_owned(),
            )),
            ExportBehavior::Hang => {
                std::future::pending::<()>().await;
                Ok(())
            }
        }
    }
}

/// In-memory artifact tree keyed by path.
#[derive(Default)]
pub(crate) struct FakeArtifactStore {
    files: Mutex<Vec<(PathBuf, u64)>>,
    failing_removals: Mutex<Vec<PathBuf>>,
    fail_listing: Mutex<bool>,
    commit_delay: Mutex<Duration>,
}

impl FakeArtifactStore {
    pub(crate) fn tier_dir(tier: BackupTier) -> PathBuf {
        Path::new("/backups").join(tier.as_str())
    }

    pub(crate) async fn write_file(&self, path: &Path, size_bytes: u64) {
        let mut files = self.files.lock().await;
        files.retain(|(existing, _)| existing != path);
        files.push((path.to_path_buf(), size_bytes));
    }

    /// Stores a finished artifact as if an earlier run had produced it.
    pub(crate) async fn seed(
        &self,
        tier: BackupTier,
        created_at: DateTime<Utc>,
        size_bytes: u64,
    ) -> PathBuf {
        let file_name = doctero_domain::artifact_file_name(tier, created_at, "dump");
        let path = Self::tier_dir(tier).join(file_name);
        self.write_file(&path, size_bytes).await;
        path
    }

    pub(crate) async fn fail_removal_of(&self, path: &Path) {
        self.failing_removals.lock().await.push(path.to_path_buf());
    }

    /// Makes every commit take `delay` after the file has been moved.
    pub(crate) async fn slow_commit(&self, delay: Duration) {
        *self.commit_delay.lock().await = delay;
    }

    pub(crate) async fn fail_listing(&self) {
        *self.fail_listing.lock().await = true;
    }

    pub(crate) async fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self
            .files
            .lock()
            .await
            .iter()
            .map(|(path, _)| path.clone())
            .collect();
        paths.sort();
        paths
    }
}

#[async_trait]
impl ArtifactStore for FakeArtifactStore {
    async fn prepare(&self, tier: BackupTier, file_name: &str) -> Result<PathBuf, BackupError> {
        let final_path = Self::tier_dir(tier).join(file_name);
        if self.files.lock().await.iter().any(|(path, _)| *path == final_path) {
            return Err(BackupError::Io(format!(
                "{} already exists",
                final_path.display()
            )));
        }

        Ok(Self::tier_dir(tier).join(format!("{file_name}{STAGING_SUFFIX}")))
    }

    async fn commit(
        &self,
        tier: BackupTier,
        staging_path: &Path,
        file_name: &str,
    ) -> Result<BackupArtifact, BackupError> {
        let final_path = Self::tier_dir(tier).join(file_name);
        let size_bytes = {
            let mut files = self.files.lock().await;
            if files.iter().any(|(path, _)| *path == final_path) {
                return Err(BackupError::Io(format!(
                    "{} already exists",
                    final_path.display()
                )));
            }

            let Some(entry) = files.iter_mut().find(|(path, _)| path == staging_path) else {
                return Err(BackupError::Io(format!(
                    "{} not found",
                    staging_path.display()
                )));
            };
            entry.0 = final_path.clone();
            entry.1
        };

        let delay = *self.commit_delay.lock().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let name = parse_artifact_file_name(file_name)
            .ok_or_else(|| BackupError::Io(format!("unexpected artifact name {file_name}")))?;
        Ok(BackupArtifact::new(tier, name.created_at, final_path, size_bytes))
    }

    async fn discard(&self, path: &Path) -> Result<(), BackupError> {
        self.files.lock().await.retain(|(existing, _)| existing != path);
        Ok(())
    }

    async fn discard_committed(
        &self,
        tier: BackupTier,
        file_name: &str,
    ) -> Result<(), BackupError> {
        let final_path = Self::tier_dir(tier).join(file_name);
        self.files
            .lock()
            .await
            .retain(|(existing, _)| *existing != final_path);
        Ok(())
    }

    async fn list(&self, tier: BackupTier) -> Result<Vec<BackupArtifact>, BackupError> {
        if *self.fail_listing.lock().await {
            return Err(BackupError::Io("permission denied".to_owned()));
        }

        let dir = Self::tier_dir(tier);
        Ok(self
            .files
            .lock()
            .await
            .iter()
            .filter(|(path, _)| path.parent() == Some(dir.as_path()))
            .filter_map(|(path, size_bytes)| {
                let name = parse_artifact_file_name(path.file_name()?.to_str()?)?;
                (name.tier == tier)
                    .then(|| BackupArtifact::new(tier, name.created_at, path.clone(), *size_bytes))
            })
            .collect())
    }

    async fn remove(&self, artifact: &BackupArtifact) -> Result<(), BackupError> {
        if self
            .failing_removals
            .lock()
            .await
            .iter()
            .any(|path| path == artifact.file_path())
        {
            return Err(BackupError::Io(format!(
                "failed to remove {}: permission denied",
                artifact.file_path().display()
            )));
        }

        self.files
            .lock()
            .await
            .retain(|(path, _)| path != artifact.file_path());
        Ok(())
    }
}
