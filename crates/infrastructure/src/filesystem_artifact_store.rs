use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use doctero_application::ArtifactStore;
use doctero_domain::{
    BackupArtifact, BackupError, BackupTier, STAGING_SUFFIX, parse_artifact_file_name,
};
use tokio::fs;
use tracing::{debug, warn};

/// Artifact tree on the local filesystem, one directory per tier under a root.
#[derive(Debug, Clone)]
pub struct FilesystemArtifactStore {
    root: PathBuf,
}

impl FilesystemArtifactStore {
    /// Creates a store rooted at `root`. Directories are created on first use.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the backup root.
    #[must_use]
    pub fn root(&self) -> &Path {
        self.root.as_path()
    }

    fn tier_dir(&self, tier: BackupTier) -> PathBuf {
        self.root.join(tier.as_str())
    }
}

#[async_trait]
impl ArtifactStore for FilesystemArtifactStore {
    async fn prepare(&self, tier: BackupTier, file_name: &str) -> Result<PathBuf, BackupError> {
        let dir = self.tier_dir(tier);
        fs::create_dir_all(&dir).await.map_err(|error| {
            BackupError::io(format!("failed to create {}", dir.display()), &error)
        })?;

        let final_path = dir.join(file_name);
        match fs::try_exists(&final_path).await {
            Ok(false) => {}
            Ok(true) => {
                return Err(BackupError::Io(format!(
                    "{} already exists",
                    final_path.display()
                )));
            }
            Err(error) => {
                return Err(BackupError::io(
                    format!("failed to check {}", final_path.display()),
                    &error,
                ));
            }
        }

        Ok(dir.join(format!("{file_name}{STAGING_SUFFIX}")))
    }

    async fn commit(
        &self,
        tier: BackupTier,
        staging_path: &Path,
        file_name: &str,
    ) -> Result<BackupArtifact, BackupError> {
        let name = parse_artifact_file_name(file_name).ok_or_else(|| {
            BackupError::Io(format!("'{file_name}' is not a backup artifact name"))
        })?;
        let final_path = self.tier_dir(tier).join(file_name);

        match fs::try_exists(&final_path).await {
            Ok(false) => {}
            Ok(true) => {
                return Err(BackupError::Io(format!(
                    "{} already exists",
                    final_path.display()
                )));
            }
            Err(error) => {
                return Err(BackupError::io(
                    format!("failed to check {}", final_path.display()),
                    &error,
                ));
            }
        }

        fs::rename(staging_path, &final_path)
            .await
            .map_err(|error| {
                BackupError::io(
                    format!("failed to move backup to {}", final_path.display()),
                    &error,
                )
            })?;

        let size_bytes = match fs::metadata(&final_path).await {
            Ok(metadata) => metadata.len(),
            Err(error) => {
                if let Err(remove_error) = fs::remove_file(&final_path).await {
                    warn!(
                        file = %final_path.display(),
                        error = %remove_error,
                        "failed to remove unreadable backup"
                    );
                }
                return Err(BackupError::io(
                    format!("failed to read size of {}", final_path.display()),
                    &error,
                ));
            }
        };

        Ok(BackupArtifact::new(
            tier,
            name.created_at,
            final_path,
            size_bytes,
        ))
    }

    async fn discard(&self, path: &Path) -> Result<(), BackupError> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
            Err(error) => Err(BackupError::io(
                format!("failed to remove {}", path.display()),
                &error,
            )),
        }
    }

    async fn discard_committed(
        &self,
        tier: BackupTier,
        file_name: &str,
    ) -> Result<(), BackupError> {
        self.discard(&self.tier_dir(tier).join(file_name)).await
    }

    async fn list(&self, tier: BackupTier) -> Result<Vec<BackupArtifact>, BackupError> {
        let dir = self.tier_dir(tier);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(error) => {
                return Err(BackupError::io(
                    format!("failed to list {}", dir.display()),
                    &error,
                ));
            }
        };

        let mut artifacts = Vec::new();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(error) => {
                    return Err(BackupError::io(
                        format!("failed to list {}", dir.display()),
                        &error,
                    ));
                }
            };

            let file_name = entry.file_name();
            let Some(name) = file_name.to_str().and_then(parse_artifact_file_name) else {
                continue;
            };
            if name.tier != tier {
                continue;
            }

            let metadata = match entry.metadata().await {
                Ok(metadata) if metadata.is_file() => metadata,
                Ok(_) => continue,
                Err(error) => {
                    debug!(
                        file = %entry.path().display(),
                        error = %error,
                        "skipping backup that vanished during listing"
                    );
                    continue;
                }
            };

            artifacts.push(BackupArtifact::new(
                tier,
                name.created_at,
                entry.path(),
                metadata.len(),
            ));
        }

        Ok(artifacts)
    }

    async fn remove(&self, artifact: &BackupArtifact) -> Result<(), BackupError> {
        fs::remove_file(artifact.file_path())
            .await
            .map_err(|error| {
                BackupError::io(
                    format!("failed to remove {}", artifact.file_path().display()),
                    &error,
                )
            })
    }
}
