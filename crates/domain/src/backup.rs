use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use doctero_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Suffix appended to an artifact file name while the export is still running.
pub const STAGING_SUFFIX: &str = ".partial";

const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%S%.3fZ";
const TIMESTAMP_PARSE_FORMAT: &str = "%Y%m%dT%H%M%S%.f";

/// Backup tier. Each tier owns one directory under the backup root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupTier {
    /// Nightly backup.
    Daily,
    /// Weekly backup.
    Weekly,
    /// Monthly archive backup.
    Monthly,
    /// On-demand backup requested through the API.
    Manual,
}

impl BackupTier {
    /// Number of tiers.
    pub const COUNT: usize = 4;

    /// Every tier, in display order.
    pub const ALL: [Self; Self::COUNT] = [Self::Daily, Self::Weekly, Self::Monthly, Self::Manual];

    /// Returns the stable lowercase tier name used in paths and payloads.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Manual => "manual",
        }
    }

    /// Returns a dense index in `0..BackupTier::COUNT`.
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::Daily => 0,
            Self::Weekly => 1,
            Self::Monthly => 2,
            Self::Manual => 3,
        }
    }

    /// Returns whether the tier is driven by the scheduler.
    #[must_use]
    pub fn is_scheduled(self) -> bool {
        !matches!(self, Self::Manual)
    }
}

impl Display for BackupTier {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for BackupTier {
    type Err = AppError;

    fn from_str(value: &str) -> AppResult<Self> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|tier| tier.as_str() == normalized)
            .ok_or_else(|| {
                AppError::Validation(format!(
                    "unknown backup tier '{value}', expected one of: daily, weekly, monthly, manual"
                ))
            })
    }
}

/// One backup file produced by a backup run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupArtifact {
    tier: BackupTier,
    created_at: DateTime<Utc>,
    file_path: PathBuf,
    size_bytes: u64,
}

impl BackupArtifact {
    /// Creates artifact metadata.
    #[must_use]
    pub fn new(
        tier: BackupTier,
        created_at: DateTime<Utc>,
        file_path: impl Into<PathBuf>,
        size_bytes: u64,
    ) -> Self {
        Self {
            tier,
            created_at,
            file_path: file_path.into(),
            size_bytes,
        }
    }

    /// Returns the artifact tier.
    #[must_use]
    pub fn tier(&self) -> BackupTier {
        self.tier
    }

    /// Returns the creation instant encoded in the file name.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the artifact path.
    #[must_use]
    pub fn file_path(&self) -> &Path {
        self.file_path.as_path()
    }

    /// Returns the final path component, if it is valid UTF-8.
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.file_path.file_name().and_then(|name| name.to_str())
    }

    /// Returns the artifact size on disk.
    #[must_use]
    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// Returns the artifact age relative to `now`.
    #[must_use]
    pub fn age_at(&self, now: DateTime<Utc>) -> TimeDelta {
        now.signed_duration_since(self.created_at)
    }
}

/// Fields recovered from an artifact file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactName {
    /// Tier prefix.
    pub tier: BackupTier,
    /// Creation instant, millisecond precision.
    pub created_at: DateTime<Utc>,
    /// File extension without the leading dot.
    pub extension: String,
}

/// Builds the artifact file name `{tier}_{timestamp}.{extension}`.
///
/// The timestamp is UTC in ISO 8601 basic format with milliseconds, so names
/// sort chronologically and contain no characters that are invalid on common
/// filesystems.
#[must_use]
pub fn artifact_file_name(tier: BackupTier, created_at: DateTime<Utc>, extension: &str) -> String {
    format!(
        "{}_{}.{}",
        tier.as_str(),
        created_at.format(TIMESTAMP_FORMAT),
        extension.trim_start_matches('.')
    )
}

/// Parses a file name produced by [`artifact_file_name`].
///
/// Returns `None` for staging files and for names that do not follow the
/// artifact naming scheme.
#[must_use]
pub fn parse_artifact_file_name(file_name: &str) -> Option<ArtifactName> {
    if file_name.ends_with(STAGING_SUFFIX) {
        return None;
    }

    let (tier_part, rest) = file_name.split_once('_')?;
    let tier = BackupTier::ALL
        .into_iter()
        .find(|tier| tier.as_str() == tier_part)?;

    let (timestamp, extension) = rest.split_once("Z.")?;
    if extension.is_empty() {
        return None;
    }

    let created_at = NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_PARSE_FORMAT)
        .ok()?
        .and_utc();

    Some(ArtifactName {
        tier,
        created_at,
        extension: extension.to_owned(),
    })
}
