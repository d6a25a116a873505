//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod backup;
mod error;
mod retention;
mod schedule;

pub use backup::{
    ArtifactName, BackupArtifact, BackupTier, STAGING_SUFFIX, artifact_file_name,
    parse_artifact_file_name,
};
pub use error::BackupError;
pub use retention::{RetentionPolicies, RetentionWindow};
pub use schedule::{MAX_MONTHLY_DAY, ScheduleRule, ScheduleTrigger};
