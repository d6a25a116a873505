//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod filesystem_artifact_store;
mod pg_dump_exporter;

pub use filesystem_artifact_store::FilesystemArtifactStore;
pub use pg_dump_exporter::{PgDumpConfig, PgDumpExporter};
