use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use doctero_application::DatabaseExporter;
use doctero_domain::BackupError;
use tokio::process::Command;
use tracing::debug;

const STDERR_TAIL_BYTES: usize = 2_048;

/// Connection settings passed to `pg_dump`.
#[derive(Clone)]
pub struct PgDumpConfig {
    /// Path or name of the `pg_dump` executable.
    pub program: PathBuf,
    /// Database host.
    pub host: String,
    /// Database port.
    pub port: u16,
    /// Database name.
    pub database: String,
    /// Database role.
    pub username: String,
    /// Password handed over through `PGPASSWORD`. `None` defers to `.pgpass`.
    pub password: Option<String>,
}

impl std::fmt::Debug for PgDumpConfig {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("PgDumpConfig")
            .field("program", &self.program)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Exports the whole database in `pg_dump` custom format.
#[derive(Debug, Clone)]
pub struct PgDumpExporter {
    config: PgDumpConfig,
}

impl PgDumpExporter {
    /// Creates an exporter for the configured database.
    #[must_use]
    pub fn new(config: PgDumpConfig) -> Self {
        Self { config }
    }

    fn command(&self, destination: &Path) -> Command {
        let mut command = Command::new(&self.config.program);
        command
            .arg("--host")
            .arg(&self.config.host)
            .arg("--port")
            .arg(self.config.port.to_string())
            .arg("--username")
            .arg(&self.config.username)
            .arg("--dbname")
            .arg(&self.config.database)
            .arg("--format=custom")
            .arg("--no-password")
            .arg("--file")
            .arg(destination)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(password) = &self.config.password {
            command.env("PGPASSWORD", password);
        }

        command
    }
}

#[async_trait]
impl DatabaseExporter for PgDumpExporter {
    fn file_extension(&self) -> &str {
        "dump"
    }

    async fn export(&self, destination: &Path) -> Result<(), BackupError> {
        debug!(
            program = %self.config.program.display(),
            database = %self.config.database,
            file = %destination.display(),
            "spawning pg_dump"
        );

        let child = self.command(destination).spawn().map_err(|error| {
            BackupError::ExportFailed(format!(
                "failed to start {}: {error}",
                self.config.program.display()
            ))
        })?;

        let output = child.wait_with_output().await.map_err(|error| {
            BackupError::ExportFailed(format!("failed to wait for pg_dump: {error}"))
        })?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = stderr_tail(&output.stderr);
        Err(BackupError::ExportFailed(if stderr.is_empty() {
            format!("pg_dump exited with {}", output.status)
        } else {
            format!("pg_dump exited with {}: {stderr}", output.status)
        }))
    }
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let trimmed = text.trim();
    let start = trimmed
        .char_indices()
        .map(|(index, _)| index)
        .find(|index| trimmed.len() - index <= STDERR_TAIL_BYTES)
        .unwrap_or(trimmed.len());
    trimmed[start..].to_owned()
}
