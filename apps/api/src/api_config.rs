use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono::{FixedOffset, Local, Offset};
use doctero_application::BackupTimeouts;
use doctero_core::AppError;
use doctero_domain::{
    BackupTier, RetentionPolicies, RetentionWindow, ScheduleRule, ScheduleTrigger,
};
use doctero_infrastructure::PgDumpConfig;
use tracing_subscriber::EnvFilter;

/// Connection settings of the database being backed up.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: Option<String>,
}

/// Runtime configuration read from the environment.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub api_host: String,
    pub api_port: u16,
    pub frontend_url: String,
    pub database: DatabaseConfig,
    pub backup_root: PathBuf,
    pub pg_dump_path: PathBuf,
    pub timeouts: BackupTimeouts,
    pub scheduler_enabled: bool,
    pub triggers: Vec<ScheduleTrigger>,
    pub schedule_offset: FixedOffset,
    pub retention: RetentionPolicies,
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from a variable lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = EnvReader { lookup };

        let database = DatabaseConfig {
            host: env.string_or("DB_HOST", "localhost"),
            port: env.parsed_or("DB_PORT", 5432)?,
            name: env.string_or("DB_NAME", "doctero_db"),
            user: env.string_or("DB_USER", "postgres"),
            password: env.optional("DB_PASSWORD"),
        };

        let timeouts = BackupTimeouts {
            export: env.seconds_or("BACKUP_EXPORT_TIMEOUT_SECONDS", 1_800)?,
            io: env.seconds_or("BACKUP_IO_TIMEOUT_SECONDS", 30)?,
        };

        let triggers = vec![
            env.trigger(BackupTier::Daily, "BACKUP_DAILY_AT", "02:00")?,
            env.trigger(BackupTier::Weekly, "BACKUP_WEEKLY_AT", "sun 03:00")?,
            env.trigger(BackupTier::Monthly, "BACKUP_MONTHLY_AT", "1 04:00")?,
        ];

        let schedule_offset = match env.optional("BACKUP_SCHEDULE_UTC_OFFSET") {
            Some(value) => parse_utc_offset(&value)?,
            None => Local::now().offset().fix(),
        };

        let retention = RetentionPolicies::default()
            .with_window(
                BackupTier::Daily,
                Some(
                    RetentionWindow::Days(env.parsed_or("BACKUP_RETENTION_DAILY_DAYS", 30)?)
                        .validated()?,
                ),
            )
            .with_window(
                BackupTier::Weekly,
                Some(
                    RetentionWindow::Weeks(env.parsed_or("BACKUP_RETENTION_WEEKLY_WEEKS", 12)?)
                        .validated()?,
                ),
            )
            .with_window(
                BackupTier::Monthly,
                Some(
                    RetentionWindow::Months(
                        env.parsed_or("BACKUP_RETENTION_MONTHLY_MONTHS", 24)?,
                    )
                    .validated()?,
                ),
            );

        Ok(Self {
            api_host: env.string_or("API_HOST", "127.0.0.1"),
            api_port: env.parsed_or("API_PORT", 5001)?,
            frontend_url: env.string_or("FRONTEND_URL", "http://localhost:3000"),
            database,
            backup_root: PathBuf::from(env.string_or("BACKUP_ROOT", "backups")),
            pg_dump_path: PathBuf::from(env.string_or("PG_DUMP_PATH", "pg_dump")),
            timeouts,
            scheduler_enabled: env.flag_or("BACKUP_SCHEDULER_ENABLED", true)?,
            triggers,
            schedule_offset,
            retention,
        })
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Validation(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;

        Ok(SocketAddr::from((host, self.api_port)))
    }

    pub fn pg_dump_config(&self) -> PgDumpConfig {
        PgDumpConfig {
            program: self.pg_dump_path.clone(),
            host: self.database.host.clone(),
            port: self.database.port,
            database: self.database.name.clone(),
            username: self.database.user.clone(),
            password: self.database.password.clone(),
        }
    }
}

struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
    }

    fn string_or(&self, name: &str, default: &str) -> String {
        self.optional(name).unwrap_or_else(|| default.to_owned())
    }

    fn parsed_or<T>(&self, name: &str, default: T) -> Result<T, AppError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.optional(name)
            .map(|value| {
                value
                    .parse::<T>()
                    .map_err(|error| AppError::Validation(format!("invalid {name}: {error}")))
            })
            .transpose()
            .map(|value| value.unwrap_or(default))
    }

    fn seconds_or(&self, name: &str, default: u64) -> Result<Duration, AppError> {
        let seconds = self.parsed_or(name, default)?;
        if seconds == 0 {
            return Err(AppError::Validation(format!(
                "{name} must be greater than zero"
            )));
        }

        Ok(Duration::from_secs(seconds))
    }

    fn flag_or(&self, name: &str, default: bool) -> Result<bool, AppError> {
        let Some(value) = self.optional(name) else {
            return Ok(default);
        };

        match value.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(AppError::Validation(format!(
                "{name} must be true or false, got '{value}'"
            ))),
        }
    }

    fn trigger(
        &self,
        tier: BackupTier,
        name: &str,
        default: &str,
    ) -> Result<ScheduleTrigger, AppError> {
        let rule = self
            .string_or(name, default)
            .parse::<ScheduleRule>()
            .map_err(|error| match error {
                AppError::Validation(message) => AppError::Validation(format!("{name}: {message}")),
                other => other,
            })?;

        ScheduleTrigger::new(tier, rule)
    }
}

/// Parses `Z`, `UTC` or a signed `HH:MM` offset such as `+05:30`.
fn parse_utc_offset(value: &str) -> Result<FixedOffset, AppError> {
    let invalid = || {
        AppError::Validation(format!(
            "invalid BACKUP_SCHEDULE_UTC_OFFSET '{value}', expected e.g. +05:30 or UTC"
        ))
    };

    if value.eq_ignore_ascii_case("z") || value.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0).ok_or_else(invalid);
    }

    let (sign, rest) = match value.as_bytes().first() {
        Some(b'+') => (1, &value[1..]),
        Some(b'-') => (-1, &value[1..]),
        _ => return Err(invalid()),
    };
    let (hours, minutes) = rest.split_once(':').ok_or_else(invalid)?;
    let hours = hours.parse::<i32>().map_err(|_| invalid())?;
    let minutes = minutes.parse::<i32>().map_err(|_| invalid())?;
    if !(0..=23).contains(&hours) || !(0..=59).contains(&minutes) {
        return Err(invalid());
    }

    FixedOffset::east_opt(sign * (hours * 3_600 + minutes * 60)).ok_or_else(invalid)
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}
