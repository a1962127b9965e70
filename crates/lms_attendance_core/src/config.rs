//! Runtime configuration.
//!
//! # Responsibility
//! - Hold business hours, form limits, storage and logging locations.
//! - Load overrides from the process environment (and `.env`).
//!
//! # Invariants
//! - Loading never panics; malformed values surface as `ConfigError`.
//! - Unset variables keep their defaults.

use crate::logging::default_log_level;
use crate::model::attendance::NOTE_MAX_CHARS;
use crate::model::training_time::TrainingTime;
use crate::service::status::StatusDeriver;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const ENV_WORK_START: &str = "LMS_ATTENDANCE_WORK_START";
pub const ENV_WORK_END: &str = "LMS_ATTENDANCE_WORK_END";
pub const ENV_NOTE_MAX_CHARS: &str = "LMS_ATTENDANCE_NOTE_MAX_CHARS";
pub const ENV_DATABASE_PATH: &str = "LMS_ATTENDANCE_DATABASE_PATH";
pub const ENV_LOG_LEVEL: &str = "LMS_ATTENDANCE_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "LMS_ATTENDANCE_LOG_DIR";

const DEFAULT_DATABASE_FILE: &str = "lms_attendance.sqlite3";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { key, value, reason } => {
                write!(f, "invalid value `{value}` for {key}: {reason}")
            }
        }
    }
}

impl Error for ConfigError {}

/// Attendance runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceConfig {
    /// Business start. Blank disables tardy/early-leave judgment.
    pub work_start: TrainingTime,
    /// Business end. Blank disables tardy/early-leave judgment.
    pub work_end: TrainingTime,
    pub note_max_chars: usize,
    pub database_path: PathBuf,
    pub log_level: String,
    /// Absolute directory for rolling log files; logging is off when unset.
    pub log_dir: Option<PathBuf>,
}

impl Default for AttendanceConfig {
    fn default() -> Self {
        let deriver = StatusDeriver::default();
        Self {
            work_start: deriver.work_start(),
            work_end: deriver.work_end(),
            note_max_chars: NOTE_MAX_CHARS,
            database_path: PathBuf::from(DEFAULT_DATABASE_FILE),
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl AttendanceConfig {
    /// Reads `.env` when present, then the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_WORK_START) {
            config.work_start = parse_time(ENV_WORK_START, &value)?;
        }
        if let Some(value) = lookup(ENV_WORK_END) {
            config.work_end = parse_time(ENV_WORK_END, &value)?;
        }
        if let Some(value) = lookup(ENV_NOTE_MAX_CHARS) {
            let parsed = value
                .trim()
                .parse::<usize>()
                .map_err(|err| invalid(ENV_NOTE_MAX_CHARS, &value, err.to_string()))?;
            if parsed == 0 || parsed > NOTE_MAX_CHARS {
                return Err(invalid(
                    ENV_NOTE_MAX_CHARS,
                    &value,
                    format!("expected 1..={NOTE_MAX_CHARS}"),
                ));
            }
            config.note_max_chars = parsed;
        }
        if let Some(value) = lookup(ENV_DATABASE_PATH).filter(|value| !value.trim().is_empty()) {
            config.database_path = PathBuf::from(value.trim());
        }
        if let Some(value) = lookup(ENV_LOG_LEVEL).filter(|value| !value.trim().is_empty()) {
            config.log_level = value.trim().to_string();
        }
        if let Some(value) = lookup(ENV_LOG_DIR).filter(|value| !value.trim().is_empty()) {
            config.log_dir = Some(PathBuf::from(value.trim()));
        }

        Ok(config)
    }

    pub fn status_deriver(&self) -> StatusDeriver {
        StatusDeriver::new(self.work_start, self.work_end)
    }
}

fn parse_time(key: &'static str, value: &str) -> Result<TrainingTime, ConfigError> {
    TrainingTime::parse(value).map_err(|err| invalid(key, value, err.to_string()))
}

fn invalid(key: &'static str, value: &str, reason: String) -> ConfigError {
    ConfigError::InvalidValue {
        key,
        value: value.to_string(),
        reason,
    }
}
