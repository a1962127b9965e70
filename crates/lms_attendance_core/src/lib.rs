//! Student attendance core for the LMS.
//! Punch-in/out, batch correction and tardy/early-leave derivation live here.

pub mod config;
pub mod context;
pub mod db;
pub mod logging;
pub mod message;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{AttendanceConfig, ConfigError};
pub use context::{CallerContext, Clock, FixedClock, SystemClock, UserRole};
pub use logging::{default_log_level, init_logging, logging_status};
pub use message::{DefaultMessages, MessageKey, MessageSource};
pub use model::attendance::{
    AttendanceId, AttendanceRecord, AttendanceStatus, AttendanceValidationError, NOTE_MAX_CHARS,
};
pub use model::form::{AttendanceForm, DailyAttendanceEntry, SelectOption};
pub use model::management::AttendanceManagementRow;
pub use model::section::Section;
pub use model::training_time::{TimeParseError, TrainingTime};
pub use repo::attendance_repo::{
    AttendanceRepository, RepoError, RepoResult, SqliteAttendanceRepository,
};
pub use repo::section_repo::{SectionRepository, SqliteSectionRepository};
pub use service::attendance_service::{
    join_entry_times, AttendanceService, PunchKind, PunchOutcome, ServiceError, ServiceResult,
};
pub use service::status::{derive_status, StatusDeriver};
pub use service::validation::{validate_entries, FieldError, ValidationReport, Violation};
