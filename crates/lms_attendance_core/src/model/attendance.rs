//! Student attendance domain model.
//!
//! # Responsibility
//! - Define the canonical per-day attendance record.
//! - Define the closed tardy/early-leave status and its persisted code.
//!
//! # Invariants
//! - At most one non-deleted record exists per (student, training date).
//! - `is_deleted` is the only deletion mechanism; rows are never hard-deleted.
//! - `training_end_time` is not earlier than `training_start_time` when both are set.
//! - `status` is a cache of the derived judgment, recomputed on every time write.

use crate::model::training_time::TrainingTime;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Maximum note length, counted in characters.
pub const NOTE_MAX_CHARS: usize = 100;

/// Stable identifier of a persisted attendance record.
pub type AttendanceId = Uuid;

/// Tardy/early-leave judgment for one training day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    /// On time, or not judgeable.
    #[default]
    None,
    /// Started after business start.
    Tardy,
    /// Ended before business end.
    LeavingEarly,
    /// Both of the above.
    TardyAndLeavingEarly,
}

impl AttendanceStatus {
    /// Combines the two independent judgments.
    pub fn from_flags(tardy: bool, leaving_early: bool) -> Self {
        match (tardy, leaving_early) {
            (false, false) => Self::None,
            (true, false) => Self::Tardy,
            (false, true) => Self::LeavingEarly,
            (true, true) => Self::TardyAndLeavingEarly,
        }
    }

    /// Persisted integer code.
    pub fn code(self) -> i64 {
        match self {
            Self::None => 0,
            Self::Tardy => 1,
            Self::LeavingEarly => 2,
            Self::TardyAndLeavingEarly => 3,
        }
    }

    /// Inverse of [`AttendanceStatus::code`].
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::None),
            1 => Some(Self::Tardy),
            2 => Some(Self::LeavingEarly),
            3 => Some(Self::TardyAndLeavingEarly),
            _ => None,
        }
    }

    /// Short label shown in the management list. Empty for `None`.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::None => "",
            Self::Tardy => "Tardy",
            Self::LeavingEarly => "Left early",
            Self::TardyAndLeavingEarly => "Tardy / left early",
        }
    }
}

/// Record-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttendanceValidationError {
    NoteTooLong { chars: usize, max: usize },
    NegativeBlankTime(i32),
    EndBeforeStart { start: TrainingTime, end: TrainingTime },
}

impl Display for AttendanceValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoteTooLong { chars, max } => {
                write!(f, "note has {chars} characters; at most {max} allowed")
            }
            Self::NegativeBlankTime(minutes) => {
                write!(f, "blank time must not be negative, got {minutes}")
            }
            Self::EndBeforeStart { start, end } => {
                write!(f, "end time {end} is earlier than start time {start}")
            }
        }
    }
}

impl Error for AttendanceValidationError {}

/// One student's attendance on one training date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    /// `None` until the record has been inserted.
    pub student_attendance_id: Option<AttendanceId>,
    pub lms_user_id: i64,
    pub account_id: i64,
    pub training_date: NaiveDate,
    pub training_start_time: TrainingTime,
    pub training_end_time: TrainingTime,
    /// Break minutes taken during the day.
    pub blank_time: Option<i32>,
    pub status: AttendanceStatus,
    pub note: String,
    pub is_deleted: bool,
    pub first_create_user: i64,
    pub first_create_date: NaiveDateTime,
    pub last_modified_user: i64,
    pub last_modified_date: NaiveDateTime,
}

impl AttendanceRecord {
    /// Creates an empty, not-yet-persisted record for one day.
    ///
    /// Audit fields are stamped with `actor` at `now`.
    pub fn new(
        lms_user_id: i64,
        account_id: i64,
        training_date: NaiveDate,
        actor: i64,
        now: NaiveDateTime,
    ) -> Self {
        Self {
            student_attendance_id: None,
            lms_user_id,
            account_id,
            training_date,
            training_start_time: TrainingTime::blank(),
            training_end_time: TrainingTime::blank(),
            blank_time: None,
            status: AttendanceStatus::None,
            note: String::new(),
            is_deleted: false,
            first_create_user: actor,
            first_create_date: now,
            last_modified_user: actor,
            last_modified_date: now,
        }
    }

    /// Returns whether the record still needs an insert.
    pub fn is_new(&self) -> bool {
        self.student_attendance_id.is_none()
    }

    pub fn is_punched_in(&self) -> bool {
        self.training_start_time.is_not_blank()
    }

    pub fn is_punched_out(&self) -> bool {
        self.training_end_time.is_not_blank()
    }

    /// Stamps last-modified audit fields.
    pub fn touch(&mut self, actor: i64, now: NaiveDateTime) {
        self.last_modified_user = actor;
        self.last_modified_date = now;
    }

    pub fn soft_delete(&mut self) {
        self.is_deleted = true;
    }

    pub fn restore(&mut self) {
        self.is_deleted = false;
    }

    /// Checks record-level invariants before persistence.
    pub fn validate(&self) -> Result<(), AttendanceValidationError> {
        let chars = self.note.chars().count();
        if chars > NOTE_MAX_CHARS {
            return Err(AttendanceValidationError::NoteTooLong {
                chars,
                max: NOTE_MAX_CHARS,
            });
        }

        if let Some(minutes) = self.blank_time {
            if minutes < 0 {
                return Err(AttendanceValidationError::NegativeBlankTime(minutes));
            }
        }

        if self.is_punched_in()
            && self.is_punched_out()
            && self.training_end_time < self.training_start_time
        {
            return Err(AttendanceValidationError::EndBeforeStart {
                start: self.training_start_time,
                end: self.training_end_time,
            });
        }

        Ok(())
    }
}
