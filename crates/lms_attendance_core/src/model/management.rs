//! Attendance management view model.
//!
//! # Responsibility
//! - Carry one calendar day of the management list: the scheduled section
//!   joined with the student's record for that day, if any.
//!
//! # Invariants
//! - Rows are ordered by `training_date` ascending, one per scheduled date.
//! - Record fields are blank/`None` for scheduled days without a record.

use crate::model::attendance::{AttendanceId, AttendanceStatus};
use crate::model::training_time::TrainingTime;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Denormalized row returned by the management query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceManagementRow {
    /// `None` when the student has no record for this scheduled day.
    pub student_attendance_id: Option<AttendanceId>,
    pub lms_user_id: i64,
    pub training_date: NaiveDate,
    pub section_name: String,
    pub training_start_time: TrainingTime,
    pub training_end_time: TrainingTime,
    pub blank_time: Option<i32>,
    /// `H:MM` rendering of `blank_time`, filled by the service.
    pub blank_time_value: Option<String>,
    pub status: AttendanceStatus,
    /// Filled by the service from `status`.
    pub status_disp_name: String,
    pub note: String,
    pub is_today: bool,
}

impl AttendanceManagementRow {
    pub fn has_record(&self) -> bool {
        self.student_attendance_id.is_some()
    }
}
