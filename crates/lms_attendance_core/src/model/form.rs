//! Attendance edit form model.
//!
//! # Responsibility
//! - Carry the per-day edit entries bound from (and rendered to) the
//!   attendance edit screen.
//!
//! # Invariants
//! - Time fields hold raw user input and may be invalid until validated.
//! - `training_start_time` / `training_end_time` are derived from the
//!   hour/minute selects by `join_entry_times` before validation.

use crate::model::attendance::{AttendanceId, AttendanceStatus};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One selectable option. `value = None` is the empty choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: Option<i32>,
    pub label: String,
}

impl SelectOption {
    pub fn new(value: Option<i32>, label: impl Into<String>) -> Self {
        Self {
            value,
            label: label.into(),
        }
    }
}

/// Whole-period attendance edit form for one student.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AttendanceForm {
    pub lms_user_id: i64,
    pub user_name: String,
    /// Student has left the course early.
    pub leave_flg: bool,
    pub leave_date: Option<NaiveDate>,
    pub disp_leave_date: Option<String>,
    pub blank_times: Vec<SelectOption>,
    pub hour_options: Vec<SelectOption>,
    pub minute_options: Vec<SelectOption>,
    pub attendance_list: Vec<DailyAttendanceEntry>,
}

/// One row of the edit form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyAttendanceEntry {
    #[serde(default)]
    pub student_attendance_id: Option<AttendanceId>,
    pub training_date: NaiveDate,
    #[serde(default)]
    pub training_start_time: String,
    #[serde(default)]
    pub training_end_time: String,
    #[serde(default)]
    pub training_start_hour: String,
    #[serde(default)]
    pub training_start_minute: String,
    #[serde(default)]
    pub training_end_hour: String,
    #[serde(default)]
    pub training_end_minute: String,
    #[serde(default)]
    pub blank_time: Option<i32>,
    #[serde(default)]
    pub blank_time_value: Option<String>,
    #[serde(default)]
    pub status: AttendanceStatus,
    #[serde(default)]
    pub status_disp_name: String,
    /// Day marked absent; status is not recomputed on save.
    #[serde(default)]
    pub absent: bool,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub section_name: String,
    #[serde(default)]
    pub is_today: bool,
    #[serde(default)]
    pub disp_training_date: String,
}

impl DailyAttendanceEntry {
    /// Blank entry for one date.
    pub fn new(training_date: NaiveDate) -> Self {
        Self {
            student_attendance_id: None,
            training_date,
            training_start_time: String::new(),
            training_end_time: String::new(),
            training_start_hour: String::new(),
            training_start_minute: String::new(),
            training_end_hour: String::new(),
            training_end_minute: String::new(),
            blank_time: None,
            blank_time_value: None,
            status: AttendanceStatus::None,
            status_disp_name: String::new(),
            absent: false,
            note: String::new(),
            section_name: String::new(),
            is_today: false,
            disp_training_date: String::new(),
        }
    }
}
