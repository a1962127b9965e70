//! Scheduled training day of a course.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One scheduled section (lesson day) of a course.
///
/// A date with at least one non-deleted section is a training day for the
/// course; the management view is aligned to these dates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// `None` until inserted.
    pub section_id: Option<i64>,
    pub course_id: i64,
    pub section_name: String,
    pub training_date: NaiveDate,
}

impl Section {
    pub fn new(course_id: i64, section_name: impl Into<String>, training_date: NaiveDate) -> Self {
        Self {
            section_id: None,
            course_id,
            section_name: section_name.into(),
            training_date,
        }
    }
}
