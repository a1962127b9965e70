//! Edit-form field validation.
//!
//! # Responsibility
//! - Check every daily entry of an edit form.
//! - Record field-keyed errors for re-rendering the form.
//! - Collapse violations into one summary message per category.
//!
//! # Invariants
//! - Summary messages are deduplicated by category and ordered by category,
//!   never by row.
//! - Blank start and end times are valid (day not entered yet).

use crate::model::form::DailyAttendanceEntry;
use crate::model::training_time::TrainingTime;
use crate::message::{MessageKey, MessageSource};
use crate::service::form_options::is_blank_time_choice;
use std::collections::BTreeSet;

/// Error attached to one form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Bound field path, e.g. `attendanceList[3].trainingStartHour`.
    pub field: String,
    pub message: String,
}

/// Violation categories, in summary order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Violation {
    NoteTooLong,
    InvalidStartTime,
    InvalidEndTime,
    InvalidBlankTime,
    PunchInEmpty,
    TimeRange,
}

/// Outcome of validating an edit form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub field_errors: Vec<FieldError>,
    pub violations: BTreeSet<Violation>,
    /// One message per violated category.
    pub messages: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    /// Messages attached to `field`.
    pub fn errors_for<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.field_errors
            .iter()
            .filter(move |error| error.field == field)
            .map(|error| error.message.as_str())
    }

    pub fn has_field_error(&self, field: &str) -> bool {
        self.errors_for(field).next().is_some()
    }

    fn push(&mut self, field: String, message: String) {
        self.field_errors.push(FieldError { field, message });
    }
}

/// Field path of entry `index`.
pub fn entry_field(index: usize, field: &str) -> String {
    format!("attendanceList[{index}].{field}")
}

/// Validates all entries and builds the report.
pub fn validate_entries<M: MessageSource + ?Sized>(
    entries: &[DailyAttendanceEntry],
    messages: &M,
    note_max_chars: usize,
) -> ValidationReport {
    let mut report = ValidationReport::default();
    let note_label = messages.message(MessageKey::LabelNote, &[]);
    let start_label = messages.message(MessageKey::LabelStartTime, &[]);
    let end_label = messages.message(MessageKey::LabelEndTime, &[]);
    let max_text = note_max_chars.to_string();

    for (index, entry) in entries.iter().enumerate() {
        if entry.note.chars().count() > note_max_chars {
            report.push(
                entry_field(index, "note"),
                messages.message(
                    MessageKey::MaxLength,
                    &[note_label.as_str(), max_text.as_str()],
                ),
            );
            report.violations.insert(Violation::NoteTooLong);
        }

        let start = TrainingTime::parse(&entry.training_start_time);
        if start.is_err() {
            let field = incomplete_field(
                &entry.training_start_hour,
                &entry.training_start_minute,
                "trainingStartHour",
                "trainingStartMinute",
            );
            report.push(
                entry_field(index, field),
                messages.message(MessageKey::InputInvalid, &[start_label.as_str()]),
            );
            report.violations.insert(Violation::InvalidStartTime);
        }

        let end = TrainingTime::parse(&entry.training_end_time);
        if end.is_err() {
            let field = incomplete_field(
                &entry.training_end_hour,
                &entry.training_end_minute,
                "trainingEndHour",
                "trainingEndMinute",
            );
            report.push(
                entry_field(index, field),
                messages.message(MessageKey::InputInvalid, &[end_label.as_str()]),
            );
            report.violations.insert(Violation::InvalidEndTime);
        }

        if entry
            .blank_time
            .is_some_and(|minutes| !is_blank_time_choice(minutes))
        {
            report.push(
                entry_field(index, "blankTime"),
                messages.message(MessageKey::BlankTimeInvalid, &[]),
            );
            report.violations.insert(Violation::InvalidBlankTime);
        }

        if entry.training_start_time.trim().is_empty() && !entry.training_end_time.trim().is_empty()
        {
            let message = messages.message(MessageKey::PunchInEmpty, &[]);
            report.push(entry_field(index, "trainingStartHour"), message.clone());
            report.push(entry_field(index, "trainingEndHour"), message);
            report.violations.insert(Violation::PunchInEmpty);
        }

        if let (Ok(start), Ok(end)) = (start, end) {
            if start.is_not_blank() && end.is_not_blank() && end < start {
                report.push(
                    entry_field(index, "trainingEndHour"),
                    messages.message(MessageKey::TrainingTimeRange, &[]),
                );
                report.violations.insert(Violation::TimeRange);
            }
        }
    }

    report.messages = report
        .violations
        .iter()
        .map(|violation| match violation {
            Violation::NoteTooLong => messages.message(
                MessageKey::MaxLength,
                &[note_label.as_str(), max_text.as_str()],
            ),
            Violation::InvalidStartTime => {
                messages.message(MessageKey::InputInvalid, &[start_label.as_str()])
            }
            Violation::InvalidEndTime => {
                messages.message(MessageKey::InputInvalid, &[end_label.as_str()])
            }
            Violation::InvalidBlankTime => messages.message(MessageKey::BlankTimeInvalid, &[]),
            Violation::PunchInEmpty => messages.message(MessageKey::PunchInEmpty, &[]),
            Violation::TimeRange => messages.message(MessageKey::TrainingTimeRange, &[]),
        })
        .collect();

    report
}

// The blank select is the one to highlight; both filled means the pair itself is bad.
fn incomplete_field<'a>(
    hour: &str,
    minute: &str,
    hour_field: &'a str,
    minute_field: &'a str,
) -> &'a str {
    if hour.trim().is_empty() {
        hour_field
    } else if minute.trim().is_empty() {
        minute_field
    } else {
        hour_field
    }
}
