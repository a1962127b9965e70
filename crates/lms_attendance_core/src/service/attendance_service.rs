//! Student attendance use-case service.
//!
//! # Responsibility
//! - Gate and record punch-in / punch-out for the current training day.
//! - Load the management list and reshape it into the edit form.
//! - Validate and persist batch edits of the edit form.
//!
//! # Invariants
//! - Business-rule violations are returned as messages, never as errors.
//! - Rejected punches perform no write.
//! - Batch save validates every planned record before the first write,
//!   writes at most one record per training date, and persists all of them
//!   in one transaction.
//! - Service layer remains storage-agnostic.

use crate::context::{CallerContext, Clock, SystemClock};
use crate::message::{DefaultMessages, MessageKey, MessageSource};
use crate::model::attendance::{AttendanceRecord, AttendanceValidationError, NOTE_MAX_CHARS};
use crate::model::form::{AttendanceForm, DailyAttendanceEntry};
use crate::model::management::AttendanceManagementRow;
use crate::model::training_time::{TimeParseError, TrainingTime};
use crate::repo::attendance_repo::{AttendanceRepository, RepoError};
use crate::repo::section_repo::SectionRepository;
use crate::service::form_options::{
    blank_time_options, blank_time_value, hour_options, join_hour_minute, minute_options,
    split_hour_minute,
};
use crate::service::status::StatusDeriver;
use crate::service::validation::{validate_entries, ValidationReport};
use chrono::NaiveDate;
use log::{info, warn};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

const DISPLAY_DATE_FORMAT: &str = "%Y-%m-%d (%a)";
const DISPLAY_LEAVE_DATE_FORMAT: &str = "%B %-d, %Y";

/// Which punch button was pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PunchKind {
    In,
    Out,
}

impl PunchKind {
    fn event(self) -> &'static str {
        match self {
            Self::In => "punch_in",
            Self::Out => "punch_out",
        }
    }
}

/// Result of a punch request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PunchOutcome {
    /// Written; carries the completion notice.
    Recorded(String),
    /// Refused by a business rule; nothing was written.
    Rejected(String),
}

impl PunchOutcome {
    pub fn is_recorded(&self) -> bool {
        matches!(self, Self::Recorded(_))
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Recorded(message) | Self::Rejected(message) => message,
        }
    }
}

/// Infrastructure failures of attendance use-cases.
#[derive(Debug)]
pub enum ServiceError {
    /// Persistence-layer failure.
    Repo(RepoError),
    /// An entry reached the save path with unparseable time text.
    InvalidTime {
        training_date: NaiveDate,
        source: TimeParseError,
    },
    /// A planned record breaks a record invariant; nothing was written.
    InvalidRecord {
        training_date: NaiveDate,
        source: AttendanceValidationError,
    },
    /// Internal consistency mismatch between check and write.
    InconsistentState(&'static str),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            Self::InvalidTime {
                training_date,
                source,
            } => write!(f, "invalid time for {training_date}: {source}"),
            Self::InvalidRecord {
                training_date,
                source,
            } => write!(f, "invalid attendance for {training_date}: {source}"),
            Self::InconsistentState(details) => {
                write!(f, "inconsistent attendance state: {details}")
            }
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::InvalidTime { source, .. } => Some(source),
            Self::InvalidRecord { source, .. } => Some(source),
            Self::InconsistentState(_) => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Attendance service facade over repository implementations.
pub struct AttendanceService<R, S, M = DefaultMessages, C = SystemClock>
where
    R: AttendanceRepository,
    S: SectionRepository,
    M: MessageSource,
    C: Clock,
{
    attendance: R,
    sections: S,
    messages: M,
    clock: C,
    deriver: StatusDeriver,
    note_max_chars: usize,
}

impl<R, S, M, C> AttendanceService<R, S, M, C>
where
    R: AttendanceRepository,
    S: SectionRepository,
    M: MessageSource,
    C: Clock,
{
    /// Creates a service with default business hours (09:00-18:00).
    pub fn new(attendance: R, sections: S, messages: M, clock: C) -> Self {
        Self {
            attendance,
            sections,
            messages,
            clock,
            deriver: StatusDeriver::default(),
            note_max_chars: NOTE_MAX_CHARS,
        }
    }

    /// Replaces the business hours used for status derivation.
    pub fn with_status_deriver(mut self, deriver: StatusDeriver) -> Self {
        self.deriver = deriver;
        self
    }

    /// Lowers the note limit for form validation. Values above
    /// `NOTE_MAX_CHARS` are clamped, since records cannot hold longer notes.
    pub fn with_note_max_chars(mut self, note_max_chars: usize) -> Self {
        self.note_max_chars = note_max_chars.min(NOTE_MAX_CHARS);
        self
    }

    /// Checks whether `ctx` may punch now.
    ///
    /// Returns `None` when allowed, otherwise the localized reason.
    pub fn punch_check(
        &self,
        ctx: &CallerContext,
        kind: PunchKind,
    ) -> ServiceResult<Option<String>> {
        if !ctx.is_student() {
            return Ok(Some(self.messages.message(MessageKey::Authorization, &[])));
        }

        let now = self.clock.now();
        let training_date = now.date();
        if self.sections.count_sections_on(ctx.course_id, training_date)? == 0 {
            return Ok(Some(self.messages.message(MessageKey::NotWorkDay, &[])));
        }

        let existing = self
            .attendance
            .find_by_user_and_date(ctx.lms_user_id, training_date)?;
        let rejection = match (kind, existing) {
            (PunchKind::In, Some(record)) if record.is_punched_in() => {
                Some(MessageKey::PunchAlreadyExists)
            }
            (PunchKind::In, Some(record))
                if record.is_punched_out()
                    && record.training_end_time < TrainingTime::from_datetime(now) =>
            {
                Some(MessageKey::TrainingTimeRange)
            }
            (PunchKind::In, _) => None,
            (PunchKind::Out, None) => Some(MessageKey::PunchInEmpty),
            (PunchKind::Out, Some(record)) if !record.is_punched_in() => {
                Some(MessageKey::PunchInEmpty)
            }
            (PunchKind::Out, Some(record)) if record.is_punched_out() => {
                Some(MessageKey::PunchAlreadyExists)
            }
            (PunchKind::Out, Some(record)) => {
                if record.training_start_time > TrainingTime::from_datetime(now) {
                    Some(MessageKey::TrainingTimeRange)
                } else {
                    None
                }
            }
        };

        Ok(rejection.map(|key| self.messages.message(key, &[])))
    }

    /// Records today's start time for a student.
    pub fn punch_in(&self, ctx: &CallerContext) -> ServiceResult<PunchOutcome> {
        if let Some(message) = self.punch_check(ctx, PunchKind::In)? {
            return Ok(self.rejected(ctx, PunchKind::In, message));
        }

        let now = self.clock.now();
        let start = TrainingTime::from_datetime(now);
        let status = self.deriver.derive(start, TrainingTime::blank());

        match self
            .attendance
            .find_by_user_and_date(ctx.lms_user_id, now.date())?
        {
            Some(mut record) => {
                record.training_start_time = start;
                record.status = status;
                record.restore();
                record.touch(ctx.lms_user_id, now);
                self.attendance.update(&record)?;
            }
            None => {
                let mut record = AttendanceRecord::new(
                    ctx.lms_user_id,
                    ctx.account_id,
                    now.date(),
                    ctx.lms_user_id,
                    now,
                );
                record.training_start_time = start;
                record.status = status;
                self.attendance.insert(&record)?;
            }
        }

        info!(
            "event=punch_in module=attendance status=ok lms_user_id={} training_date={} start={} attendance_status={:?}",
            ctx.lms_user_id,
            now.date(),
            start,
            status
        );
        Ok(PunchOutcome::Recorded(
            self.messages.message(MessageKey::UpdateNotice, &[]),
        ))
    }

    /// Records today's end time for a student who has punched in.
    pub fn punch_out(&self, ctx: &CallerContext) -> ServiceResult<PunchOutcome> {
        if let Some(message) = self.punch_check(ctx, PunchKind::Out)? {
            return Ok(self.rejected(ctx, PunchKind::Out, message));
        }

        let now = self.clock.now();
        let mut record = self
            .attendance
            .find_by_user_and_date(ctx.lms_user_id, now.date())?
            .ok_or(ServiceError::InconsistentState(
                "punch-in record vanished after check",
            ))?;

        let end = TrainingTime::from_datetime(now);
        record.training_end_time = end;
        record.status = self.deriver.derive(record.training_start_time, end);
        record.restore();
        record.touch(ctx.lms_user_id, now);
        self.attendance.update(&record)?;

        info!(
            "event=punch_out module=attendance status=ok lms_user_id={} training_date={} end={} attendance_status={:?}",
            ctx.lms_user_id,
            now.date(),
            end,
            record.status
        );
        Ok(PunchOutcome::Recorded(
            self.messages.message(MessageKey::UpdateNotice, &[]),
        ))
    }

    /// Loads the calendar-aligned management list with display fields filled.
    pub fn get_attendance_management(
        &self,
        course_id: i64,
        lms_user_id: i64,
    ) -> ServiceResult<Vec<AttendanceManagementRow>> {
        let mut rows =
            self.attendance
                .attendance_management(course_id, lms_user_id, self.clock.today())?;
        for row in &mut rows {
            row.blank_time_value = row.blank_time.map(blank_time_value);
            row.status_disp_name = row.status.display_name().to_string();
        }
        Ok(rows)
    }

    /// Reshapes management rows into the edit form of `ctx`.
    pub fn build_attendance_form(
        &self,
        ctx: &CallerContext,
        rows: &[AttendanceManagementRow],
    ) -> AttendanceForm {
        let attendance_list = rows
            .iter()
            .map(|row| {
                let (start_hour, start_minute) = split_hour_minute(row.training_start_time);
                let (end_hour, end_minute) = split_hour_minute(row.training_end_time);
                DailyAttendanceEntry {
                    student_attendance_id: row.student_attendance_id,
                    training_date: row.training_date,
                    training_start_time: row.training_start_time.formatted(),
                    training_end_time: row.training_end_time.formatted(),
                    training_start_hour: start_hour,
                    training_start_minute: start_minute,
                    training_end_hour: end_hour,
                    training_end_minute: end_minute,
                    blank_time: row.blank_time,
                    blank_time_value: row.blank_time.map(blank_time_value),
                    status: row.status,
                    status_disp_name: row.status.display_name().to_string(),
                    absent: false,
                    note: row.note.clone(),
                    section_name: row.section_name.clone(),
                    is_today: row.is_today,
                    disp_training_date: row.training_date.format(DISPLAY_DATE_FORMAT).to_string(),
                }
            })
            .collect();

        AttendanceForm {
            lms_user_id: ctx.lms_user_id,
            user_name: ctx.user_name.clone(),
            leave_flg: ctx.leave_flg,
            leave_date: ctx.leave_date,
            disp_leave_date: ctx
                .leave_date
                .map(|date| date.format(DISPLAY_LEAVE_DATE_FORMAT).to_string()),
            blank_times: blank_time_options(),
            hour_options: hour_options(),
            minute_options: minute_options(),
            attendance_list,
        }
    }

    /// Validates the edit form entries.
    pub fn validate(&self, form: &AttendanceForm) -> ValidationReport {
        let report = validate_entries(&form.attendance_list, &self.messages, self.note_max_chars);
        if !report.is_valid() {
            warn!(
                "event=attendance_validation module=attendance status=rejected lms_user_id={} field_errors={} categories={}",
                form.lms_user_id,
                report.field_errors.len(),
                report.messages.len()
            );
        }
        report
    }

    /// Saves every entry of the edit form.
    ///
    /// Students always save their own records; staff save the form's student.
    /// Entries are matched to existing records by training date. Callers are
    /// expected to have run [`AttendanceService::validate`] first; entries
    /// that still break a record invariant abort the save before any write.
    pub fn update(&self, ctx: &CallerContext, form: &AttendanceForm) -> ServiceResult<String> {
        let lms_user_id = if ctx.is_student() {
            ctx.lms_user_id
        } else {
            form.lms_user_id
        };
        let now = self.clock.now();

        let existing: BTreeMap<NaiveDate, AttendanceRecord> = self
            .attendance
            .find_by_user(lms_user_id)?
            .into_iter()
            .map(|record| (record.training_date, record))
            .collect();

        let mut planned: BTreeMap<NaiveDate, AttendanceRecord> = BTreeMap::new();
        for entry in &form.attendance_list {
            let date = entry.training_date;
            let mut record = match planned.remove(&date) {
                Some(record) => record,
                None => existing.get(&date).cloned().unwrap_or_else(|| {
                    AttendanceRecord::new(lms_user_id, ctx.account_id, date, ctx.lms_user_id, now)
                }),
            };

            let start = parse_entry_time(date, &entry.training_start_time)?;
            let end = parse_entry_time(date, &entry.training_end_time)?;
            record.lms_user_id = lms_user_id;
            record.account_id = ctx.account_id;
            record.training_start_time = start;
            record.training_end_time = end;
            record.blank_time = entry.blank_time;
            if !entry.absent {
                record.status = self.deriver.derive(start, end);
            }
            record.note = entry.note.clone();
            record.restore();
            record.touch(ctx.lms_user_id, now);
            planned.insert(date, record);
        }

        for record in planned.values() {
            record
                .validate()
                .map_err(|source| ServiceError::InvalidRecord {
                    training_date: record.training_date,
                    source,
                })?;
        }

        let records: Vec<AttendanceRecord> = planned.into_values().collect();
        let inserted = records.iter().filter(|record| record.is_new()).count();
        let updated = records.len() - inserted;
        self.attendance.save_all(&records)?;

        info!(
            "event=attendance_update module=attendance status=ok lms_user_id={} actor={} inserted={} updated={}",
            lms_user_id, ctx.lms_user_id, inserted, updated
        );
        Ok(self.messages.message(MessageKey::UpdateNotice, &[]))
    }

    /// Returns whether the student left any past day without start or end.
    pub fn has_unentered_past_attendance(&self, ctx: &CallerContext) -> ServiceResult<bool> {
        let count = self
            .attendance
            .count_missing_times_before(ctx.lms_user_id, self.clock.today())?;
        Ok(count > 0)
    }

    fn rejected(&self, ctx: &CallerContext, kind: PunchKind, message: String) -> PunchOutcome {
        info!(
            "event={} module=attendance status=rejected lms_user_id={} training_date={}",
            kind.event(),
            ctx.lms_user_id,
            self.clock.today()
        );
        PunchOutcome::Rejected(message)
    }
}

/// Rebuilds the textual start/end of every entry from its hour/minute selects.
pub fn join_entry_times(form: &mut AttendanceForm) {
    for entry in &mut form.attendance_list {
        entry.training_start_time =
            join_hour_minute(&entry.training_start_hour, &entry.training_start_minute);
        entry.training_end_time =
            join_hour_minute(&entry.training_end_hour, &entry.training_end_minute);
    }
}

fn parse_entry_time(training_date: NaiveDate, text: &str) -> ServiceResult<TrainingTime> {
    TrainingTime::parse(text).map_err(|source| ServiceError::InvalidTime {
        training_date,
        source,
    })
}
