//! Option lists and display helpers for the attendance edit screen.

use crate::model::form::SelectOption;
use crate::model::training_time::TrainingTime;

const BLANK_TIME_STEP_MINUTES: i32 = 15;
const BLANK_TIME_LIMIT_MINUTES: i32 = 480;

/// Renders break minutes as `H:MM`.
pub fn blank_time_value(minutes: i32) -> String {
    format!("{}:{:02}", minutes / 60, minutes % 60)
}

/// Human label for a break-time choice: `15 min`, `1 h`, `1 h 15 min`.
pub fn blank_time_label(minutes: i32) -> String {
    let hour = minutes / 60;
    let minute = minutes % 60;
    match (hour, minute) {
        (0, minute) => format!("{minute} min"),
        (hour, 0) => format!("{hour} h"),
        (hour, minute) => format!("{hour} h {minute} min"),
    }
}

/// Empty choice followed by 15-minute steps below 8 hours.
pub fn blank_time_options() -> Vec<SelectOption> {
    std::iter::once(SelectOption::new(None, ""))
        .chain(
            (BLANK_TIME_STEP_MINUTES..BLANK_TIME_LIMIT_MINUTES)
                .step_by(BLANK_TIME_STEP_MINUTES as usize)
                .map(|minutes| SelectOption::new(Some(minutes), blank_time_label(minutes))),
        )
        .collect()
}

/// Returns whether `minutes` is one of the break-time choices (or zero).
pub fn is_blank_time_choice(minutes: i32) -> bool {
    (0..BLANK_TIME_LIMIT_MINUTES).contains(&minutes) && minutes % BLANK_TIME_STEP_MINUTES == 0
}

/// Empty choice followed by `00`..`23`.
pub fn hour_options() -> Vec<SelectOption> {
    two_digit_options(24)
}

/// Empty choice followed by `00`..`59`.
pub fn minute_options() -> Vec<SelectOption> {
    two_digit_options(60)
}

fn two_digit_options(count: i32) -> Vec<SelectOption> {
    std::iter::once(SelectOption::new(None, ""))
        .chain((0..count).map(|value| SelectOption::new(Some(value), format!("{value:02}"))))
        .collect()
}

/// Splits a time into two-digit hour and minute select values.
///
/// Blank times yield empty strings.
pub fn split_hour_minute(time: TrainingTime) -> (String, String) {
    match (time.hour(), time.minute()) {
        (Some(hour), Some(minute)) => (format!("{hour:02}"), format!("{minute:02}")),
        _ => (String::new(), String::new()),
    }
}

/// Joins hour and minute select values into compact time text (`HHmm`).
///
/// Produces incomplete text when only one side is chosen, which
/// `TrainingTime::parse` then rejects.
pub fn join_hour_minute(hour: &str, minute: &str) -> String {
    format!("{}{}", hour.trim(), minute.trim())
}
