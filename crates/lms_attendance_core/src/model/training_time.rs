//! Wall-clock training time value type.
//!
//! # Responsibility
//! - Canonical representation for clock-in/clock-out times (`HH:mm`).
//! - Parse raw form text, format for persistence, compare, blank-check.
//!
//! # Invariants
//! - A blank time formats to the empty string and sorts before any set time.
//! - Set times carry minute precision only; seconds are always zero.
//! - `parse(t.formatted()) == t` for every value.

use chrono::{NaiveDateTime, NaiveTime, Timelike};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

// Accepts `HH:mm`, `H:mm` and the compact `HHmm` built from hour/minute selects.
static TRAINING_TIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:(\d{1,2}):(\d{2})|(\d{2})(\d{2}))$").expect("valid training time regex")
});

/// Error returned when raw text is not a training time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeParseError {
    /// Text does not match `HH:mm` / `HHmm`.
    Malformed(String),
    /// Hour or minute is outside the wall-clock range.
    OutOfRange { hour: u32, minute: u32 },
}

impl Display for TimeParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed(value) => write!(f, "malformed training time `{value}`"),
            Self::OutOfRange { hour, minute } => {
                write!(f, "training time out of range: {hour:02}:{minute:02}")
            }
        }
    }
}

impl Error for TimeParseError {}

/// `HH:mm` wall-clock time, or blank when not entered.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct TrainingTime {
    value: Option<NaiveTime>,
}

impl TrainingTime {
    /// Returns the blank (not entered) time.
    pub fn blank() -> Self {
        Self { value: None }
    }

    /// Creates a set time from hour and minute.
    pub fn new(hour: u32, minute: u32) -> Result<Self, TimeParseError> {
        NaiveTime::from_hms_opt(hour, minute, 0)
            .map(|time| Self { value: Some(time) })
            .ok_or(TimeParseError::OutOfRange { hour, minute })
    }

    /// Truncates a timestamp to the minute.
    pub fn from_datetime(at: NaiveDateTime) -> Self {
        Self {
            value: NaiveTime::from_hms_opt(at.hour(), at.minute(), 0),
        }
    }

    /// Parses form/persisted text. Blank or whitespace-only input is a blank time.
    pub fn parse(text: &str) -> Result<Self, TimeParseError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(Self::blank());
        }

        let captures = TRAINING_TIME_RE
            .captures(trimmed)
            .ok_or_else(|| TimeParseError::Malformed(trimmed.to_string()))?;
        let hour_text = captures.get(1).or_else(|| captures.get(3));
        let minute_text = captures.get(2).or_else(|| captures.get(4));
        let (Some(hour_text), Some(minute_text)) = (hour_text, minute_text) else {
            return Err(TimeParseError::Malformed(trimmed.to_string()));
        };

        let hour = hour_text
            .as_str()
            .parse::<u32>()
            .map_err(|_| TimeParseError::Malformed(trimmed.to_string()))?;
        let minute = minute_text
            .as_str()
            .parse::<u32>()
            .map_err(|_| TimeParseError::Malformed(trimmed.to_string()))?;
        Self::new(hour, minute)
    }

    /// Returns whether `text` is blank or a well-formed training time.
    pub fn is_valid_text(text: &str) -> bool {
        Self::parse(text).is_ok()
    }

    pub fn is_blank(&self) -> bool {
        self.value.is_none()
    }

    pub fn is_not_blank(&self) -> bool {
        self.value.is_some()
    }

    pub fn hour(&self) -> Option<u32> {
        self.value.map(|time| time.hour())
    }

    pub fn minute(&self) -> Option<u32> {
        self.value.map(|time| time.minute())
    }

    /// Persisted/display form: `HH:mm`, or empty when blank.
    pub fn formatted(&self) -> String {
        match self.value {
            Some(time) => time.format("%H:%M").to_string(),
            None => String::new(),
        }
    }
}

impl Display for TrainingTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.formatted())
    }
}

impl FromStr for TrainingTime {
    type Err = TimeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TrainingTime {
    type Error = TimeParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TrainingTime> for String {
    fn from(value: TrainingTime) -> Self {
        value.formatted()
    }
}
