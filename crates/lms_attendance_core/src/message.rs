//! User-facing message lookup.
//!
//! # Responsibility
//! - Name every message attendance logic can surface as a stable key.
//! - Resolve keys plus positional arguments to display strings.
//!
//! # Invariants
//! - Placeholders are `{0}`, `{1}`, ... and are replaced in one pass;
//!   argument text is never expanded again.
//! - Missing arguments leave their placeholder untouched.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{(\d+)\}").expect("valid placeholder regex"));

/// Stable message keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKey {
    Authorization,
    NotWorkDay,
    PunchAlreadyExists,
    PunchInEmpty,
    TrainingTimeRange,
    UpdateNotice,
    MaxLength,
    InputInvalid,
    BlankTimeInvalid,
    LabelNote,
    LabelStartTime,
    LabelEndTime,
}

impl MessageKey {
    /// Catalog key, as used by external message bundles.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Authorization => "validation.authorization",
            Self::NotWorkDay => "validation.attendance.notWorkday",
            Self::PunchAlreadyExists => "validation.attendance.punchAlreadyExists",
            Self::PunchInEmpty => "validation.attendance.punchInEmpty",
            Self::TrainingTimeRange => "validation.attendance.trainingTimeRange",
            Self::UpdateNotice => "attendance.updateNotice",
            Self::MaxLength => "validation.maxLength",
            Self::InputInvalid => "validation.inputInvalid",
            Self::BlankTimeInvalid => "validation.attendance.blankTime",
            Self::LabelNote => "label.note",
            Self::LabelStartTime => "label.trainingStartTime",
            Self::LabelEndTime => "label.trainingEndTime",
        }
    }
}

/// Key + args -> localized string.
pub trait MessageSource {
    fn message(&self, key: MessageKey, args: &[&str]) -> String;
}

impl<M: MessageSource + ?Sized> MessageSource for &M {
    fn message(&self, key: MessageKey, args: &[&str]) -> String {
        (**self).message(key, args)
    }
}

/// Built-in English catalog.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultMessages;

impl DefaultMessages {
    fn template(key: MessageKey) -> &'static str {
        match key {
            MessageKey::Authorization => "You are not allowed to perform this operation.",
            MessageKey::NotWorkDay => "Today is not a training day.",
            MessageKey::PunchAlreadyExists => {
                "Today's attendance has already been entered. Please edit it directly."
            }
            MessageKey::PunchInEmpty => {
                "There is no clock-in for this day, so a clock-out cannot be entered."
            }
            MessageKey::TrainingTimeRange => "The end time must be later than the start time.",
            MessageKey::UpdateNotice => "Attendance has been updated.",
            MessageKey::MaxLength => "{0} must be at most {1} characters.",
            MessageKey::InputInvalid => "{0} is not a valid time.",
            MessageKey::BlankTimeInvalid => {
                "Break time must be chosen from the list (15-minute steps under 8 hours)."
            }
            MessageKey::LabelNote => "Note",
            MessageKey::LabelStartTime => "Start time",
            MessageKey::LabelEndTime => "End time",
        }
    }
}

impl MessageSource for DefaultMessages {
    fn message(&self, key: MessageKey, args: &[&str]) -> String {
        format_message(Self::template(key), args)
    }
}

/// Replaces `{n}` placeholders with `args[n]`.
pub fn format_message(template: &str, args: &[&str]) -> String {
    PLACEHOLDER_RE
        .replace_all(template, |caps: &Captures<'_>| {
            caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|index| args.get(index))
                .map_or_else(|| caps[0].to_string(), |arg| (*arg).to_string())
        })
        .into_owned()
}
