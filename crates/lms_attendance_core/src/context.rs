//! Caller identity and wall-clock seams.
//!
//! # Responsibility
//! - Carry the logged-in caller explicitly into every service call.
//! - Abstract "now" so punch operations are deterministic under test.

use chrono::{Local, NaiveDate, NaiveDateTime};

/// Role of the logged-in caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserRole {
    Student,
    /// Teacher/administrator editing on behalf of a student.
    Staff,
}

/// Logged-in caller of an attendance operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerContext {
    pub lms_user_id: i64,
    pub account_id: i64,
    pub course_id: i64,
    pub user_name: String,
    pub role: UserRole,
    /// Caller has left the course before its end.
    pub leave_flg: bool,
    pub leave_date: Option<NaiveDate>,
}

impl CallerContext {
    /// Student caller with no leave date.
    pub fn student(
        lms_user_id: i64,
        account_id: i64,
        course_id: i64,
        user_name: impl Into<String>,
    ) -> Self {
        Self {
            lms_user_id,
            account_id,
            course_id,
            user_name: user_name.into(),
            role: UserRole::Student,
            leave_flg: false,
            leave_date: None,
        }
    }

    /// Staff caller.
    pub fn staff(lms_user_id: i64, account_id: i64, user_name: impl Into<String>) -> Self {
        Self {
            lms_user_id,
            account_id,
            course_id: 0,
            user_name: user_name.into(),
            role: UserRole::Staff,
            leave_flg: false,
            leave_date: None,
        }
    }

    /// Capability check used to gate punch operations.
    pub fn is_student(&self) -> bool {
        self.role == UserRole::Student
    }
}

/// Source of the current local time.
pub trait Clock {
    fn now(&self) -> NaiveDateTime;

    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

/// Local system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Clock frozen at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> NaiveDateTime {
        (**self).now()
    }
}
