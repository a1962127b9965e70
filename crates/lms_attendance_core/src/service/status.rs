//! Tardy/early-leave status derivation.
//!
//! # Invariants
//! - Blank business start or end forces `AttendanceStatus::None`.
//! - Arriving exactly at business start is on time; leaving exactly at
//!   business end is on time.
//! - A blank start (or end) contributes no tardy (or early-leave) judgment.

use crate::model::attendance::AttendanceStatus;
use crate::model::training_time::TrainingTime;

/// Default business start.
pub const DEFAULT_WORK_START: (u32, u32) = (9, 0);
/// Default business end.
pub const DEFAULT_WORK_END: (u32, u32) = (18, 0);

/// Derives the status of one day from its start/end and business hours.
pub fn derive_status(
    start: TrainingTime,
    end: TrainingTime,
    work_start: TrainingTime,
    work_end: TrainingTime,
) -> AttendanceStatus {
    if work_start.is_blank() || work_end.is_blank() {
        return AttendanceStatus::None;
    }

    let tardy = start.is_not_blank() && start > work_start;
    let leaving_early = end.is_not_blank() && end < work_end;
    AttendanceStatus::from_flags(tardy, leaving_early)
}

/// Status deriver bound to configured business hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusDeriver {
    work_start: TrainingTime,
    work_end: TrainingTime,
}

impl StatusDeriver {
    pub fn new(work_start: TrainingTime, work_end: TrainingTime) -> Self {
        Self {
            work_start,
            work_end,
        }
    }

    pub fn work_start(&self) -> TrainingTime {
        self.work_start
    }

    pub fn work_end(&self) -> TrainingTime {
        self.work_end
    }

    pub fn derive(&self, start: TrainingTime, end: TrainingTime) -> AttendanceStatus {
        derive_status(start, end, self.work_start, self.work_end)
    }
}

impl Default for StatusDeriver {
    fn default() -> Self {
        let (start_hour, start_minute) = DEFAULT_WORK_START;
        let (end_hour, end_minute) = DEFAULT_WORK_END;
        Self {
            work_start: TrainingTime::new(start_hour, start_minute).unwrap_or_default(),
            work_end: TrainingTime::new(end_hour, end_minute).unwrap_or_default(),
        }
    }
}
