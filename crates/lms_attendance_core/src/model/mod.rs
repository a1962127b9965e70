//! Attendance domain model.
//!
//! # Responsibility
//! - Define canonical data structures used by attendance business logic.
//! - Keep persisted records, view rows, and edit forms as separate shapes.
//!
//! # Invariants
//! - Every persisted record is identified by a stable `AttendanceId`.
//! - Deletion is represented by soft-delete flags, not hard delete.

pub mod attendance;
pub mod form;
pub mod management;
pub mod section;
pub mod training_time;
