//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the key-based persistence contracts the services depend on.
//! - Isolate SQLite query details from business orchestration.
//!
//! # Invariants
//! - Repository writes enforce `AttendanceRecord::validate()` before persistence.
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.

pub mod attendance_repo;
pub mod section_repo;
