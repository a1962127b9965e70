//! Attendance use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep request-handling layers decoupled from storage details.

pub mod attendance_service;
pub mod form_options;
pub mod status;
pub mod validation;
