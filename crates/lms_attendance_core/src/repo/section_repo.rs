//! Course section (training day) repository.
//!
//! # Responsibility
//! - Answer "is this date a training day for the course".
//! - Seed and list scheduled sections.
//!
//! # Invariants
//! - Deleted sections never count as training days.

use crate::model::section::Section;
use crate::repo::attendance_repo::{ensure_connection_ready, RepoResult};
use chrono::NaiveDate;
use rusqlite::{params, Connection};

const SECTION_TABLE: &str = "m_section";
const SECTION_COLUMNS: &[&str] = &[
    "section_id",
    "course_id",
    "section_name",
    "training_date",
    "delete_flg",
];

/// Repository interface for scheduled sections.
pub trait SectionRepository {
    /// Number of non-deleted sections of `course_id` on `training_date`.
    fn count_sections_on(&self, course_id: i64, training_date: NaiveDate) -> RepoResult<u32>;
    /// Inserts one section and returns its row id.
    fn insert_section(&self, section: &Section) -> RepoResult<i64>;
    /// Non-deleted sections of one course, ordered by date.
    fn list_sections(&self, course_id: i64) -> RepoResult<Vec<Section>>;
}

/// SQLite-backed section repository.
pub struct SqliteSectionRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSectionRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, SECTION_TABLE, SECTION_COLUMNS)?;
        Ok(Self { conn })
    }
}

impl SectionRepository for SqliteSectionRepository<'_> {
    fn count_sections_on(&self, course_id: i64, training_date: NaiveDate) -> RepoResult<u32> {
        let count = self.conn.query_row(
            "SELECT COUNT(*)
             FROM m_section
             WHERE course_id = ?1
               AND training_date = ?2
               AND delete_flg = 0;",
            params![course_id, training_date],
            |row| row.get::<_, u32>(0),
        )?;
        Ok(count)
    }

    fn insert_section(&self, section: &Section) -> RepoResult<i64> {
        self.conn.execute(
            "INSERT INTO m_section (course_id, section_name, training_date)
             VALUES (?1, ?2, ?3);",
            params![
                section.course_id,
                section.section_name.as_str(),
                section.training_date
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn list_sections(&self, course_id: i64) -> RepoResult<Vec<Section>> {
        let mut stmt = self.conn.prepare(
            "SELECT section_id, course_id, section_name, training_date
             FROM m_section
             WHERE course_id = ?1
               AND delete_flg = 0
             ORDER BY training_date ASC, section_id ASC;",
        )?;
        let sections = stmt
            .query_map([course_id], |row| {
                Ok(Section {
                    section_id: Some(row.get("section_id")?),
                    course_id: row.get("course_id")?,
                    section_name: row.get("section_name")?,
                    training_date: row.get("training_date")?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(sections)
    }
}
