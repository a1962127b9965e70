//! Attendance repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide key-based CRUD over `t_student_attendance`.
//! - Provide the joined management view over sections and records.
//!
//! # Invariants
//! - Write paths call `AttendanceRecord::validate()` before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Lookups only ever see non-deleted rows.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use crate::model::attendance::{
    AttendanceId, AttendanceRecord, AttendanceStatus, AttendanceValidationError,
};
use crate::model::management::AttendanceManagementRow;
use crate::model::training_time::TrainingTime;
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const ATTENDANCE_TABLE: &str = "t_student_attendance";
const ATTENDANCE_COLUMNS: &[&str] = &[
    "student_attendance_id",
    "lms_user_id",
    "account_id",
    "training_date",
    "training_start_time",
    "training_end_time",
    "blank_time",
    "status",
    "note",
    "delete_flg",
    "first_create_user",
    "first_create_date",
    "last_modified_user",
    "last_modified_date",
];

const ATTENDANCE_SELECT_SQL: &str = "SELECT
    student_attendance_id,
    lms_user_id,
    account_id,
    training_date,
    training_start_time,
    training_end_time,
    blank_time,
    status,
    note,
    delete_flg,
    first_create_user,
    first_create_date,
    last_modified_user,
    last_modified_date
FROM t_student_attendance";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for attendance persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(AttendanceValidationError),
    Db(DbError),
    NotFound(AttendanceId),
    InvalidData(String),
    /// Connection has not been migrated to the version this crate expects.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "attendance record not found: {id}"),
            Self::InvalidData(message) => {
                write!(f, "invalid persisted attendance data: {message}")
            }
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} does not match expected {expected_version}; open it with open_db first"
            ),
            Self::MissingRequiredTable(table) => write!(f, "required table `{table}` is missing"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "required column `{table}.{column}` is missing")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<AttendanceValidationError> for RepoError {
    fn from(value: AttendanceValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Persistence contract used by the attendance service.
pub trait AttendanceRepository {
    /// Non-deleted record of one student on one date.
    fn find_by_user_and_date(
        &self,
        lms_user_id: i64,
        training_date: NaiveDate,
    ) -> RepoResult<Option<AttendanceRecord>>;
    /// All non-deleted records of one student, ordered by date.
    fn find_by_user(&self, lms_user_id: i64) -> RepoResult<Vec<AttendanceRecord>>;
    /// Inserts a record and returns its id. A missing id is generated.
    fn insert(&self, record: &AttendanceRecord) -> RepoResult<AttendanceId>;
    /// Updates a record by id.
    fn update(&self, record: &AttendanceRecord) -> RepoResult<()>;
    /// Inserts new and updates persisted records in one transaction.
    ///
    /// Every record is validated before the first write; on any error
    /// nothing is persisted. Returns the ids in input order.
    fn save_all(&self, records: &[AttendanceRecord]) -> RepoResult<Vec<AttendanceId>>;
    /// Counts non-deleted records before `before` lacking a start or end time.
    fn count_missing_times_before(&self, lms_user_id: i64, before: NaiveDate) -> RepoResult<u32>;
    /// One row per scheduled training date of the course, joined with the
    /// student's record for that date when present.
    fn attendance_management(
        &self,
        course_id: i64,
        lms_user_id: i64,
        today: NaiveDate,
    ) -> RepoResult<Vec<AttendanceManagementRow>>;
}

/// SQLite-backed attendance repository.
pub struct SqliteAttendanceRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAttendanceRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, ATTENDANCE_TABLE, ATTENDANCE_COLUMNS)?;
        Ok(Self { conn })
    }
}

impl AttendanceRepository for SqliteAttendanceRepository<'_> {
    fn find_by_user_and_date(
        &self,
        lms_user_id: i64,
        training_date: NaiveDate,
    ) -> RepoResult<Option<AttendanceRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ATTENDANCE_SELECT_SQL}
             WHERE lms_user_id = ?1
               AND training_date = ?2
               AND delete_flg = 0;"
        ))?;

        let mut rows = stmt.query(params![lms_user_id, training_date])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_attendance_row(row)?));
        }

        Ok(None)
    }

    fn find_by_user(&self, lms_user_id: i64) -> RepoResult<Vec<AttendanceRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ATTENDANCE_SELECT_SQL}
             WHERE lms_user_id = ?1
               AND delete_flg = 0
             ORDER BY training_date ASC;"
        ))?;

        let mut rows = stmt.query([lms_user_id])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_attendance_row(row)?);
        }

        Ok(records)
    }

    fn insert(&self, record: &AttendanceRecord) -> RepoResult<AttendanceId> {
        record.validate()?;
        insert_row(self.conn, record)
    }

    fn update(&self, record: &AttendanceRecord) -> RepoResult<()> {
        record.validate()?;
        update_row(self.conn, record)
    }

    fn save_all(&self, records: &[AttendanceRecord]) -> RepoResult<Vec<AttendanceId>> {
        for record in records {
            record.validate()?;
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            if record.is_new() {
                ids.push(insert_row(&tx, record)?);
            } else {
                update_row(&tx, record)?;
                ids.extend(record.student_attendance_id);
            }
        }
        tx.commit()?;

        Ok(ids)
    }

    fn count_missing_times_before(&self, lms_user_id: i64, before: NaiveDate) -> RepoResult<u32> {
        let count = self.conn.query_row(
            "SELECT COUNT(*)
             FROM t_student_attendance
             WHERE lms_user_id = ?1
               AND delete_flg = 0
               AND training_date < ?2
               AND (
                    training_start_time IS NULL OR training_start_time = ''
                 OR training_end_time IS NULL OR training_end_time = ''
               );",
            params![lms_user_id, before],
            |row| row.get::<_, u32>(0),
        )?;
        Ok(count)
    }

    fn attendance_management(
        &self,
        course_id: i64,
        lms_user_id: i64,
        today: NaiveDate,
    ) -> RepoResult<Vec<AttendanceManagementRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                s.training_date AS training_date,
                s.section_name AS section_name,
                a.student_attendance_id AS student_attendance_id,
                a.training_start_time AS training_start_time,
                a.training_end_time AS training_end_time,
                a.blank_time AS blank_time,
                a.status AS status,
                a.note AS note,
                CASE WHEN s.training_date = ?3 THEN 1 ELSE 0 END AS is_today
             FROM (
                SELECT training_date, MIN(section_name) AS section_name
                FROM m_section
                WHERE course_id = ?1
                  AND delete_flg = 0
                GROUP BY training_date
             ) s
             LEFT JOIN t_student_attendance a
               ON a.training_date = s.training_date
              AND a.lms_user_id = ?2
              AND a.delete_flg = 0
             ORDER BY s.training_date ASC;",
        )?;

        let mut rows = stmt.query(params![course_id, lms_user_id, today])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_management_row(row, lms_user_id)?);
        }

        Ok(items)
    }
}

/// Checks schema version, table, and columns before a repository is handed out.
pub(crate) fn ensure_connection_ready(
    conn: &Connection,
    table: &'static str,
    columns: &[&'static str],
) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version < expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    let exists = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1;",
            [table],
            |row| row.get::<_, i64>(0),
        )
        .optional()?
        .is_some();
    if !exists {
        return Err(RepoError::MissingRequiredTable(table));
    }

    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let present = stmt
        .query_map([], |row| row.get::<_, String>("name"))?
        .collect::<Result<Vec<_>, _>>()?;
    for &column in columns {
        if !present.iter().any(|name| name == column) {
            return Err(RepoError::MissingRequiredColumn { table, column });
        }
    }

    Ok(())
}

fn insert_row(conn: &Connection, record: &AttendanceRecord) -> RepoResult<AttendanceId> {
    let id = record.student_attendance_id.unwrap_or_else(Uuid::new_v4);
    conn.execute(
        "INSERT INTO t_student_attendance (
            student_attendance_id,
            lms_user_id,
            account_id,
            training_date,
            training_start_time,
            training_end_time,
            blank_time,
            status,
            note,
            delete_flg,
            first_create_user,
            first_create_date,
            last_modified_user,
            last_modified_date
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14);",
        params![
            id.to_string(),
            record.lms_user_id,
            record.account_id,
            record.training_date,
            record.training_start_time.formatted(),
            record.training_end_time.formatted(),
            record.blank_time,
            record.status.code(),
            record.note.as_str(),
            bool_to_int(record.is_deleted),
            record.first_create_user,
            record.first_create_date,
            record.last_modified_user,
            record.last_modified_date,
        ],
    )?;

    Ok(id)
}

fn update_row(conn: &Connection, record: &AttendanceRecord) -> RepoResult<()> {
    let id = record.student_attendance_id.ok_or_else(|| {
        RepoError::InvalidData("update requires student_attendance_id".to_string())
    })?;
    let changed = conn.execute(
        "UPDATE t_student_attendance
         SET
            lms_user_id = ?1,
            account_id = ?2,
            training_date = ?3,
            training_start_time = ?4,
            training_end_time = ?5,
            blank_time = ?6,
            status = ?7,
            note = ?8,
            delete_flg = ?9,
            last_modified_user = ?10,
            last_modified_date = ?11
         WHERE student_attendance_id = ?12;",
        params![
            record.lms_user_id,
            record.account_id,
            record.training_date,
            record.training_start_time.formatted(),
            record.training_end_time.formatted(),
            record.blank_time,
            record.status.code(),
            record.note.as_str(),
            bool_to_int(record.is_deleted),
            record.last_modified_user,
            record.last_modified_date,
            id.to_string(),
        ],
    )?;

    if changed == 0 {
        return Err(RepoError::NotFound(id));
    }

    Ok(())
}

fn parse_attendance_row(row: &Row<'_>) -> RepoResult<AttendanceRecord> {
    let id_text: String = row.get("student_attendance_id")?;
    let record = AttendanceRecord {
        student_attendance_id: Some(parse_id(&id_text)?),
        lms_user_id: row.get("lms_user_id")?,
        account_id: row.get("account_id")?,
        training_date: row.get("training_date")?,
        training_start_time: parse_time(row.get("training_start_time")?, "training_start_time")?,
        training_end_time: parse_time(row.get("training_end_time")?, "training_end_time")?,
        blank_time: row.get("blank_time")?,
        status: parse_status(row.get("status")?)?,
        note: row.get("note")?,
        is_deleted: parse_flag(row.get("delete_flg")?)?,
        first_create_user: row.get("first_create_user")?,
        first_create_date: row.get("first_create_date")?,
        last_modified_user: row.get("last_modified_user")?,
        last_modified_date: row.get("last_modified_date")?,
    };
    record.validate()?;
    Ok(record)
}

fn parse_management_row(row: &Row<'_>, lms_user_id: i64) -> RepoResult<AttendanceManagementRow> {
    let student_attendance_id = match row.get::<_, Option<String>>("student_attendance_id")? {
        Some(text) => Some(parse_id(&text)?),
        None => None,
    };
    let status = match row.get::<_, Option<i64>>("status")? {
        Some(code) => parse_status(code)?,
        None => AttendanceStatus::None,
    };

    Ok(AttendanceManagementRow {
        student_attendance_id,
        lms_user_id,
        training_date: row.get("training_date")?,
        section_name: row.get("section_name")?,
        training_start_time: parse_time(row.get("training_start_time")?, "training_start_time")?,
        training_end_time: parse_time(row.get("training_end_time")?, "training_end_time")?,
        blank_time: row.get("blank_time")?,
        blank_time_value: None,
        status,
        status_disp_name: String::new(),
        note: row.get::<_, Option<String>>("note")?.unwrap_or_default(),
        is_today: parse_flag(row.get("is_today")?)?,
    })
}

fn parse_id(text: &str) -> RepoResult<AttendanceId> {
    Uuid::parse_str(text).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid uuid value `{text}` in {ATTENDANCE_TABLE}.student_attendance_id"
        ))
    })
}

fn parse_time(value: Option<String>, column: &str) -> RepoResult<TrainingTime> {
    let Some(text) = value else {
        return Ok(TrainingTime::blank());
    };
    TrainingTime::parse(&text).map_err(|err| {
        RepoError::InvalidData(format!("{err} in {ATTENDANCE_TABLE}.{column}"))
    })
}

fn parse_status(code: i64) -> RepoResult<AttendanceStatus> {
    AttendanceStatus::from_code(code).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid status code `{code}` in {ATTENDANCE_TABLE}.status"
        ))
    })
}

fn parse_flag(value: i64) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid flag value `{other}`"
        ))),
    }
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
