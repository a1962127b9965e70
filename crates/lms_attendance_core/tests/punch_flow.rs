use chrono::{NaiveDate, NaiveDateTime};
use lms_attendance_core::db::open_db_in_memory;
use lms_attendance_core::{
    AttendanceRecord, AttendanceRepository, AttendanceService, AttendanceStatus, CallerContext,
    DefaultMessages, FixedClock, MessageKey, MessageSource, PunchKind, PunchOutcome, Section,
    SectionRepository, SqliteAttendanceRepository, SqliteSectionRepository, TrainingTime,
};
use rusqlite::Connection;

const COURSE_ID: i64 = 10;
const STUDENT_ID: i64 = 501;
const ACCOUNT_ID: i64 = 1;

type TestService<'conn> = AttendanceService<
    SqliteAttendanceRepository<'conn>,
    SqliteSectionRepository<'conn>,
    DefaultMessages,
    FixedClock,
>;

#[test]
fn punch_in_on_training_day_records_start_and_tardy_status() {
    let conn = setup_training_day();
    let service = service_at(&conn, at(9, 15));

    let outcome = service.punch_in(&student()).unwrap();
    assert_eq!(outcome, PunchOutcome::Recorded(notice(MessageKey::UpdateNotice)));

    let record = stored_record(&conn).unwrap();
    assert_eq!(record.training_start_time, TrainingTime::new(9, 15).unwrap());
    assert!(record.training_end_time.is_blank());
    assert_eq!(record.status, AttendanceStatus::Tardy);
    assert_eq!(record.first_create_user, STUDENT_ID);
    assert_eq!(record.account_id, ACCOUNT_ID);
}

#[test]
fn punch_out_updates_same_record_and_recomputes_status() {
    let conn = setup_training_day();
    service_at(&conn, at(9, 15)).punch_in(&student()).unwrap();
    let punched_in = stored_record(&conn).unwrap();

    let outcome = service_at(&conn, at(17, 45)).punch_out(&student()).unwrap();
    assert!(outcome.is_recorded());

    let record = stored_record(&conn).unwrap();
    assert_eq!(record.student_attendance_id, punched_in.student_attendance_id);
    assert_eq!(record.training_end_time, TrainingTime::new(17, 45).unwrap());
    assert_eq!(record.status, AttendanceStatus::TardyAndLeavingEarly);
    assert_eq!(record.last_modified_date, at(17, 45));
}

#[test]
fn on_time_day_keeps_status_none() {
    let conn = setup_training_day();
    service_at(&conn, at(8, 55)).punch_in(&student()).unwrap();
    service_at(&conn, at(18, 5)).punch_out(&student()).unwrap();

    let record = stored_record(&conn).unwrap();
    assert_eq!(record.status, AttendanceStatus::None);
}

#[test]
fn second_punch_in_is_rejected_without_write() {
    let conn = setup_training_day();
    service_at(&conn, at(9, 15)).punch_in(&student()).unwrap();
    let before = stored_record(&conn).unwrap();

    let outcome = service_at(&conn, at(9, 40)).punch_in(&student()).unwrap();
    assert_eq!(
        outcome,
        PunchOutcome::Rejected(notice(MessageKey::PunchAlreadyExists))
    );
    assert_eq!(stored_record(&conn).unwrap(), before);
}

#[test]
fn punch_out_without_punch_in_is_rejected_without_write() {
    let conn = setup_training_day();

    let outcome = service_at(&conn, at(18, 0)).punch_out(&student()).unwrap();
    assert_eq!(outcome, PunchOutcome::Rejected(notice(MessageKey::PunchInEmpty)));
    assert!(stored_record(&conn).is_none());
}

#[test]
fn second_punch_out_is_rejected() {
    let conn = setup_training_day();
    service_at(&conn, at(9, 0)).punch_in(&student()).unwrap();
    service_at(&conn, at(18, 0)).punch_out(&student()).unwrap();

    let outcome = service_at(&conn, at(18, 30)).punch_out(&student()).unwrap();
    assert_eq!(
        outcome,
        PunchOutcome::Rejected(notice(MessageKey::PunchAlreadyExists))
    );
    let record = stored_record(&conn).unwrap();
    assert_eq!(record.training_end_time, TrainingTime::new(18, 0).unwrap());
}

#[test]
fn punch_out_earlier_than_start_is_rejected() {
    let conn = setup_training_day();
    let attendance = SqliteAttendanceRepository::try_new(&conn).unwrap();
    let mut record = AttendanceRecord::new(STUDENT_ID, ACCOUNT_ID, day(), STUDENT_ID, at(8, 0));
    record.training_start_time = TrainingTime::new(13, 0).unwrap();
    attendance.insert(&record).unwrap();

    let service = service_at(&conn, at(12, 0));
    assert_eq!(
        service.punch_check(&student(), PunchKind::Out).unwrap(),
        Some(notice(MessageKey::TrainingTimeRange))
    );
    assert!(!service.punch_out(&student()).unwrap().is_recorded());
}

#[test]
fn punch_in_fills_existing_record_without_start() {
    let conn = setup_training_day();
    let attendance = SqliteAttendanceRepository::try_new(&conn).unwrap();
    let mut record = AttendanceRecord::new(STUDENT_ID, ACCOUNT_ID, day(), STUDENT_ID, at(7, 0));
    record.note = "doctor in the morning".to_string();
    let id = attendance.insert(&record).unwrap();

    service_at(&conn, at(10, 30)).punch_in(&student()).unwrap();

    let stored = stored_record(&conn).unwrap();
    assert_eq!(stored.student_attendance_id, Some(id));
    assert_eq!(stored.training_start_time, TrainingTime::new(10, 30).unwrap());
    assert_eq!(stored.note, "doctor in the morning");
    assert_eq!(stored.status, AttendanceStatus::Tardy);
    assert_eq!(attendance.find_by_user(STUDENT_ID).unwrap().len(), 1);
}

#[test]
fn punch_in_after_recorded_end_is_rejected() {
    let conn = setup_training_day();
    let attendance = SqliteAttendanceRepository::try_new(&conn).unwrap();
    let mut record = AttendanceRecord::new(STUDENT_ID, ACCOUNT_ID, day(), STUDENT_ID, at(8, 0));
    record.training_end_time = TrainingTime::new(10, 0).unwrap();
    attendance.insert(&record).unwrap();
    let before = stored_record(&conn).unwrap();

    let outcome = service_at(&conn, at(11, 0)).punch_in(&student()).unwrap();
    assert_eq!(
        outcome,
        PunchOutcome::Rejected(notice(MessageKey::TrainingTimeRange))
    );
    assert_eq!(stored_record(&conn).unwrap(), before);
}

#[test]
fn punch_on_non_training_day_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let service = service_at(&conn, at(9, 0));

    let outcome = service.punch_in(&student()).unwrap();
    assert_eq!(outcome, PunchOutcome::Rejected(notice(MessageKey::NotWorkDay)));
    assert!(stored_record(&conn).is_none());
}

#[test]
fn staff_caller_cannot_punch() {
    let conn = setup_training_day();
    let staff = CallerContext::staff(900, ACCOUNT_ID, "Coach");
    let service = service_at(&conn, at(9, 0));

    let outcome = service.punch_in(&staff).unwrap();
    assert_eq!(
        outcome,
        PunchOutcome::Rejected(notice(MessageKey::Authorization))
    );
    assert_eq!(
        service.punch_check(&staff, PunchKind::Out).unwrap(),
        Some(notice(MessageKey::Authorization))
    );
}

#[test]
fn deleted_section_does_not_count_as_training_day() {
    let conn = setup_training_day();
    conn.execute("UPDATE m_section SET delete_flg = 1;", [])
        .unwrap();

    let service = service_at(&conn, at(9, 0));
    assert_eq!(
        service.punch_check(&student(), PunchKind::In).unwrap(),
        Some(notice(MessageKey::NotWorkDay))
    );
}

fn setup_training_day() -> Connection {
    let conn = open_db_in_memory().unwrap();
    let sections = SqliteSectionRepository::try_new(&conn).unwrap();
    sections
        .insert_section(&Section::new(COURSE_ID, "Java basics 3", day()))
        .unwrap();
    conn
}

fn service_at(conn: &Connection, now: NaiveDateTime) -> TestService<'_> {
    AttendanceService::new(
        SqliteAttendanceRepository::try_new(conn).unwrap(),
        SqliteSectionRepository::try_new(conn).unwrap(),
        DefaultMessages,
        FixedClock(now),
    )
}

fn stored_record(conn: &Connection) -> Option<AttendanceRecord> {
    SqliteAttendanceRepository::try_new(conn)
        .unwrap()
        .find_by_user_and_date(STUDENT_ID, day())
        .unwrap()
}

fn student() -> CallerContext {
    CallerContext::student(STUDENT_ID, ACCOUNT_ID, COURSE_ID, "Aki Tanaka")
}

fn notice(key: MessageKey) -> String {
    DefaultMessages.message(key, &[])
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 4, 1).unwrap()
}

fn at(hour: u32, minute: u32) -> NaiveDateTime {
    day().and_hms_opt(hour, minute, 0).unwrap()
}
