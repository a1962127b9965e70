use chrono::{NaiveDate, NaiveDateTime};
use lms_attendance_core::db::open_db_in_memory;
use lms_attendance_core::{
    join_entry_times, AttendanceForm, AttendanceRecord, AttendanceRepository, AttendanceService,
    AttendanceStatus, CallerContext, DailyAttendanceEntry, DefaultMessages, FixedClock,
    MessageKey, MessageSource, Section, SectionRepository, ServiceError,
    SqliteAttendanceRepository, SqliteSectionRepository, TrainingTime, Violation,
};
use rusqlite::Connection;

const COURSE_ID: i64 = 20;
const STUDENT_ID: i64 = 701;
const ACCOUNT_ID: i64 = 3;

type TestService<'conn> = AttendanceService<
    SqliteAttendanceRepository<'conn>,
    SqliteSectionRepository<'conn>,
    DefaultMessages,
    FixedClock,
>;

#[test]
fn management_list_covers_every_scheduled_day() {
    let conn = setup_course();
    let attendance = SqliteAttendanceRepository::try_new(&conn).unwrap();
    let mut record = AttendanceRecord::new(STUDENT_ID, ACCOUNT_ID, date(2), STUDENT_ID, at(2, 9, 0));
    record.training_start_time = TrainingTime::new(9, 10).unwrap();
    record.training_end_time = TrainingTime::new(18, 0).unwrap();
    record.blank_time = Some(75);
    record.status = AttendanceStatus::Tardy;
    attendance.insert(&record).unwrap();

    let rows = service_at(&conn, at(2, 12, 0))
        .get_attendance_management(COURSE_ID, STUDENT_ID)
        .unwrap();

    assert_eq!(
        rows.iter().map(|row| row.training_date).collect::<Vec<_>>(),
        vec![date(1), date(2), date(3)]
    );
    assert!(!rows[0].has_record());
    assert!(rows[0].training_start_time.is_blank());
    assert_eq!(rows[0].status_disp_name, "");

    assert!(rows[1].has_record());
    assert!(rows[1].is_today);
    assert_eq!(rows[1].blank_time_value.as_deref(), Some("1:15"));
    assert_eq!(rows[1].status_disp_name, "Tardy");
    assert_eq!(rows[1].section_name, "Day 2");

    assert!(!rows[2].is_today);
}

#[test]
fn management_list_ignores_other_students_records() {
    let conn = setup_course();
    let attendance = SqliteAttendanceRepository::try_new(&conn).unwrap();
    let other = AttendanceRecord::new(999, ACCOUNT_ID, date(1), 999, at(1, 9, 0));
    attendance.insert(&other).unwrap();

    let rows = service_at(&conn, at(3, 9, 0))
        .get_attendance_management(COURSE_ID, STUDENT_ID)
        .unwrap();
    assert!(rows.iter().all(|row| !row.has_record()));
}

#[test]
fn edit_form_splits_times_into_selects() {
    let conn = setup_course();
    let attendance = SqliteAttendanceRepository::try_new(&conn).unwrap();
    let mut record = AttendanceRecord::new(STUDENT_ID, ACCOUNT_ID, date(1), STUDENT_ID, at(1, 9, 0));
    record.training_start_time = TrainingTime::new(9, 5).unwrap();
    attendance.insert(&record).unwrap();

    let service = service_at(&conn, at(3, 9, 0));
    let rows = service
        .get_attendance_management(COURSE_ID, STUDENT_ID)
        .unwrap();
    let form = service.build_attendance_form(&student(), &rows);

    assert_eq!(form.lms_user_id, STUDENT_ID);
    assert_eq!(form.user_name, "Ren Sato");
    assert_eq!(form.attendance_list.len(), 3);
    assert_eq!(form.blank_times.len(), 32);
    assert_eq!(form.hour_options.len(), 25);
    assert_eq!(form.minute_options.len(), 61);

    let first = &form.attendance_list[0];
    assert_eq!(first.training_start_hour, "09");
    assert_eq!(first.training_start_minute, "05");
    assert_eq!(first.training_start_time, "09:05");
    assert_eq!(first.training_end_hour, "");
    assert_eq!(first.disp_training_date, "2026-04-01 (Wed)");
    assert!(form.attendance_list[2].is_today);
}

#[test]
fn leave_date_is_rendered_on_the_form() {
    let conn = setup_course();
    let service = service_at(&conn, at(3, 9, 0));
    let mut ctx = student();
    ctx.leave_flg = true;
    ctx.leave_date = Some(date(2));

    let form = service.build_attendance_form(&ctx, &[]);
    assert!(form.leave_flg);
    assert_eq!(form.leave_date, Some(date(2)));
    assert_eq!(form.disp_leave_date.as_deref(), Some("April 2, 2026"));
}

#[test]
fn update_matches_existing_records_by_date_and_inserts_the_rest() {
    let conn = setup_course();
    let attendance = SqliteAttendanceRepository::try_new(&conn).unwrap();
    let mut existing = AttendanceRecord::new(STUDENT_ID, ACCOUNT_ID, date(1), STUDENT_ID, at(1, 9, 0));
    existing.training_start_time = TrainingTime::new(9, 0).unwrap();
    let existing_id = attendance.insert(&existing).unwrap();

    let mut form = AttendanceForm {
        lms_user_id: STUDENT_ID,
        attendance_list: vec![
            entry(1, ("09", "30"), ("18", "00"), ""),
            entry(2, ("08", "50"), ("17", "00"), "left for the dentist"),
        ],
        ..AttendanceForm::default()
    };
    // Stale ids from the rendered form are not trusted.
    form.attendance_list[1].student_attendance_id = Some(existing_id);
    join_entry_times(&mut form);

    let service = service_at(&conn, at(3, 20, 0));
    assert!(service.validate(&form).is_valid());
    let message = service.update(&student(), &form).unwrap();
    assert_eq!(message, DefaultMessages.message(MessageKey::UpdateNotice, &[]));

    let records = attendance.find_by_user(STUDENT_ID).unwrap();
    assert_eq!(records.len(), 2);

    assert_eq!(records[0].student_attendance_id, Some(existing_id));
    assert_eq!(records[0].training_start_time, TrainingTime::new(9, 30).unwrap());
    assert_eq!(records[0].status, AttendanceStatus::Tardy);
    assert_eq!(records[0].first_create_date, at(1, 9, 0));
    assert_eq!(records[0].last_modified_date, at(3, 20, 0));

    assert_ne!(records[1].student_attendance_id, Some(existing_id));
    assert_eq!(records[1].training_date, date(2));
    assert_eq!(records[1].status, AttendanceStatus::LeavingEarly);
    assert_eq!(records[1].note, "left for the dentist");
}

#[test]
fn absent_entry_keeps_its_stored_status() {
    let conn = setup_course();
    let attendance = SqliteAttendanceRepository::try_new(&conn).unwrap();
    let mut existing = AttendanceRecord::new(STUDENT_ID, ACCOUNT_ID, date(1), STUDENT_ID, at(1, 9, 0));
    existing.status = AttendanceStatus::TardyAndLeavingEarly;
    attendance.insert(&existing).unwrap();

    let mut absent = entry(1, ("", ""), ("", ""), "sick");
    absent.absent = true;
    absent.status = AttendanceStatus::None;
    let mut form = AttendanceForm {
        lms_user_id: STUDENT_ID,
        attendance_list: vec![absent],
        ..AttendanceForm::default()
    };
    join_entry_times(&mut form);

    service_at(&conn, at(3, 9, 0))
        .update(&student(), &form)
        .unwrap();

    let stored = attendance
        .find_by_user_and_date(STUDENT_ID, date(1))
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, AttendanceStatus::TardyAndLeavingEarly);
    assert_eq!(stored.note, "sick");
}

#[test]
fn duplicate_dates_in_form_write_one_record() {
    let conn = setup_course();
    let mut form = AttendanceForm {
        lms_user_id: STUDENT_ID,
        attendance_list: vec![
            entry(2, ("09", "00"), ("", ""), "first"),
            entry(2, ("09", "20"), ("18", "00"), "second"),
        ],
        ..AttendanceForm::default()
    };
    join_entry_times(&mut form);

    service_at(&conn, at(3, 9, 0))
        .update(&student(), &form)
        .unwrap();

    let records = SqliteAttendanceRepository::try_new(&conn)
        .unwrap()
        .find_by_user(STUDENT_ID)
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].note, "second");
    assert_eq!(records[0].training_start_time, TrainingTime::new(9, 20).unwrap());
}

#[test]
fn negative_break_time_fails_whole_save_without_writes() {
    let conn = setup_course();
    let mut form = AttendanceForm {
        lms_user_id: STUDENT_ID,
        attendance_list: vec![
            entry(1, ("09", "00"), ("18", "00"), ""),
            entry(2, ("09", "00"), ("18", "00"), ""),
        ],
        ..AttendanceForm::default()
    };
    form.attendance_list[1].blank_time = Some(-15);
    join_entry_times(&mut form);

    let service = service_at(&conn, at(3, 9, 0));
    let report = service.validate(&form);
    assert_eq!(
        report.violations.iter().copied().collect::<Vec<_>>(),
        vec![Violation::InvalidBlankTime]
    );
    assert!(report.has_field_error("attendanceList[1].blankTime"));

    let err = service.update(&student(), &form).unwrap_err();
    assert!(
        matches!(err, ServiceError::InvalidRecord { training_date, .. } if training_date == date(2)),
        "unexpected error: {err}"
    );
    assert!(stored_records(&conn).is_empty());
}

#[test]
fn reversed_times_fail_whole_save_without_writes() {
    let conn = setup_course();
    let attendance = SqliteAttendanceRepository::try_new(&conn).unwrap();
    let mut existing = AttendanceRecord::new(STUDENT_ID, ACCOUNT_ID, date(1), STUDENT_ID, at(1, 9, 0));
    existing.note = "kept".to_string();
    attendance.insert(&existing).unwrap();

    let mut form = AttendanceForm {
        lms_user_id: STUDENT_ID,
        attendance_list: vec![
            entry(1, ("09", "00"), ("18", "00"), "overwritten"),
            entry(2, ("13", "00"), ("12", "00"), ""),
        ],
        ..AttendanceForm::default()
    };
    join_entry_times(&mut form);

    let service = service_at(&conn, at(3, 9, 0));
    assert!(service
        .validate(&form)
        .violations
        .contains(&Violation::TimeRange));

    let err = service.update(&student(), &form).unwrap_err();
    assert!(matches!(err, ServiceError::InvalidRecord { .. }));

    let records = stored_records(&conn);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].note, "kept");
    assert!(records[0].training_start_time.is_blank());
}

#[test]
fn unparseable_time_aborts_save_before_any_write() {
    let conn = setup_course();
    let mut form = AttendanceForm {
        lms_user_id: STUDENT_ID,
        attendance_list: vec![
            entry(1, ("09", "00"), ("18", "00"), ""),
            entry(2, ("09", ""), ("", ""), ""),
        ],
        ..AttendanceForm::default()
    };
    join_entry_times(&mut form);

    let err = service_at(&conn, at(3, 9, 0))
        .update(&student(), &form)
        .unwrap_err();
    assert!(
        matches!(err, ServiceError::InvalidTime { training_date, .. } if training_date == date(2)),
        "unexpected error: {err}"
    );
    assert!(stored_records(&conn).is_empty());
}

#[test]
fn staff_update_saves_the_forms_student() {
    let conn = setup_course();
    let staff = CallerContext::staff(42, 9, "Coach");
    let mut form = AttendanceForm {
        lms_user_id: STUDENT_ID,
        attendance_list: vec![entry(1, ("09", "00"), ("18", "00"), "")],
        ..AttendanceForm::default()
    };
    join_entry_times(&mut form);

    service_at(&conn, at(3, 9, 0)).update(&staff, &form).unwrap();

    let attendance = SqliteAttendanceRepository::try_new(&conn).unwrap();
    let stored = attendance
        .find_by_user_and_date(STUDENT_ID, date(1))
        .unwrap()
        .unwrap();
    assert_eq!(stored.first_create_user, 42);
    assert_eq!(stored.last_modified_user, 42);
    assert!(attendance.find_by_user(42).unwrap().is_empty());
}

#[test]
fn student_update_ignores_foreign_form_user() {
    let conn = setup_course();
    let mut form = AttendanceForm {
        lms_user_id: 999,
        attendance_list: vec![entry(1, ("09", "00"), ("18", "00"), "")],
        ..AttendanceForm::default()
    };
    join_entry_times(&mut form);

    service_at(&conn, at(3, 9, 0))
        .update(&student(), &form)
        .unwrap();

    let attendance = SqliteAttendanceRepository::try_new(&conn).unwrap();
    assert_eq!(attendance.find_by_user(STUDENT_ID).unwrap().len(), 1);
    assert!(attendance.find_by_user(999).unwrap().is_empty());
}

#[test]
fn overlong_notes_produce_one_summary_message() {
    let conn = setup_course();
    let long_note = "x".repeat(101);
    let mut form = AttendanceForm {
        lms_user_id: STUDENT_ID,
        attendance_list: vec![
            entry(1, ("09", "00"), ("18", "00"), &long_note),
            entry(2, ("09", "00"), ("18", "00"), &long_note),
            entry(3, ("09", ""), ("", ""), ""),
        ],
        ..AttendanceForm::default()
    };
    join_entry_times(&mut form);

    let report = service_at(&conn, at(3, 9, 0)).validate(&form);

    assert!(!report.is_valid());
    assert_eq!(
        report.violations.iter().copied().collect::<Vec<_>>(),
        vec![Violation::NoteTooLong, Violation::InvalidStartTime]
    );
    assert_eq!(
        report.messages,
        vec![
            "Note must be at most 100 characters.".to_string(),
            "Start time is not a valid time.".to_string(),
        ]
    );
    assert!(report.has_field_error("attendanceList[0].note"));
    assert!(report.has_field_error("attendanceList[1].note"));
    assert!(report.has_field_error("attendanceList[2].trainingStartMinute"));
}

#[test]
fn lowered_note_limit_applies_to_validation() {
    let conn = setup_course();
    let form = AttendanceForm {
        lms_user_id: STUDENT_ID,
        attendance_list: vec![entry(1, ("", ""), ("", ""), "twelve chars")],
        ..AttendanceForm::default()
    };

    let service = service_at(&conn, at(3, 9, 0)).with_note_max_chars(10);
    let report = service.validate(&form);
    assert_eq!(report.messages, vec!["Note must be at most 10 characters."]);
}

#[test]
fn unentered_check_only_counts_past_days() {
    let conn = setup_course();
    let attendance = SqliteAttendanceRepository::try_new(&conn).unwrap();
    let service = service_at(&conn, at(2, 9, 0));
    assert!(!service.has_unentered_past_attendance(&student()).unwrap());

    let mut today = AttendanceRecord::new(STUDENT_ID, ACCOUNT_ID, date(2), STUDENT_ID, at(2, 9, 0));
    today.training_start_time = TrainingTime::new(9, 0).unwrap();
    attendance.insert(&today).unwrap();
    assert!(!service.has_unentered_past_attendance(&student()).unwrap());

    let mut yesterday =
        AttendanceRecord::new(STUDENT_ID, ACCOUNT_ID, date(1), STUDENT_ID, at(1, 9, 0));
    yesterday.training_start_time = TrainingTime::new(9, 0).unwrap();
    let id = attendance.insert(&yesterday).unwrap();
    assert!(service.has_unentered_past_attendance(&student()).unwrap());

    yesterday.student_attendance_id = Some(id);
    yesterday.training_end_time = TrainingTime::new(18, 0).unwrap();
    attendance.update(&yesterday).unwrap();
    assert!(!service.has_unentered_past_attendance(&student()).unwrap());
}

#[test]
fn form_binds_from_camel_case_json() {
    let mut form: AttendanceForm = serde_json::from_str(
        r#"{
            "lmsUserId": 701,
            "attendanceList": [
                {
                    "trainingDate": "2026-04-01",
                    "trainingStartHour": "09",
                    "trainingStartMinute": "15",
                    "note": "train delay"
                }
            ]
        }"#,
    )
    .unwrap();
    join_entry_times(&mut form);

    let entry = &form.attendance_list[0];
    assert_eq!(form.lms_user_id, STUDENT_ID);
    assert_eq!(entry.training_date, date(1));
    assert_eq!(entry.training_start_time, "0915");
    assert_eq!(entry.training_end_time, "");
    assert!(!entry.absent);
    assert_eq!(entry.status, AttendanceStatus::None);
}

fn setup_course() -> Connection {
    let conn = open_db_in_memory().unwrap();
    let sections = SqliteSectionRepository::try_new(&conn).unwrap();
    for day in 1..=3 {
        sections
            .insert_section(&Section::new(COURSE_ID, format!("Day {day}"), date(day)))
            .unwrap();
    }
    conn
}

fn stored_records(conn: &Connection) -> Vec<AttendanceRecord> {
    SqliteAttendanceRepository::try_new(conn)
        .unwrap()
        .find_by_user(STUDENT_ID)
        .unwrap()
}

fn service_at(conn: &Connection, now: NaiveDateTime) -> TestService<'_> {
    AttendanceService::new(
        SqliteAttendanceRepository::try_new(conn).unwrap(),
        SqliteSectionRepository::try_new(conn).unwrap(),
        DefaultMessages,
        FixedClock(now),
    )
}

fn student() -> CallerContext {
    CallerContext::student(STUDENT_ID, ACCOUNT_ID, COURSE_ID, "Ren Sato")
}

fn entry(day: u32, start: (&str, &str), end: (&str, &str), note: &str) -> DailyAttendanceEntry {
    let mut entry = DailyAttendanceEntry::new(date(day));
    entry.training_start_hour = start.0.to_string();
    entry.training_start_minute = start.1.to_string();
    entry.training_end_hour = end.0.to_string();
    entry.training_end_minute = end.1.to_string();
    entry.note = note.to_string();
    entry
}

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 4, day).unwrap()
}

fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    date(day).and_hms_opt(hour, minute, 0).unwrap()
}
