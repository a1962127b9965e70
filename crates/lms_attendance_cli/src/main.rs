//! Command-line front end for student attendance.
//!
//! # Responsibility
//! - Parse caller identity and operation from arguments.
//! - Wire configuration, logging, storage and the attendance service.
//! - Print business outcomes; exit non-zero only on infrastructure failure.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use lms_attendance_core::db::open_db;
use lms_attendance_core::{
    init_logging, AttendanceConfig, AttendanceService, CallerContext, DefaultMessages,
    PunchOutcome, Section, SectionRepository, SqliteAttendanceRepository,
    SqliteSectionRepository, SystemClock,
};
use log::info;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "lms-attendance", version, about = "Student attendance punch and review")]
struct Cli {
    /// SQLite database file. Overrides LMS_ATTENDANCE_DATABASE_PATH.
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// Absolute directory for log files. Overrides LMS_ATTENDANCE_LOG_DIR.
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Schedule a section (training day) for a course.
    SeedSection {
        #[arg(long)]
        course: i64,
        #[arg(long)]
        name: String,
        /// Training date, YYYY-MM-DD.
        #[arg(long)]
        date: NaiveDate,
    },
    /// Record today's start time.
    PunchIn(StudentArgs),
    /// Record today's end time.
    PunchOut(StudentArgs),
    /// Print the attendance list of one student.
    List(StudentArgs),
    /// Report whether past days are missing a start or end time.
    Unentered(StudentArgs),
}

#[derive(Debug, Args)]
struct StudentArgs {
    #[arg(long)]
    user: i64,
    #[arg(long, default_value_t = 1)]
    account: i64,
    #[arg(long)]
    course: i64,
    #[arg(long, default_value = "")]
    name: String,
}

impl StudentArgs {
    fn caller(&self) -> CallerContext {
        CallerContext::student(self.user, self.account, self.course, self.name.as_str())
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = AttendanceConfig::from_env().context("failed to load configuration")?;
    if let Some(db) = cli.db {
        config.database_path = db;
    }
    if let Some(log_dir) = cli.log_dir {
        config.log_dir = Some(log_dir);
    }

    if let Some(log_dir) = &config.log_dir {
        init_logging(&config.log_level, log_dir)
            .map_err(anyhow::Error::msg)
            .context("failed to initialize logging")?;
    }

    let conn = open_db(&config.database_path).with_context(|| {
        format!(
            "failed to open database `{}`",
            config.database_path.display()
        )
    })?;
    let service = AttendanceService::new(
        SqliteAttendanceRepository::try_new(&conn)?,
        SqliteSectionRepository::try_new(&conn)?,
        DefaultMessages,
        SystemClock,
    )
    .with_status_deriver(config.status_deriver())
    .with_note_max_chars(config.note_max_chars);

    match cli.command {
        Command::SeedSection { course, name, date } => {
            let sections = SqliteSectionRepository::try_new(&conn)?;
            let section_id = sections.insert_section(&Section::new(course, name, date))?;
            info!("event=seed_section module=cli status=ok course_id={course} section_id={section_id}");
            println!("section {section_id} scheduled on {date}");
        }
        Command::PunchIn(args) => print_outcome(service.punch_in(&args.caller())?),
        Command::PunchOut(args) => print_outcome(service.punch_out(&args.caller())?),
        Command::List(args) => {
            let rows = service.get_attendance_management(args.course, args.user)?;
            for row in rows {
                println!(
                    "{}{} {:<5} {:<5} {:<6} {:<18} {}",
                    row.training_date,
                    if row.is_today { "*" } else { " " },
                    row.training_start_time.formatted(),
                    row.training_end_time.formatted(),
                    row.blank_time_value.unwrap_or_default(),
                    row.status_disp_name,
                    row.note
                );
            }
        }
        Command::Unentered(args) => {
            if service.has_unentered_past_attendance(&args.caller())? {
                println!("some past training days are missing a start or end time");
            } else {
                println!("all past training days are entered");
            }
        }
    }

    Ok(())
}

fn print_outcome(outcome: PunchOutcome) {
    match outcome {
        PunchOutcome::Recorded(message) => println!("{message}"),
        PunchOutcome::Rejected(message) => eprintln!("{message}"),
    }
}
