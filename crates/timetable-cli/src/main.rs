//! `timetable` CLI: manage a class timetable from the command line.
//!
//! ## Usage
//!
//! ```sh
//! # Create a term (named from the academic calendar when --name is omitted)
//! timetable term add --start 2024-08-01 --end 2024-12-15
//!
//! # Weekly classes; rejected if they overlap an existing class
//! timetable subject add --name Calculus --day wed --start 13:00 --end 15:00
//! timetable subject add --name Physics --day tue --day thu --start 10:00 --end 12:00
//!
//! # A holiday with a makeup session on another day
//! timetable holiday add --name "Mid-term break" --date 2024-10-15 \
//!   --makeup-date 2024-10-20 --makeup-start 09:00 --makeup-end 11:00
//!
//! # Show a week
//! timetable week --date 2024-10-16
//!
//! # Every class meeting of the term, or RFC 5545 rules
//! timetable export
//! timetable export --rrule
//!
//! # Back up and restore (also accepts the browser app's backup file)
//! timetable backup export -o backup.json
//! timetable backup import backup.json
//! ```
//!
//! Data lives in one JSON file (`--data`, `TIMETABLE_DATA`, default
//! `timetable.json`). Display settings come from `timetable.toml`; see
//! [`config`].

mod config;
mod file_store;
mod render;

use std::collections::BTreeSet;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use timetable_engine::clock::{parse_date, today_in};
use timetable_engine::occurrence::{expand, to_rrule};
use timetable_engine::store::BrowserBackup;
use timetable_engine::{
    export_calendar, todo, DayOfWeek, Holiday, Makeup, Priority, RecurringEntry, Schedule, ScheduleState,
    ScheduleStore, Term, TimeOfDay, Todo,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::config::CliConfig;
use crate::file_store::FileStore;

#[derive(Parser)]
#[command(name = "timetable", version, about = "Class timetable manager")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Schedule data file
    #[arg(long, global = true, env = "TIMETABLE_DATA", default_value = "timetable.json")]
    data: PathBuf,

    /// Config file (defaults to ./timetable.toml when present)
    #[arg(long, global = true, env = "TIMETABLE_CONFIG")]
    config: Option<PathBuf>,

    /// Term to operate on instead of the current one
    #[arg(long, global = true)]
    term: Option<String>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage terms
    #[command(subcommand)]
    Term(TermCommand),
    /// Manage weekly recurring classes
    #[command(subcommand)]
    Subject(SubjectCommand),
    /// Manage holidays and their makeup sessions
    #[command(subcommand)]
    Holiday(HolidayCommand),
    /// Manage todos
    #[command(subcommand)]
    Todo(TodoCommand),
    /// Show the timetable for one week
    Week {
        /// Any date in the week to show (defaults to today)
        #[arg(long, value_parser = date_arg)]
        date: Option<NaiveDate>,
        /// Print the resolved grid as JSON
        #[arg(long)]
        json: bool,
    },
    /// List every class meeting and makeup of the term
    Export {
        /// Print one RFC 5545 recurrence rule per subject instead
        #[arg(long, conflicts_with = "json")]
        rrule: bool,
        /// Print events as JSON
        #[arg(long)]
        json: bool,
    },
    /// Save or restore all data
    #[command(subcommand)]
    Backup(BackupCommand),
}

#[derive(Subcommand)]
enum TermCommand {
    /// Create a term; the first one becomes current
    Add {
        /// Display name (derived from the start date when omitted)
        #[arg(long)]
        name: Option<String>,
        #[arg(long, value_parser = date_arg)]
        start: NaiveDate,
        #[arg(long, value_parser = date_arg)]
        end: NaiveDate,
    },
    /// Change a term's name or dates
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, value_parser = date_arg)]
        start: Option<NaiveDate>,
        #[arg(long, value_parser = date_arg)]
        end: Option<NaiveDate>,
    },
    List,
    /// Make a term current
    Use { id: String },
    /// Delete a term with all its subjects, holidays and todos
    Delete { id: String },
}

#[derive(Args)]
struct SubjectFields {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    code: Option<String>,
    #[arg(long)]
    instructor: Option<String>,
    /// Meeting day (name, 3-letter abbreviation or 0-6 from Sunday); repeatable
    #[arg(long = "day", value_parser = day_arg)]
    days: Vec<DayOfWeek>,
    #[arg(long, value_parser = time_arg)]
    start: Option<TimeOfDay>,
    #[arg(long, value_parser = time_arg)]
    end: Option<TimeOfDay>,
    /// First date the class meets (defaults to the term start)
    #[arg(long, value_parser = date_arg)]
    from: Option<NaiveDate>,
    /// Last date the class meets (defaults to the term end)
    #[arg(long, value_parser = date_arg)]
    until: Option<NaiveDate>,
    #[arg(long)]
    location: Option<String>,
    #[arg(long)]
    link: Option<String>,
    #[arg(long)]
    notes: Option<String>,
}

#[derive(Subcommand)]
enum SubjectCommand {
    /// Add a class; requires --name, --day, --start and --end
    Add(SubjectFields),
    /// Change fields of an existing class
    Edit {
        id: String,
        #[command(flatten)]
        fields: SubjectFields,
    },
    Remove {
        id: String,
    },
    List {
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum HolidayCommand {
    Add {
        #[arg(long)]
        name: String,
        #[arg(long, value_parser = date_arg)]
        date: NaiveDate,
        #[arg(long, value_parser = date_arg, requires_all = ["makeup_start", "makeup_end"])]
        makeup_date: Option<NaiveDate>,
        #[arg(long, value_parser = time_arg, requires = "makeup_date")]
        makeup_start: Option<TimeOfDay>,
        #[arg(long, value_parser = time_arg, requires = "makeup_date")]
        makeup_end: Option<TimeOfDay>,
        #[arg(long, requires = "makeup_date")]
        makeup_location: Option<String>,
    },
    Remove {
        id: String,
    },
    List,
}

#[derive(Subcommand)]
enum TodoCommand {
    Add {
        text: String,
        #[arg(long, value_parser = date_arg)]
        date: NaiveDate,
        #[arg(long, value_parser = priority_arg, default_value = "medium")]
        priority: Priority,
    },
    /// Mark a todo completed
    Done {
        id: String,
        /// Mark it pending again
        #[arg(long)]
        undo: bool,
    },
    Remove {
        id: String,
    },
    List {
        /// Hide completed todos
        #[arg(long)]
        pending: bool,
        /// Only todos due on this date
        #[arg(long, value_parser = date_arg)]
        date: Option<NaiveDate>,
    },
}

#[derive(Subcommand)]
enum BackupCommand {
    /// Write all terms and their data as JSON
    Export {
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Replace all data with a backup file
    Import {
        file: PathBuf,
        /// The file is a browser app backup (collections keyed by term)
        #[arg(long)]
        browser: bool,
    },
}

// ---------------------------------------------------------------------------
// Argument parsers
// ---------------------------------------------------------------------------

fn date_arg(s: &str) -> Result<NaiveDate, String> {
    parse_date(s).map_err(|e| e.to_string())
}

fn time_arg(s: &str) -> Result<TimeOfDay, String> {
    s.parse::<TimeOfDay>().map_err(|e| e.to_string())
}

fn day_arg(s: &str) -> Result<DayOfWeek, String> {
    if let Ok(index) = s.parse::<u8>() {
        return DayOfWeek::from_index(index).map_err(|e| e.to_string());
    }
    let lower = s.to_ascii_lowercase();
    DayOfWeek::ALL
        .into_iter()
        .find(|d| lower.len() >= 3 && d.name().starts_with(&lower))
        .ok_or_else(|| format!("unknown day '{s}'"))
}

fn priority_arg(s: &str) -> Result<Priority, String> {
    match s.to_ascii_lowercase().as_str() {
        "low" => Ok(Priority::Low),
        "medium" => Ok(Priority::Medium),
        "high" => Ok(Priority::High),
        other => Err(format!("priority must be low, medium or high, got '{other}'")),
    }
}

// ---------------------------------------------------------------------------
// Setup
// ---------------------------------------------------------------------------

fn init_tracing(verbose: u8) -> Result<()> {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();
    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }
    Ok(())
}

/// The `--term` override, else the current term.
fn term_id(schedule: &Schedule<FileStore>, explicit: Option<&str>) -> Result<String> {
    match explicit {
        Some(id) => Ok(id.to_string()),
        None => schedule
            .current_term_id()
            .context("no current term; create one with `timetable term add` or pass --term"),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let config = CliConfig::load(cli.config.as_deref())?;
    let store = FileStore::open(&cli.data).with_context(|| format!("failed to open {}", cli.data.display()))?;
    let mut schedule = Schedule::new(store);
    let term = cli.term.as_deref();

    match cli.command {
        Commands::Term(cmd) => run_term(&mut schedule, &config, cmd),
        Commands::Subject(cmd) => run_subject(&mut schedule, term, cmd),
        Commands::Holiday(cmd) => run_holiday(&mut schedule, term, cmd),
        Commands::Todo(cmd) => run_todo(&mut schedule, &config, term, cmd),
        Commands::Week { date, json } => run_week(&schedule, &config, term, date, json),
        Commands::Export { rrule, json } => run_export(&schedule, term, rrule, json),
        Commands::Backup(cmd) => run_backup(schedule.into_store(), cmd),
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn run_term(schedule: &mut Schedule<FileStore>, config: &CliConfig, cmd: TermCommand) -> Result<()> {
    match cmd {
        TermCommand::Add { name, start, end } => {
            let name = name.unwrap_or_else(|| config.academic.term_name(start));
            let id = schedule.add_term(Term {
                id: String::new(),
                name,
                start_date: start,
                end_date: end,
            })?;
            println!("{id}");
        }
        TermCommand::Edit { id, name, start, end } => {
            let current = schedule.snapshot(&id)?.term;
            schedule.update_term(
                &id,
                Term {
                    id: id.clone(),
                    name: name.unwrap_or(current.name),
                    start_date: start.unwrap_or(current.start_date),
                    end_date: end.unwrap_or(current.end_date),
                },
            )?;
        }
        TermCommand::List => {
            let current = schedule.store().current_term()?;
            for t in schedule.store().terms()? {
                println!("{}", render::term_line(&t, current.as_deref() == Some(t.id.as_str())));
            }
        }
        TermCommand::Use { id } => schedule.switch_term(&id)?,
        TermCommand::Delete { id } => schedule.delete_term(&id)?,
    }
    Ok(())
}

fn run_subject(schedule: &mut Schedule<FileStore>, term: Option<&str>, cmd: SubjectCommand) -> Result<()> {
    let term_id = term_id(schedule, term)?;
    match cmd {
        SubjectCommand::Add(fields) => {
            let dataset = schedule.snapshot(&term_id)?;
            let entry = new_entry(fields, &dataset.term)?;
            let id = schedule.add_entry(&term_id, entry)?;
            println!("{id}");
        }
        SubjectCommand::Edit { id, fields } => {
            let dataset = schedule.snapshot(&term_id)?;
            let existing = dataset
                .subjects
                .get(&id)
                .cloned()
                .ok_or_else(|| anyhow!("entry not found: {id}"))?;
            schedule.update_entry(&term_id, &id, apply_fields(existing, fields))?;
        }
        SubjectCommand::Remove { id } => {
            schedule.remove_entry(&term_id, &id)?;
        }
        SubjectCommand::List { json } => {
            let dataset = schedule.snapshot(&term_id)?;
            let mut entries: Vec<&RecurringEntry> = dataset.subjects.values().collect();
            entries.sort_by_key(|e| (e.days.first().copied(), e.start_time, e.id.clone()));
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                for e in entries {
                    println!("{}", render::entry_line(e));
                }
            }
        }
    }
    Ok(())
}

fn new_entry(fields: SubjectFields, term: &Term) -> Result<RecurringEntry> {
    let name = fields.name.context("--name is required")?;
    if fields.days.is_empty() {
        bail!("at least one --day is required");
    }
    let start_time = fields.start.context("--start is required")?;
    let end_time = fields.end.context("--end is required")?;
    Ok(RecurringEntry {
        id: String::new(),
        name,
        code: fields.code.unwrap_or_default(),
        instructor: fields.instructor.unwrap_or_default(),
        days: fields.days.into_iter().collect(),
        start_time,
        end_time,
        start_date: fields.from.unwrap_or(term.start_date),
        end_date: fields.until.unwrap_or(term.end_date),
        location: fields.location.unwrap_or_default(),
        online_link: fields.link.filter(|s| !s.is_empty()),
        notes: fields.notes.filter(|s| !s.is_empty()),
    })
}

fn apply_fields(mut entry: RecurringEntry, fields: SubjectFields) -> RecurringEntry {
    if let Some(v) = fields.name {
        entry.name = v;
    }
    if let Some(v) = fields.code {
        entry.code = v;
    }
    if let Some(v) = fields.instructor {
        entry.instructor = v;
    }
    if !fields.days.is_empty() {
        entry.days = fields.days.into_iter().collect::<BTreeSet<_>>();
    }
    if let Some(v) = fields.start {
        entry.start_time = v;
    }
    if let Some(v) = fields.end {
        entry.end_time = v;
    }
    if let Some(v) = fields.from {
        entry.start_date = v;
    }
    if let Some(v) = fields.until {
        entry.end_date = v;
    }
    if let Some(v) = fields.location {
        entry.location = v;
    }
    if let Some(v) = fields.link {
        entry.online_link = Some(v).filter(|s| !s.is_empty());
    }
    if let Some(v) = fields.notes {
        entry.notes = Some(v).filter(|s| !s.is_empty());
    }
    entry
}

fn run_holiday(schedule: &mut Schedule<FileStore>, term: Option<&str>, cmd: HolidayCommand) -> Result<()> {
    let term_id = term_id(schedule, term)?;
    match cmd {
        HolidayCommand::Add {
            name,
            date,
            makeup_date,
            makeup_start,
            makeup_end,
            makeup_location,
        } => {
            let makeup = match (makeup_date, makeup_start, makeup_end) {
                (Some(date), Some(start_time), Some(end_time)) => Some(Makeup {
                    date,
                    start_time,
                    end_time,
                    location: makeup_location,
                }),
                (None, None, None) => None,
                _ => bail!("a makeup needs --makeup-date, --makeup-start and --makeup-end"),
            };
            let id = schedule.add_holiday(
                &term_id,
                Holiday {
                    id: String::new(),
                    name,
                    date,
                    makeup,
                },
            )?;
            println!("{id}");
        }
        HolidayCommand::Remove { id } => {
            schedule.remove_holiday(&term_id, &id)?;
        }
        HolidayCommand::List => {
            let dataset = schedule.snapshot(&term_id)?;
            let mut holidays: Vec<&Holiday> = dataset.holidays.values().collect();
            holidays.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
            for h in holidays {
                println!("{}", render::holiday_line(h));
            }
        }
    }
    Ok(())
}

fn run_todo(
    schedule: &mut Schedule<FileStore>,
    config: &CliConfig,
    term: Option<&str>,
    cmd: TodoCommand,
) -> Result<()> {
    let term_id = term_id(schedule, term)?;
    match cmd {
        TodoCommand::Add { text, date, priority } => {
            let id = schedule.add_todo(
                &term_id,
                Todo {
                    id: String::new(),
                    text,
                    date,
                    priority,
                    completed: false,
                },
            )?;
            println!("{id}");
        }
        TodoCommand::Done { id, undo } => schedule.set_todo_completed(&term_id, &id, !undo)?,
        TodoCommand::Remove { id } => {
            schedule.remove_todo(&term_id, &id)?;
        }
        TodoCommand::List { pending, date } => {
            let dataset = schedule.snapshot(&term_id)?;
            let today = today_in(config.timezone()?);
            let list = match (pending, date) {
                (_, Some(d)) => todo::due_on(dataset.todos.values().filter(|t| !pending || !t.completed), d),
                (true, None) => todo::pending(dataset.todos.values()),
                (false, None) => todo::ordered(dataset.todos.values()),
            };
            for t in list {
                println!("{}", render::todo_line(t, today));
            }
        }
    }
    Ok(())
}

fn run_week(
    schedule: &Schedule<FileStore>,
    config: &CliConfig,
    term: Option<&str>,
    date: Option<NaiveDate>,
    json: bool,
) -> Result<()> {
    let term_id = term_id(schedule, term)?;
    let week_of = match date {
        Some(d) => d,
        None => today_in(config.timezone()?),
    };
    let grid_config = config.grid()?;
    let term = schedule.snapshot(&term_id)?.term;

    let output = schedule.with_week(&term_id, week_of, &grid_config, |grid| {
        if json {
            serde_json::to_string_pretty(grid).map_err(anyhow::Error::from)
        } else {
            Ok(render::week(grid, &term))
        }
    })??;
    print!("{output}");
    if json {
        println!();
    }
    Ok(())
}

fn run_export(schedule: &Schedule<FileStore>, term: Option<&str>, rrule: bool, json: bool) -> Result<()> {
    let term_id = term_id(schedule, term)?;
    let dataset = schedule.snapshot(&term_id)?;

    if rrule {
        for entry in dataset.subjects.values() {
            let Some(first) = expand(entry).first().map(|o| o.start) else {
                continue;
            };
            println!(
                "{}  {}  DTSTART:{}  RRULE:{}",
                entry.id,
                entry.name,
                first.format("%Y%m%dT%H%M%S"),
                to_rrule(entry)
            );
        }
        return Ok(());
    }

    let events = export_calendar(&dataset);
    if json {
        println!("{}", serde_json::to_string_pretty(&events)?);
    } else {
        for event in &events {
            println!("{}", render::event_line(event));
        }
    }
    Ok(())
}

fn run_backup(mut store: FileStore, cmd: BackupCommand) -> Result<()> {
    match cmd {
        BackupCommand::Export { output } => {
            let json = store.state().export_json()?;
            match output {
                Some(path) => write_file(&path, &json)?,
                None => println!("{json}"),
            }
        }
        BackupCommand::Import { file, browser } => {
            let text =
                std::fs::read_to_string(&file).with_context(|| format!("failed to read {}", file.display()))?;
            let state = if browser {
                BrowserBackup::from_json(&text)?.into_state()?
            } else {
                ScheduleState::import_json(&text)?
            };
            let terms = state.terms.len();
            store.replace(state)?;
            println!("imported {terms} term(s)");
        }
    }
    Ok(())
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
}
