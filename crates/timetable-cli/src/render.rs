//! Plain-text rendering of week grids and record lists.

use std::fmt::Write as _;

use chrono::NaiveDate;
use timetable_engine::clock::{relative_day, DayOfWeek};
use timetable_engine::occurrence::{CalendarEvent, EventKind};
use timetable_engine::{CellContent, Holiday, RecurringEntry, Term, Todo, WeekGrid};

const TIME_WIDTH: usize = 6;
const CELL_WIDTH: usize = 14;

/// Fit `text` into exactly `width` columns, cutting with `~` when too long.
fn fit(text: &str, width: usize) -> String {
    let count = text.chars().count();
    if count <= width {
        format!("{text:<width$}")
    } else {
        let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
        cut.push('~');
        cut
    }
}

fn cell_label(cell: &CellContent<'_>) -> String {
    match cell {
        CellContent::Empty => String::new(),
        CellContent::Subject(e) => e.name.clone(),
        CellContent::Holiday(h) => format!("* {}", h.name),
        CellContent::Makeup(h) => format!("+ {}", h.name),
    }
}

fn short_day(day: DayOfWeek) -> String {
    day.to_string().chars().take(3).collect()
}

/// Week table: one column per day, one row per slot, followed by a legend
/// and any integrity warnings.
pub fn week(grid: &WeekGrid<'_>, term: &Term) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} -- week of {}", term.name, grid.week_start);

    let _ = write!(out, "{}", fit("", TIME_WIDTH));
    for col in &grid.days {
        let header = format!("{} {}", short_day(col.day), col.date.format("%d/%m"));
        let _ = write!(out, "|{}", fit(&header, CELL_WIDTH));
    }
    out.push('\n');

    for row in &grid.rows {
        let _ = write!(out, "{}", fit(&row.slot.to_string(), TIME_WIDTH));
        for cell in &row.cells {
            let _ = write!(out, "|{}", fit(&cell_label(cell), CELL_WIDTH));
        }
        out.push('\n');
    }

    out.push_str("* holiday  + makeup\n");
    for w in &grid.warnings {
        let _ = writeln!(
            out,
            "warning: {} {} has several {:?} records; showing {} (also {})",
            w.date,
            w.slot,
            w.kind,
            w.chosen,
            w.others.join(", ")
        );
    }
    out
}

pub fn term_line(term: &Term, current: bool) -> String {
    format!(
        "{} {}  {}  {}..{}",
        if current { "*" } else { " " },
        term.id,
        term.name,
        term.start_date,
        term.end_date
    )
}

pub fn entry_line(entry: &RecurringEntry) -> String {
    let days: Vec<String> = entry.days.iter().map(|&d| short_day(d)).collect();
    let mut line = format!(
        "{}  {} {}-{}  {}",
        entry.id,
        days.join(","),
        entry.start_time,
        entry.end_time,
        entry.name
    );
    if !entry.code.is_empty() {
        let _ = write!(line, " ({})", entry.code);
    }
    if !entry.location.is_empty() {
        let _ = write!(line, " @ {}", entry.location);
    }
    let _ = write!(line, "  {}..{}", entry.start_date, entry.end_date);
    line
}

pub fn holiday_line(holiday: &Holiday) -> String {
    let mut line = format!("{}  {}  {}", holiday.id, holiday.date, holiday.name);
    if let Some(m) = &holiday.makeup {
        let _ = write!(line, "  makeup {} {}-{}", m.date, m.start_time, m.end_time);
        if let Some(loc) = &m.location {
            let _ = write!(line, " @ {loc}");
        }
    }
    line
}

pub fn todo_line(todo: &Todo, today: NaiveDate) -> String {
    format!(
        "[{}] {}  {} ({})  {:?}  {}",
        if todo.completed { "x" } else { " " },
        todo.id,
        todo.date,
        relative_day(todo.date, today),
        todo.priority,
        todo.text
    )
}

pub fn event_line(event: &CalendarEvent) -> String {
    let kind = match event.kind {
        EventKind::Class => "class",
        EventKind::Makeup => "makeup",
    };
    let mut line = format!(
        "{} {}-{}  {:<6}  {}",
        event.start.date(),
        event.start.format("%H:%M"),
        event.end.format("%H:%M"),
        kind,
        event.title
    );
    if let Some(loc) = &event.location {
        let _ = write!(line, " @ {loc}");
    }
    line
}
