//! Decide which single entity occupies a timetable cell.
//!
//! Precedence, first match wins:
//!
//! 1. a makeup session scheduled on that exact date covering the slot,
//! 2. a holiday dated exactly that date (cancels every class that day),
//! 3. a recurring entry meeting on that weekday, active on that date, whose
//!    time range covers the slot,
//! 4. nothing.
//!
//! Holidays and makeups are matched by absolute date, never by weekday, so a
//! one-time holiday does not recur and a makeup may land on any weekday.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::warn;

use crate::clock::{is_time_in_range, start_of_week, week_days, DayOfWeek, TimeOfDay, WeekStart};
use crate::dataset::TermDataset;
use crate::error::Result;
use crate::model::{Holiday, RecurringEntry};

/// What a single timetable cell renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "payload")]
pub enum CellContent<'a> {
    Empty,
    Subject(&'a RecurringEntry),
    Holiday(&'a Holiday),
    Makeup(&'a Holiday),
}

impl CellContent<'_> {
    pub fn is_empty(&self) -> bool {
        matches!(self, CellContent::Empty)
    }

    /// Id of the occupying record, if any.
    pub fn occupant_id(&self) -> Option<&str> {
        match self {
            CellContent::Empty => None,
            CellContent::Subject(e) => Some(&e.id),
            CellContent::Holiday(h) | CellContent::Makeup(h) => Some(&h.id),
        }
    }
}

/// Which precedence tier produced an ambiguous match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OccupantKind {
    Subject,
    Makeup,
}

/// More than one record of the same tier matched one cell.
///
/// Writes go through the conflict checker, so this only happens with data
/// that bypassed it. The lowest id is rendered; the rest are reported here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrityWarning {
    pub date: NaiveDate,
    pub slot: TimeOfDay,
    pub kind: OccupantKind,
    pub chosen: String,
    pub others: Vec<String>,
}

/// Resolve one cell and report any same-tier ambiguity.
pub fn resolve_slot_checked<'a>(
    dataset: &'a TermDataset,
    day: DayOfWeek,
    slot: TimeOfDay,
    date: NaiveDate,
) -> (CellContent<'a>, Option<IntegrityWarning>) {
    let makeups = dataset.holidays.values().filter(|h| {
        h.makeup.as_ref().is_some_and(|m| {
            m.date == date && is_time_in_range(slot, m.start_time, m.end_time)
        })
    });
    if let Some((holiday, warning)) = pick_lowest(makeups, |h| &h.id, date, slot, OccupantKind::Makeup) {
        return (CellContent::Makeup(holiday), warning);
    }

    // Several holidays on one date all cancel the same day; show the lowest id.
    if let Some(holiday) = dataset.holidays_on(date).min_by(|a, b| a.id.cmp(&b.id)) {
        return (CellContent::Holiday(holiday), None);
    }

    let subjects = dataset
        .entries_on(day)
        .filter(|e| e.is_active_on(date) && is_time_in_range(slot, e.start_time, e.end_time));
    if let Some((entry, warning)) = pick_lowest(subjects, |e| &e.id, date, slot, OccupantKind::Subject) {
        return (CellContent::Subject(entry), warning);
    }

    (CellContent::Empty, None)
}

/// Resolve one cell. Ambiguities are logged and broken by lowest id.
pub fn resolve_slot<'a>(
    dataset: &'a TermDataset,
    day: DayOfWeek,
    slot: TimeOfDay,
    date: NaiveDate,
) -> CellContent<'a> {
    resolve_slot_checked(dataset, day, slot, date).0
}

/// Choose the lowest-id candidate. Dataset maps iterate in id order, so this
/// is the first item; any further items become a warning.
fn pick_lowest<'a, T, I, F>(
    candidates: I,
    id_of: F,
    date: NaiveDate,
    slot: TimeOfDay,
    kind: OccupantKind,
) -> Option<(&'a T, Option<IntegrityWarning>)>
where
    I: Iterator<Item = &'a T>,
    F: Fn(&'a T) -> &'a String,
{
    let mut matches = candidates.collect::<Vec<&'a T>>();
    matches.sort_by(|&a, &b| id_of(a).cmp(id_of(b)));
    let (&chosen, rest) = matches.split_first()?;
    if rest.is_empty() {
        return Some((chosen, None));
    }

    let others: Vec<String> = rest.iter().map(|&c| id_of(c).clone()).collect();
    warn!(
        %date,
        %slot,
        ?kind,
        chosen = %id_of(chosen),
        others = ?others,
        "multiple records occupy one cell; rendering the lowest id"
    );
    Some((
        chosen,
        Some(IntegrityWarning {
            date,
            slot,
            kind,
            chosen: id_of(chosen).clone(),
            others,
        }),
    ))
}

/// Time rows and week convention for a rendered grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GridConfig {
    pub week_start: WeekStart,
    pub slots: Vec<TimeOfDay>,
}

impl GridConfig {
    pub const FIRST_SLOT: TimeOfDay = TimeOfDay(8 * 60);
    pub const LAST_SLOT: TimeOfDay = TimeOfDay(19 * 60);
}

impl Default for GridConfig {
    /// Hourly rows from 08:00 through 19:00, weeks starting on Sunday.
    fn default() -> Self {
        GridConfig {
            week_start: WeekStart::Sunday,
            slots: (Self::FIRST_SLOT.0..=Self::LAST_SLOT.0)
                .step_by(60)
                .map(TimeOfDay)
                .collect(),
        }
    }
}

/// Build a row list from `start` up to and including `end`, every `step_minutes`.
/// A step longer than the range yields just `start`.
pub fn time_slots(start: TimeOfDay, end: TimeOfDay, step_minutes: u32) -> Result<Vec<TimeOfDay>> {
    if step_minutes == 0 {
        return Err(crate::error::TimetableError::InvalidTime(
            "slot step must be at least one minute".to_string(),
        ));
    }
    let mut slots = Vec::new();
    let mut cursor = start.minutes();
    while cursor <= end.minutes() {
        slots.push(TimeOfDay::from_minutes(cursor)?);
        match cursor.checked_add(step_minutes) {
            Some(next) => cursor = next,
            None => break,
        }
    }
    Ok(slots)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayColumn {
    pub day: DayOfWeek,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridRow<'a> {
    pub slot: TimeOfDay,
    /// One cell per entry of [`WeekGrid::days`], in the same order.
    pub cells: Vec<CellContent<'a>>,
}

/// A fully resolved week: seven day columns by one row per time slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekGrid<'a> {
    pub week_start: NaiveDate,
    pub days: Vec<DayColumn>,
    pub rows: Vec<GridRow<'a>>,
    pub warnings: Vec<IntegrityWarning>,
}

impl<'a> WeekGrid<'a> {
    pub fn cell(&self, row: usize, column: usize) -> Option<&CellContent<'a>> {
        self.rows.get(row).and_then(|r| r.cells.get(column))
    }
}

/// Resolve every cell of the week containing `week_of`.
pub fn resolve_week<'a>(dataset: &'a TermDataset, week_of: NaiveDate, config: &GridConfig) -> WeekGrid<'a> {
    let week_start = start_of_week(week_of, config.week_start);
    let days: Vec<DayColumn> = week_days(week_start)
        .into_iter()
        .map(|date| DayColumn {
            day: DayOfWeek::of(date),
            date,
        })
        .collect();

    let mut warnings = Vec::new();
    let rows = config
        .slots
        .iter()
        .map(|&slot| GridRow {
            slot,
            cells: days
                .iter()
                .map(|col| {
                    let (cell, warning) = resolve_slot_checked(dataset, col.day, slot, col.date);
                    warnings.extend(warning);
                    cell
                })
                .collect(),
        })
        .collect();

    WeekGrid {
        week_start,
        days,
        rows,
        warnings,
    }
}
