//! Recurring entry expansion -- converts a weekly entry into the concrete
//! dates it meets on, and builds calendar exports from a whole term.
//!
//! Grid rendering does not go through here; the resolver matches cells
//! directly by weekday and period.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::clock::DayOfWeek;
use crate::dataset::TermDataset;
use crate::model::RecurringEntry;

/// A single meeting of a recurring entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Occurrence {
    pub entry_id: String,
    pub date: NaiveDate,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// Dates on which `entry` meets on `day`.
///
/// Starts at the first date on or after `entry.start_date` that falls on
/// `day`, then steps a week at a time while the date is on or before
/// `entry.end_date`. Empty when the period contains no such weekday.
pub fn expand_dates(entry: &RecurringEntry, day: DayOfWeek) -> Vec<NaiveDate> {
    let start_index = i64::from(DayOfWeek::of(entry.start_date).index());
    let lead = (i64::from(day.index()) - start_index).rem_euclid(7);

    let mut dates = Vec::new();
    let mut current = entry.start_date + Duration::days(lead);
    while current <= entry.end_date {
        dates.push(current);
        current += Duration::weeks(1);
    }
    dates
}

/// Every meeting of `entry` across all its days, sorted by date.
pub fn expand(entry: &RecurringEntry) -> Vec<Occurrence> {
    let start = entry.start_time.to_naive_time();
    let end = entry.end_time.to_naive_time();

    let mut occurrences: Vec<Occurrence> = entry
        .days
        .iter()
        .flat_map(|&day| expand_dates(entry, day))
        .map(|date| Occurrence {
            entry_id: entry.id.clone(),
            date,
            start: date.and_time(start),
            end: date.and_time(end),
        })
        .collect();

    occurrences.sort_by_key(|o| o.start);
    occurrences
}

/// Render `entry` as an RFC 5545 recurrence rule, e.g.
/// `FREQ=WEEKLY;BYDAY=MO,WE;UNTIL=20241215T235959`.
///
/// The rule is meant to be paired with a DTSTART at the first occurrence; it
/// yields the same dates as [`expand`].
pub fn to_rrule(entry: &RecurringEntry) -> String {
    let byday: Vec<&str> = entry.days.iter().map(|d| d.rrule_code()).collect();
    format!(
        "FREQ=WEEKLY;BYDAY={};UNTIL={}T235959",
        byday.join(","),
        entry.end_date.format("%Y%m%d")
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Class,
    Makeup,
}

/// One dated event in a term calendar export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub kind: EventKind,
    /// Id of the entry (for classes) or holiday (for makeups).
    pub source_id: String,
    pub title: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// Every class meeting in the term minus those cancelled by a holiday, plus
/// each makeup session, sorted by start then source id.
pub fn export_calendar(dataset: &TermDataset) -> Vec<CalendarEvent> {
    let mut events: Vec<CalendarEvent> = dataset
        .subjects
        .values()
        .flat_map(|entry| {
            expand(entry)
                .into_iter()
                .filter(|o| !dataset.is_holiday(o.date))
                .map(move |o| CalendarEvent {
                    kind: EventKind::Class,
                    source_id: entry.id.clone(),
                    title: entry.name.clone(),
                    start: o.start,
                    end: o.end,
                    location: Some(entry.location.clone()).filter(|l| !l.is_empty()),
                })
        })
        .collect();

    events.extend(dataset.holidays.values().filter_map(|h| {
        h.makeup.as_ref().map(|m| CalendarEvent {
            kind: EventKind::Makeup,
            source_id: h.id.clone(),
            title: format!("Makeup: {}", h.name),
            start: m.date.and_time(m.start_time.to_naive_time()),
            end: m.date.and_time(m.end_time.to_naive_time()),
            location: m.location.clone(),
        })
    }));

    events.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.source_id.cmp(&b.source_id)));
    events
}
