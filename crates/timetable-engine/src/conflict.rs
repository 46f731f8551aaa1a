//! Detect overlapping recurring entries before they are written.
//!
//! Entries are compared per shared weekday. Two time ranges overlap when
//! `a.start < b.end && b.start < a.end`; adjacent ranges (one ends exactly when
//! the other starts) are NOT conflicts. Validity periods are not consulted:
//! two entries on the same weekday conflict even if their date ranges never
//! meet.

use crate::clock::DayOfWeek;
use crate::error::{Result, TimetableError};
use crate::model::RecurringEntry;

/// An existing entry that collides with a candidate on one weekday.
#[derive(Debug, Clone, PartialEq)]
pub struct Conflict<'a> {
    pub day: DayOfWeek,
    pub entry: &'a RecurringEntry,
    pub overlap_minutes: i64,
}

/// Find every (day, entry) pair where `candidate` overlaps an existing entry.
///
/// `exclude_id` skips one entry, normally the candidate's own stored version
/// during an edit. Results are ordered by day, then by the order of
/// `existing`.
pub fn find_conflicts<'a, I>(existing: I, candidate: &RecurringEntry, exclude_id: Option<&str>) -> Vec<Conflict<'a>>
where
    I: IntoIterator<Item = &'a RecurringEntry>,
{
    let start = i64::from(candidate.start_time.minutes());
    let end = i64::from(candidate.end_time.minutes());

    let others: Vec<&RecurringEntry> = existing
        .into_iter()
        .filter(|e| Some(e.id.as_str()) != exclude_id)
        .collect();

    let mut conflicts = Vec::new();
    for &day in &candidate.days {
        for &entry in others.iter().filter(|e| e.meets_on(day)) {
            let entry_start = i64::from(entry.start_time.minutes());
            let entry_end = i64::from(entry.end_time.minutes());

            if start < entry_end && end > entry_start {
                conflicts.push(Conflict {
                    day,
                    entry,
                    overlap_minutes: end.min(entry_end) - start.max(entry_start),
                });
            }
        }
    }

    conflicts
}

/// True if `candidate` overlaps any entry in `existing` on a shared weekday.
pub fn has_conflict<'a, I>(existing: I, candidate: &RecurringEntry, exclude_id: Option<&str>) -> bool
where
    I: IntoIterator<Item = &'a RecurringEntry>,
{
    !find_conflicts(existing, candidate, exclude_id).is_empty()
}

/// Gate a write: `Ok(())` if `candidate` fits, otherwise the first conflict
/// (lowest day, then first entry) as `ScheduleConflict`.
///
/// A multi-day candidate is rejected as a whole if any single day collides.
pub fn check_entry<'a, I>(existing: I, candidate: &RecurringEntry, exclude_id: Option<&str>) -> Result<()>
where
    I: IntoIterator<Item = &'a RecurringEntry>,
{
    match find_conflicts(existing, candidate, exclude_id).into_iter().next() {
        None => Ok(()),
        Some(c) => Err(TimetableError::ScheduleConflict {
            day: c.day,
            conflicting: Box::new(c.entry.clone()),
        }),
    }
}
