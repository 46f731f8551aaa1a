//! The per-term snapshot the core operates on, and normalization of the two
//! stored subject layouts into it.
//!
//! Subjects arrive either flat (one record per subject with a `dayOfWeek`) or
//! bucketed (`{"monday": [entry, ...], ...}`). Both collapse into
//! [`RecurringEntry`] values carrying a day set, so the resolver and conflict
//! checker only ever see one shape.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::clock::{parse_date, DayOfWeek, TimeOfDay};
use crate::error::{Result, TimetableError};
use crate::model::{Holiday, Makeup, Priority, RecurringEntry, Term, Todo};

/// All schedule data for one term, keyed by record id.
///
/// `BTreeMap` keeps iteration in id order, which makes every scan over the
/// snapshot deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TermDataset {
    pub term: Term,
    #[serde(default)]
    pub subjects: BTreeMap<String, RecurringEntry>,
    #[serde(default)]
    pub holidays: BTreeMap<String, Holiday>,
    #[serde(default)]
    pub todos: BTreeMap<String, Todo>,
}

impl TermDataset {
    pub fn new(term: Term) -> Self {
        TermDataset {
            term,
            subjects: BTreeMap::new(),
            holidays: BTreeMap::new(),
            todos: BTreeMap::new(),
        }
    }

    /// Entries that meet on `day`, in id order.
    pub fn entries_on(&self, day: DayOfWeek) -> impl Iterator<Item = &RecurringEntry> {
        self.subjects.values().filter(move |e| e.meets_on(day))
    }

    /// Holidays dated exactly `date`, in id order.
    pub fn holidays_on(&self, date: NaiveDate) -> impl Iterator<Item = &Holiday> {
        self.holidays.values().filter(move |h| h.date == date)
    }

    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holidays_on(date).next().is_some()
    }
}

/// Flat subject record: one weekday per record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawSubject {
    pub id: Option<String>,
    pub name: String,
    pub code: String,
    pub instructor: String,
    pub day_of_week: u8,
    pub start_time: String,
    pub end_time: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub location: String,
    pub online_link: Option<String>,
    pub notes: Option<String>,
}

/// Entry inside a day bucket of a bucketed timetable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawTimetableEntry {
    pub id: String,
    pub subject_name: String,
    pub subject_code: String,
    pub instructor: String,
    pub start_time: String,
    pub end_time: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub location: String,
    pub online_link: Option<String>,
    pub notes: Option<String>,
}

/// Holiday record with makeup details flattened alongside a `hasMakeup` flag.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawHoliday {
    pub id: Option<String>,
    pub name: String,
    pub date: String,
    pub has_makeup: bool,
    pub makeup_date: Option<String>,
    pub makeup_start_time: Option<String>,
    pub makeup_end_time: Option<String>,
    pub makeup_location: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawTodo {
    pub id: Option<String>,
    pub text: String,
    pub date: String,
    pub priority: Priority,
    pub completed: bool,
}

/// A term's collections as they are stored by the browser application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawTermDataset {
    pub subjects: BTreeMap<String, RawSubject>,
    /// Day-name buckets (`"monday"`, ...) of timetable entries.
    pub timetable: BTreeMap<String, Vec<RawTimetableEntry>>,
    pub holidays: BTreeMap<String, RawHoliday>,
    pub todos: BTreeMap<String, RawTodo>,
}

impl RawTermDataset {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Convert into the canonical snapshot for `term`.
    ///
    /// Subjects without their own validity period inherit the term's. A
    /// bucketed entry id that appears under several days becomes one entry
    /// meeting on all of them when the copies agree on everything but the
    /// day. Copies that disagree are kept apart as `{id}-{day}`.
    ///
    /// # Errors
    /// Returns `InvalidDate` / `InvalidTime` for malformed fields and
    /// `InvalidEntry` for records that fail validation, for bucketed entries
    /// without an id, and for one id listed twice on the same day with
    /// different details. The error message names the offending record.
    pub fn normalize(self, term: Term) -> Result<TermDataset> {
        term.validate()?;
        let mut subjects: BTreeMap<String, RecurringEntry> = BTreeMap::new();

        for (key, raw) in self.subjects {
            let id = raw.id.clone().unwrap_or(key);
            let day = DayOfWeek::from_index(raw.day_of_week).map_err(|e| context(&id, e))?;
            let fields = EntryFields {
                name: raw.name,
                code: raw.code,
                instructor: raw.instructor,
                start_time: raw.start_time,
                end_time: raw.end_time,
                start_date: raw.start_date,
                end_date: raw.end_date,
                location: raw.location,
                online_link: raw.online_link,
                notes: raw.notes,
            };
            let entry = fields.into_entry(&id, day, &term).map_err(|e| context(&id, e))?;
            merge_entry(&mut subjects, entry)?;
        }

        for (day_name, bucket) in self.timetable {
            let day = DayOfWeek::from_name(&day_name)?;
            for (index, raw) in bucket.into_iter().enumerate() {
                let id = raw.id.trim().to_string();
                if id.is_empty() {
                    return Err(TimetableError::InvalidEntry(format!(
                        "{day_name}[{index}]: timetable entry '{}' has no id",
                        raw.subject_name
                    )));
                }
                let fields = EntryFields {
                    name: raw.subject_name,
                    code: raw.subject_code,
                    instructor: raw.instructor,
                    start_time: raw.start_time,
                    end_time: raw.end_time,
                    start_date: raw.start_date,
                    end_date: raw.end_date,
                    location: raw.location,
                    online_link: raw.online_link,
                    notes: raw.notes,
                };
                let entry = fields.into_entry(&id, day, &term).map_err(|e| context(&id, e))?;
                merge_entry(&mut subjects, entry)?;
            }
        }

        let mut holidays = BTreeMap::new();
        for (key, raw) in self.holidays {
            let id = raw.id.clone().unwrap_or(key);
            let holiday = raw.into_holiday(&id).map_err(|e| context(&id, e))?;
            holidays.insert(id, holiday);
        }

        let mut todos = BTreeMap::new();
        for (key, raw) in self.todos {
            let id = raw.id.unwrap_or(key);
            let date = parse_date(&raw.date).map_err(|e| context(&id, e))?;
            todos.insert(
                id.clone(),
                Todo {
                    id,
                    text: raw.text,
                    date,
                    priority: raw.priority,
                    completed: raw.completed,
                },
            );
        }

        debug!(
            term = %term.id,
            subjects = subjects.len(),
            holidays = holidays.len(),
            todos = todos.len(),
            "normalized term dataset"
        );

        Ok(TermDataset {
            term,
            subjects,
            holidays,
            todos,
        })
    }
}

/// Shared field set of the two subject layouts.
struct EntryFields {
    name: String,
    code: String,
    instructor: String,
    start_time: String,
    end_time: String,
    start_date: Option<String>,
    end_date: Option<String>,
    location: String,
    online_link: Option<String>,
    notes: Option<String>,
}

impl EntryFields {
    fn into_entry(self, id: &str, day: DayOfWeek, term: &Term) -> Result<RecurringEntry> {
        let start_date = optional_date(self.start_date.as_deref())?.unwrap_or(term.start_date);
        let end_date = optional_date(self.end_date.as_deref())?.unwrap_or(term.end_date);

        let entry = RecurringEntry {
            id: id.to_string(),
            name: self.name,
            code: self.code,
            instructor: self.instructor,
            days: BTreeSet::from([day]),
            start_time: self.start_time.parse::<TimeOfDay>()?,
            end_time: self.end_time.parse::<TimeOfDay>()?,
            start_date,
            end_date,
            location: self.location,
            online_link: non_empty(self.online_link),
            notes: non_empty(self.notes),
        };
        entry.validate()?;
        Ok(entry)
    }
}

impl RawHoliday {
    fn into_holiday(self, id: &str) -> Result<Holiday> {
        let date = parse_date(&self.date)?;
        let makeup = if self.has_makeup {
            match (
                self.makeup_date.as_deref().filter(|s| !s.is_empty()),
                self.makeup_start_time.as_deref().filter(|s| !s.is_empty()),
                self.makeup_end_time.as_deref().filter(|s| !s.is_empty()),
            ) {
                (Some(d), Some(s), Some(e)) => Some(Makeup {
                    date: parse_date(d)?,
                    start_time: s.parse()?,
                    end_time: e.parse()?,
                    location: non_empty(self.makeup_location),
                }),
                _ => {
                    warn!(holiday = %id, "holiday has makeup flag but no complete makeup schedule; ignoring makeup");
                    None
                }
            }
        } else {
            None
        };

        let holiday = Holiday {
            id: id.to_string(),
            name: self.name,
            date,
            makeup,
        };
        holiday.validate()?;
        Ok(holiday)
    }
}

/// Fold a single-day entry into `subjects`. Same id and same details adds
/// the day; same id with different details is stored under `{id}-{day}`.
fn merge_entry(subjects: &mut BTreeMap<String, RecurringEntry>, mut entry: RecurringEntry) -> Result<()> {
    let Some(existing) = subjects.get_mut(&entry.id) else {
        subjects.insert(entry.id.clone(), entry);
        return Ok(());
    };
    if same_except_days(existing, &entry) {
        debug!(entry = %entry.id, "merging day buckets of one entry");
        existing.days.extend(entry.days);
        return Ok(());
    }

    let day = entry.days.iter().next().map_or("day", |d| d.name());
    let split_id = format!("{}-{day}", entry.id);
    if let Some(other) = subjects.get_mut(&split_id) {
        if !same_except_days(other, &entry) {
            return Err(TimetableError::InvalidEntry(format!(
                "{}: listed more than once on {day} with different details",
                entry.id
            )));
        }
        other.days.extend(entry.days);
        return Ok(());
    }

    warn!(
        entry = %entry.id,
        split = %split_id,
        "same id used for entries with different details; keeping them apart"
    );
    entry.id = split_id.clone();
    subjects.insert(split_id, entry);
    Ok(())
}

fn same_except_days(a: &RecurringEntry, b: &RecurringEntry) -> bool {
    a.name == b.name
        && a.code == b.code
        && a.instructor == b.instructor
        && a.start_time == b.start_time
        && a.end_time == b.end_time
        && a.start_date == b.start_date
        && a.end_date == b.end_date
        && a.location == b.location
        && a.online_link == b.online_link
        && a.notes == b.notes
}

fn optional_date(s: Option<&str>) -> Result<Option<NaiveDate>> {
    match s {
        Some(s) if !s.is_empty() => parse_date(s).map(Some),
        _ => Ok(None),
    }
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|s| !s.trim().is_empty())
}

fn context(id: &str, err: TimetableError) -> TimetableError {
    match err {
        TimetableError::InvalidDate(m) => TimetableError::InvalidDate(format!("{id}: {m}")),
        TimetableError::InvalidTime(m) => TimetableError::InvalidTime(format!("{id}: {m}")),
        TimetableError::InvalidEntry(m) => TimetableError::InvalidEntry(format!("{id}: {m}")),
        other => other,
    }
}
