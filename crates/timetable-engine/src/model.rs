//! Canonical records: terms, recurring entries, holidays, and todos.
//!
//! These are the shapes the resolver and conflict checker consume. Stored or
//! imported data in other layouts is converted by [`crate::dataset`].

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::clock::{is_date_in_period, DayOfWeek, TimeOfDay};
use crate::error::{Result, TimetableError};

/// An academic period that scopes subjects, holidays and todos.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Term {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl Term {
    pub fn validate(&self) -> Result<()> {
        if self.start_date > self.end_date {
            return Err(TimetableError::InvalidEntry(format!(
                "term '{}' ends ({}) before it starts ({})",
                self.name, self.end_date, self.start_date
            )));
        }
        Ok(())
    }
}

/// A weekly recurring class on one or more weekdays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringEntry {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub instructor: String,
    pub days: BTreeSet<DayOfWeek>,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub online_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl RecurringEntry {
    /// Reject entries the resolver cannot place: no days, an empty or
    /// inverted time range, or an inverted validity period.
    pub fn validate(&self) -> Result<()> {
        if self.days.is_empty() {
            return Err(TimetableError::InvalidEntry(format!(
                "'{}' must meet on at least one day",
                self.name
            )));
        }
        if self.end_time <= self.start_time {
            return Err(TimetableError::InvalidEntry(format!(
                "'{}' ends at {} which is not after its start {}",
                self.name, self.end_time, self.start_time
            )));
        }
        if self.start_date > self.end_date {
            return Err(TimetableError::InvalidEntry(format!(
                "'{}' is active until {} which is before {}",
                self.name, self.end_date, self.start_date
            )));
        }
        Ok(())
    }

    pub fn meets_on(&self, day: DayOfWeek) -> bool {
        self.days.contains(&day)
    }

    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        is_date_in_period(date, self.start_date, self.end_date)
    }

    pub fn duration_minutes(&self) -> i64 {
        i64::from(self.end_time.minutes()) - i64::from(self.start_time.minutes())
    }
}

/// A one-off makeup session attached to a holiday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Makeup {
    pub date: NaiveDate,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// A dated cancellation, optionally compensated by a [`Makeup`] session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Holiday {
    pub id: String,
    pub name: String,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub makeup: Option<Makeup>,
}

impl Holiday {
    pub fn has_makeup(&self) -> bool {
        self.makeup.is_some()
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(m) = &self.makeup {
            if m.end_time <= m.start_time {
                return Err(TimetableError::InvalidEntry(format!(
                    "makeup for '{}' ends at {} which is not after its start {}",
                    self.name, m.end_time, m.start_time
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: String,
    pub text: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub completed: bool,
}
