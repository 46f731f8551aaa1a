//! Error types for timetable-engine operations.

use thiserror::Error;

use crate::clock::DayOfWeek;
use crate::model::RecurringEntry;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TimetableError {
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid time: {0}")]
    InvalidTime(String),

    /// A record failed structural validation (empty day set, inverted range, ...).
    #[error("Invalid entry: {0}")]
    InvalidEntry(String),

    /// A recurring entry write collides with an existing entry on `day`.
    #[error(
        "Schedule conflict on {day}: overlaps {} ({}-{})",
        .conflicting.name,
        .conflicting.start_time,
        .conflicting.end_time
    )]
    ScheduleConflict {
        day: DayOfWeek,
        conflicting: Box<RecurringEntry>,
    },

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// The dataset snapshot could not be obtained or committed.
    #[error("Dataset unavailable: {0}")]
    Unavailable(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for TimetableError {
    fn from(e: serde_json::Error) -> Self {
        TimetableError::Serialization(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TimetableError>;
