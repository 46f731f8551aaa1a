//! # timetable-engine
//!
//! Deterministic timetable placement and conflict resolution for a
//! class-schedule manager.
//!
//! Given a term's recurring classes, its holidays (with optional makeup
//! sessions) and a week to display, the engine decides which single entity
//! occupies every (day, time slot) cell, and it rejects recurring entries that
//! would overlap an existing one. Everything operates on an in-memory
//! [`TermDataset`] snapshot; loading and saving is the caller's job.
//!
//! ## Modules
//!
//! - [`clock`] -- date/week arithmetic, `HH:MM` times, academic year and semester
//! - [`model`] -- terms, recurring entries, holidays, todos
//! - [`dataset`] -- the per-term snapshot and normalization of stored layouts
//! - [`resolver`] -- cell occupancy with makeup > holiday > subject precedence
//! - [`conflict`] -- per-weekday overlap checks for writes
//! - [`occurrence`] -- expand entries into dated meetings, calendar export
//! - [`todo`] -- todo display ordering
//! - [`store`] -- the dataset collaborator trait and in-memory state
//! - [`schedule`] -- validated, all-or-nothing writes through a store
//! - [`error`] -- error types

pub mod clock;
pub mod conflict;
pub mod dataset;
pub mod error;
pub mod model;
pub mod occurrence;
pub mod resolver;
pub mod schedule;
pub mod store;
pub mod todo;

pub use clock::{DayOfWeek, TimeOfDay, WeekStart};
pub use conflict::{check_entry, find_conflicts, has_conflict, Conflict};
pub use dataset::{RawTermDataset, TermDataset};
pub use error::TimetableError;
pub use model::{Holiday, Makeup, Priority, RecurringEntry, Term, Todo};
pub use occurrence::{expand, export_calendar, Occurrence};
pub use resolver::{resolve_slot, resolve_week, CellContent, GridConfig, WeekGrid};
pub use schedule::Schedule;
pub use store::{ScheduleState, ScheduleStore};
