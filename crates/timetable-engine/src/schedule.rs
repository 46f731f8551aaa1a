//! Validated writes against a [`ScheduleStore`].
//!
//! Every mutation fetches the latest snapshot, validates and conflict-checks
//! against it, edits a copy, and commits once. Nothing is committed when a
//! check fails. Concurrent writers are last-write-wins.

use chrono::NaiveDate;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::conflict::check_entry;
use crate::dataset::TermDataset;
use crate::error::{Result, TimetableError};
use crate::model::{Holiday, RecurringEntry, Term, Todo};
use crate::resolver::{resolve_week, GridConfig, WeekGrid};
use crate::store::ScheduleStore;

/// Generate a record id such as `entry_3f2a...`.
pub fn new_id(prefix: &str) -> String {
    format!("{}_{}", prefix, Uuid::new_v4().simple())
}

/// Write gateway over a store.
#[derive(Debug)]
pub struct Schedule<S> {
    store: S,
}

impl<S: ScheduleStore> Schedule<S> {
    pub fn new(store: S) -> Self {
        Schedule { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// The id of the current term, or `NotFound` if none is selected.
    pub fn current_term_id(&self) -> Result<String> {
        self.store.current_term()?.ok_or_else(|| TimetableError::NotFound {
            kind: "current term",
            id: "(none selected)".to_string(),
        })
    }

    /// A fresh snapshot of a term.
    pub fn snapshot(&self, term_id: &str) -> Result<TermDataset> {
        self.store.fetch(term_id)
    }

    /// Create a term. The first term created becomes current.
    #[instrument(skip(self, term), fields(name = %term.name))]
    pub fn add_term(&mut self, mut term: Term) -> Result<String> {
        term.validate()?;
        if term.id.is_empty() {
            term.id = new_id("term");
        }
        let id = term.id.clone();
        self.store.put_term(term)?;
        if self.store.current_term()?.is_none() {
            self.store.set_current_term(Some(&id))?;
        }
        info!(term = %id, "added term");
        Ok(id)
    }

    /// Rename a term or move its dates. Subjects keep their own validity
    /// periods.
    ///
    /// # Errors
    /// `NotFound` for an unknown id; `InvalidEntry` if the new period is
    /// inverted.
    #[instrument(skip(self, term), fields(name = %term.name))]
    pub fn update_term(&mut self, term_id: &str, mut term: Term) -> Result<()> {
        term.validate()?;
        self.store.fetch(term_id)?;
        term.id = term_id.to_string();
        self.store.put_term(term)?;
        info!(term = term_id, "updated term");
        Ok(())
    }

    pub fn switch_term(&mut self, term_id: &str) -> Result<()> {
        self.store.set_current_term(Some(term_id))?;
        info!(term = term_id, "switched current term");
        Ok(())
    }

    /// Delete a term and everything it owns.
    pub fn delete_term(&mut self, term_id: &str) -> Result<()> {
        self.store.remove_term(term_id)
    }

    /// Add a recurring entry with a newly generated id.
    ///
    /// # Errors
    /// `InvalidEntry` if the entry is malformed; `ScheduleConflict` if any of
    /// its days overlaps an existing entry. Nothing is stored on error.
    #[instrument(skip(self, entry), fields(name = %entry.name))]
    pub fn add_entry(&mut self, term_id: &str, mut entry: RecurringEntry) -> Result<String> {
        entry.validate()?;
        let mut dataset = self.store.fetch(term_id)?;
        check_entry(dataset.subjects.values(), &entry, None)?;

        entry.id = new_id("entry");
        let id = entry.id.clone();
        dataset.subjects.insert(id.clone(), entry);
        self.store.commit(&dataset)?;
        info!(entry = %id, "added recurring entry");
        Ok(id)
    }

    /// Replace an existing entry, checking conflicts against every other
    /// entry in the current snapshot.
    #[instrument(skip(self, entry))]
    pub fn update_entry(&mut self, term_id: &str, entry_id: &str, mut entry: RecurringEntry) -> Result<()> {
        entry.validate()?;
        let mut dataset = self.store.fetch(term_id)?;
        if !dataset.subjects.contains_key(entry_id) {
            return Err(not_found("entry", entry_id));
        }
        check_entry(dataset.subjects.values(), &entry, Some(entry_id))?;

        entry.id = entry_id.to_string();
        dataset.subjects.insert(entry_id.to_string(), entry);
        self.store.commit(&dataset)?;
        debug!(entry = entry_id, "updated recurring entry");
        Ok(())
    }

    pub fn remove_entry(&mut self, term_id: &str, entry_id: &str) -> Result<RecurringEntry> {
        self.remove_record(term_id, entry_id, "entry", |d| &mut d.subjects)
    }

    #[instrument(skip(self, holiday), fields(date = %holiday.date))]
    pub fn add_holiday(&mut self, term_id: &str, mut holiday: Holiday) -> Result<String> {
        holiday.validate()?;
        let mut dataset = self.store.fetch(term_id)?;
        holiday.id = new_id("holiday");
        let id = holiday.id.clone();
        dataset.holidays.insert(id.clone(), holiday);
        self.store.commit(&dataset)?;
        info!(holiday = %id, "added holiday");
        Ok(id)
    }

    pub fn update_holiday(&mut self, term_id: &str, holiday_id: &str, mut holiday: Holiday) -> Result<()> {
        holiday.validate()?;
        let mut dataset = self.store.fetch(term_id)?;
        if !dataset.holidays.contains_key(holiday_id) {
            return Err(not_found("holiday", holiday_id));
        }
        holiday.id = holiday_id.to_string();
        dataset.holidays.insert(holiday_id.to_string(), holiday);
        self.store.commit(&dataset)
    }

    pub fn remove_holiday(&mut self, term_id: &str, holiday_id: &str) -> Result<Holiday> {
        self.remove_record(term_id, holiday_id, "holiday", |d| &mut d.holidays)
    }

    pub fn add_todo(&mut self, term_id: &str, mut todo: Todo) -> Result<String> {
        let mut dataset = self.store.fetch(term_id)?;
        todo.id = new_id("todo");
        let id = todo.id.clone();
        dataset.todos.insert(id.clone(), todo);
        self.store.commit(&dataset)?;
        Ok(id)
    }

    pub fn set_todo_completed(&mut self, term_id: &str, todo_id: &str, completed: bool) -> Result<()> {
        let mut dataset = self.store.fetch(term_id)?;
        let todo = dataset
            .todos
            .get_mut(todo_id)
            .ok_or_else(|| not_found("todo", todo_id))?;
        todo.completed = completed;
        self.store.commit(&dataset)
    }

    pub fn remove_todo(&mut self, term_id: &str, todo_id: &str) -> Result<Todo> {
        self.remove_record(term_id, todo_id, "todo", |d| &mut d.todos)
    }

    /// Fetch a fresh snapshot of the term, resolve the week containing
    /// `week_of`, and hand the grid to `render`.
    pub fn with_week<R, F>(&self, term_id: &str, week_of: NaiveDate, config: &GridConfig, render: F) -> Result<R>
    where
        F: FnOnce(&WeekGrid<'_>) -> R,
    {
        let dataset = self.store.fetch(term_id)?;
        let grid = resolve_week(&dataset, week_of, config);
        debug!(term = term_id, week_start = %grid.week_start, warnings = grid.warnings.len(), "resolved week");
        Ok(render(&grid))
    }

    fn remove_record<T, F>(&mut self, term_id: &str, id: &str, kind: &'static str, collection: F) -> Result<T>
    where
        F: FnOnce(&mut TermDataset) -> &mut std::collections::BTreeMap<String, T>,
    {
        let mut dataset = self.store.fetch(term_id)?;
        let removed = collection(&mut dataset)
            .remove(id)
            .ok_or_else(|| not_found(kind, id))?;
        self.store.commit(&dataset)?;
        debug!(kind, id, "removed record");
        Ok(removed)
    }
}

fn not_found(kind: &'static str, id: &str) -> TimetableError {
    TimetableError::NotFound {
        kind,
        id: id.to_string(),
    }
}
