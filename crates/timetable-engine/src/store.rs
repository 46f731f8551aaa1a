//! The dataset collaborator: where term snapshots come from and go back to.
//!
//! The core never performs I/O. Callers hand it a [`ScheduleStore`]; the
//! write gateway in [`crate::schedule`] fetches a fresh snapshot for every
//! operation and commits at most once.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::dataset::{RawHoliday, RawSubject, RawTermDataset, RawTimetableEntry, RawTodo, TermDataset};
use crate::error::{Result, TimetableError};
use crate::model::{Holiday, RecurringEntry, Term, Todo};

/// Source and sink of term snapshots.
///
/// Implementations report backend failures as `TimetableError::Unavailable`;
/// callers decide whether to retry or surface them.
pub trait ScheduleStore {
    fn terms(&self) -> Result<Vec<Term>>;

    fn current_term(&self) -> Result<Option<String>>;

    fn set_current_term(&mut self, term_id: Option<&str>) -> Result<()>;

    /// Insert a new term or replace an existing term's metadata.
    fn put_term(&mut self, term: Term) -> Result<()>;

    /// Delete a term together with its subjects, holidays and todos.
    fn remove_term(&mut self, term_id: &str) -> Result<()>;

    /// A snapshot of one term's data, detached from the store.
    fn fetch(&self, term_id: &str) -> Result<TermDataset>;

    /// Replace the stored collections of `dataset.term` with the snapshot.
    fn commit(&mut self, dataset: &TermDataset) -> Result<()>;
}

/// The three record collections owned by one term.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TermCollections {
    pub subjects: BTreeMap<String, RecurringEntry>,
    pub holidays: BTreeMap<String, Holiday>,
    pub todos: BTreeMap<String, Todo>,
}

/// Complete persisted state: all terms, the current term, and each term's
/// collections keyed by term id.
///
/// Also serves as the in-memory [`ScheduleStore`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScheduleState {
    pub terms: BTreeMap<String, Term>,
    pub current_term: Option<String>,
    pub collections: BTreeMap<String, TermCollections>,
}

impl ScheduleState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn export_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn import_json(json: &str) -> Result<Self> {
        let state: ScheduleState = serde_json::from_str(json)?;
        state.check_references()?;
        Ok(state)
    }

    fn check_references(&self) -> Result<()> {
        if let Some(current) = &self.current_term {
            if !self.terms.contains_key(current) {
                return Err(TimetableError::NotFound {
                    kind: "term",
                    id: current.clone(),
                });
            }
        }
        for term in self.terms.values() {
            term.validate()?;
        }
        Ok(())
    }

    fn term(&self, term_id: &str) -> Result<&Term> {
        self.terms.get(term_id).ok_or_else(|| TimetableError::NotFound {
            kind: "term",
            id: term_id.to_string(),
        })
    }
}

impl ScheduleStore for ScheduleState {
    fn terms(&self) -> Result<Vec<Term>> {
        let mut terms: Vec<Term> = self.terms.values().cloned().collect();
        terms.sort_by(|a, b| a.start_date.cmp(&b.start_date).then_with(|| a.id.cmp(&b.id)));
        Ok(terms)
    }

    fn current_term(&self) -> Result<Option<String>> {
        Ok(self.current_term.clone())
    }

    fn set_current_term(&mut self, term_id: Option<&str>) -> Result<()> {
        if let Some(id) = term_id {
            self.term(id)?;
        }
        self.current_term = term_id.map(str::to_string);
        Ok(())
    }

    fn put_term(&mut self, term: Term) -> Result<()> {
        term.validate()?;
        self.collections.entry(term.id.clone()).or_default();
        self.terms.insert(term.id.clone(), term);
        Ok(())
    }

    fn remove_term(&mut self, term_id: &str) -> Result<()> {
        self.term(term_id)?;
        self.terms.remove(term_id);
        let removed = self.collections.remove(term_id).unwrap_or_default();
        if self.current_term.as_deref() == Some(term_id) {
            self.current_term = None;
        }
        info!(
            term = term_id,
            subjects = removed.subjects.len(),
            holidays = removed.holidays.len(),
            todos = removed.todos.len(),
            "removed term and its collections"
        );
        Ok(())
    }

    fn fetch(&self, term_id: &str) -> Result<TermDataset> {
        let term = self.term(term_id)?.clone();
        let collections = self.collections.get(term_id).cloned().unwrap_or_default();
        Ok(TermDataset {
            term,
            subjects: collections.subjects,
            holidays: collections.holidays,
            todos: collections.todos,
        })
    }

    fn commit(&mut self, dataset: &TermDataset) -> Result<()> {
        self.term(&dataset.term.id)?;
        debug!(term = %dataset.term.id, "committing term snapshot");
        self.collections.insert(
            dataset.term.id.clone(),
            TermCollections {
                subjects: dataset.subjects.clone(),
                holidays: dataset.holidays.clone(),
                todos: dataset.todos.clone(),
            },
        );
        Ok(())
    }
}

/// Backup file written by the browser application: each collection is keyed
/// by term id first, then by record id. `timetables` holds the day-bucketed
/// subject layout.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BrowserBackup {
    pub terms: BTreeMap<String, Term>,
    pub subjects: BTreeMap<String, BTreeMap<String, RawSubject>>,
    pub timetables: BTreeMap<String, BTreeMap<String, Vec<RawTimetableEntry>>>,
    pub holidays: BTreeMap<String, BTreeMap<String, RawHoliday>>,
    pub todos: BTreeMap<String, BTreeMap<String, RawTodo>>,
    pub current_term: Option<String>,
}

impl BrowserBackup {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Normalize every term's collections into a [`ScheduleState`].
    ///
    /// Collections keyed by an unknown term id are dropped.
    pub fn into_state(mut self) -> Result<ScheduleState> {
        let mut state = ScheduleState::new();
        for (key, mut term) in std::mem::take(&mut self.terms) {
            term.id = key.clone();
            let raw = RawTermDataset {
                subjects: self.subjects.remove(&key).unwrap_or_default(),
                timetable: self.timetables.remove(&key).unwrap_or_default(),
                holidays: self.holidays.remove(&key).unwrap_or_default(),
                todos: self.todos.remove(&key).unwrap_or_default(),
            };
            let dataset = raw.normalize(term)?;
            state.put_term(dataset.term.clone())?;
            state.commit(&dataset)?;
        }

        let orphans = self.subjects.len() + self.timetables.len() + self.holidays.len() + self.todos.len();
        if orphans > 0 {
            debug!(orphans, "dropped collections of unknown terms");
        }

        state.current_term = self.current_term.filter(|id| state.terms.contains_key(id));
        Ok(state)
    }
}
