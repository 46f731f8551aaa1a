//! JSON-file backed [`ScheduleStore`].
//!
//! The whole [`ScheduleState`] lives in one file. Every mutation is applied to
//! a copy, written to a temp file in the same directory and renamed over the
//! original, so a failed write leaves both the file and the in-memory state
//! untouched.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use timetable_engine::error::Result;
use timetable_engine::{ScheduleState, ScheduleStore, Term, TermDataset, TimetableError};
use tracing::{debug, info};

#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    state: ScheduleState,
}

impl FileStore {
    /// Open `path`, starting from an empty state if the file does not exist.
    #[tracing::instrument]
    pub fn open(path: &Path) -> Result<Self> {
        let state = match std::fs::read_to_string(path) {
            Ok(text) => ScheduleState::import_json(&text)?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "data file missing; starting empty");
                ScheduleState::new()
            }
            Err(e) => return Err(unavailable(path, e)),
        };
        Ok(FileStore {
            path: path.to_path_buf(),
            state,
        })
    }

    pub fn state(&self) -> &ScheduleState {
        &self.state
    }

    /// Replace everything with `state` (backup restore).
    pub fn replace(&mut self, state: ScheduleState) -> Result<()> {
        self.write(|s| {
            *s = state;
            Ok(())
        })
    }

    fn write<F>(&mut self, apply: F) -> Result<()>
    where
        F: FnOnce(&mut ScheduleState) -> Result<()>,
    {
        let mut next = self.state.clone();
        apply(&mut next)?;
        self.persist(&next)?;
        self.state = next;
        Ok(())
    }

    fn persist(&self, state: &ScheduleState) -> Result<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(|e| unavailable(dir, e))?;

        let json = state.export_json()?;
        let mut temp = NamedTempFile::new_in(dir).map_err(|e| unavailable(dir, e))?;
        temp.write_all(json.as_bytes()).map_err(|e| unavailable(temp.path(), e))?;
        temp.flush().map_err(|e| unavailable(temp.path(), e))?;
        temp.persist(&self.path).map_err(|e| unavailable(&self.path, e.error))?;

        info!(path = %self.path.display(), "saved schedule data");
        Ok(())
    }
}

fn unavailable(path: &Path, err: std::io::Error) -> TimetableError {
    TimetableError::Unavailable(format!("{}: {err}", path.display()))
}

impl ScheduleStore for FileStore {
    fn terms(&self) -> Result<Vec<Term>> {
        self.state.terms()
    }

    fn current_term(&self) -> Result<Option<String>> {
        self.state.current_term()
    }

    fn set_current_term(&mut self, term_id: Option<&str>) -> Result<()> {
        self.write(|s| s.set_current_term(term_id))
    }

    fn put_term(&mut self, term: Term) -> Result<()> {
        self.write(|s| s.put_term(term))
    }

    fn remove_term(&mut self, term_id: &str) -> Result<()> {
        self.write(|s| s.remove_term(term_id))
    }

    fn fetch(&self, term_id: &str) -> Result<TermDataset> {
        self.state.fetch(term_id)
    }

    fn commit(&mut self, dataset: &TermDataset) -> Result<()> {
        self.write(|s| s.commit(dataset))
    }
}
