//! WASM bindings for timetable-engine.
//!
//! Exposes week resolution, conflict checks, occurrence expansion and todo
//! ordering to the browser app via `wasm-bindgen`. Records cross the boundary
//! as JSON strings in the same camelCase shape the app stores.
//!
//! ## Build process
//!
//! ```sh
//! cargo build -p timetable-engine-wasm --target wasm32-unknown-unknown --release
//! wasm-bindgen --target web --out-dir web/wasm/ \
//!   target/wasm32-unknown-unknown/release/timetable_engine_wasm.wasm
//! ```

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;
use timetable_engine::clock::{parse_date, start_of_week};
use timetable_engine::occurrence::expand;
use timetable_engine::{
    export_calendar, find_conflicts, resolve_slot, resolve_week, todo, DayOfWeek, GridConfig, RawTermDataset,
    RecurringEntry, Term, TermDataset, TimeOfDay, Todo, WeekStart,
};
use wasm_bindgen::prelude::*;

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ConflictDto {
    day: DayOfWeek,
    entry_id: String,
    entry_name: String,
    overlap_minutes: i64,
}

// ---------------------------------------------------------------------------
// JSON helpers
// ---------------------------------------------------------------------------

fn from_json<T: DeserializeOwned>(what: &str, json: &str) -> Result<T, String> {
    serde_json::from_str(json).map_err(|e| format!("Invalid {what} JSON: {e}"))
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| format!("Serialization error: {e}"))
}

fn date_arg(s: &str) -> Result<NaiveDate, String> {
    parse_date(s).map_err(|e| e.to_string())
}

fn grid_config(config_json: Option<&str>) -> Result<GridConfig, String> {
    match config_json {
        Some(json) if !json.trim().is_empty() => from_json("grid config", json),
        _ => Ok(GridConfig::default()),
    }
}

// ---------------------------------------------------------------------------
// Implementations (plain Rust errors, testable off-wasm)
// ---------------------------------------------------------------------------

fn start_of_week_impl(date: &str, week_start: &str) -> Result<String, String> {
    let ws: WeekStart = week_start.parse().map_err(|e: timetable_engine::TimetableError| e.to_string())?;
    Ok(start_of_week(date_arg(date)?, ws).to_string())
}

fn normalize_dataset_impl(raw_json: &str, term_json: &str) -> Result<String, String> {
    let raw = RawTermDataset::from_json(raw_json).map_err(|e| e.to_string())?;
    let term: Term = from_json("term", term_json)?;
    let dataset = raw.normalize(term).map_err(|e| e.to_string())?;
    to_json(&dataset)
}

fn resolve_week_impl(dataset_json: &str, week_of: &str, config_json: Option<&str>) -> Result<String, String> {
    let dataset: TermDataset = from_json("dataset", dataset_json)?;
    let config = grid_config(config_json)?;
    let grid = resolve_week(&dataset, date_arg(week_of)?, &config);
    to_json(&grid)
}

fn resolve_slot_impl(dataset_json: &str, day: u8, slot: &str, date: &str) -> Result<String, String> {
    let dataset: TermDataset = from_json("dataset", dataset_json)?;
    let day = DayOfWeek::from_index(day).map_err(|e| e.to_string())?;
    let slot: TimeOfDay = slot.parse().map_err(|e: timetable_engine::TimetableError| e.to_string())?;
    let cell = resolve_slot(&dataset, day, slot, date_arg(date)?);
    to_json(&cell)
}

fn find_conflicts_impl(entries_json: &str, candidate_json: &str, exclude_id: Option<&str>) -> Result<String, String> {
    let entries: Vec<RecurringEntry> = from_json("entries", entries_json)?;
    let candidate: RecurringEntry = from_json("candidate", candidate_json)?;

    let dtos: Vec<ConflictDto> = find_conflicts(&entries, &candidate, exclude_id)
        .into_iter()
        .map(|c| ConflictDto {
            day: c.day,
            entry_id: c.entry.id.clone(),
            entry_name: c.entry.name.clone(),
            overlap_minutes: c.overlap_minutes,
        })
        .collect();
    to_json(&dtos)
}

fn has_conflict_impl(entries_json: &str, candidate_json: &str, exclude_id: Option<&str>) -> Result<bool, String> {
    let entries: Vec<RecurringEntry> = from_json("entries", entries_json)?;
    let candidate: RecurringEntry = from_json("candidate", candidate_json)?;
    Ok(timetable_engine::has_conflict(&entries, &candidate, exclude_id))
}

fn expand_occurrences_impl(entry_json: &str) -> Result<String, String> {
    let entry: RecurringEntry = from_json("entry", entry_json)?;
    to_json(&expand(&entry))
}

fn export_calendar_impl(dataset_json: &str) -> Result<String, String> {
    let dataset: TermDataset = from_json("dataset", dataset_json)?;
    to_json(&export_calendar(&dataset))
}

fn order_todos_impl(todos_json: &str, pending_only: bool) -> Result<String, String> {
    let todos: Vec<Todo> = from_json("todos", todos_json)?;
    let ordered = if pending_only {
        todo::pending(&todos)
    } else {
        todo::ordered(&todos)
    };
    to_json(&ordered)
}

// ---------------------------------------------------------------------------
// WASM exports
// ---------------------------------------------------------------------------

fn js_err(message: String) -> JsValue {
    JsValue::from_str(&message)
}

/// First day of the week containing `date` (`YYYY-MM-DD`).
///
/// `week_start` is `"sunday"` or `"monday"`.
#[wasm_bindgen(js_name = "startOfWeek")]
pub fn start_of_week_js(date: &str, week_start: &str) -> Result<String, JsValue> {
    start_of_week_impl(date, week_start).map_err(js_err)
}

/// Convert a stored term layout (flat `subjects` and/or day-bucketed
/// `timetable`) into the canonical dataset JSON the other functions take.
#[wasm_bindgen(js_name = "normalizeDataset")]
pub fn normalize_dataset(raw_json: &str, term_json: &str) -> Result<String, JsValue> {
    normalize_dataset_impl(raw_json, term_json).map_err(js_err)
}

/// Resolve every cell of the week containing `week_of`.
///
/// `config_json` is an optional `{weekStart, slots}` object; omitted fields
/// fall back to Sunday weeks with hourly rows from 08:00 to 19:00. Returns
/// `{weekStart, days, rows, warnings}` where each cell is
/// `{kind: "Empty" | "Subject" | "Holiday" | "Makeup", payload?}`.
#[wasm_bindgen(js_name = "resolveWeek")]
pub fn resolve_week_js(dataset_json: &str, week_of: &str, config_json: Option<String>) -> Result<String, JsValue> {
    resolve_week_impl(dataset_json, week_of, config_json.as_deref()).map_err(js_err)
}

/// Resolve a single cell. `day` is 0 (Sunday) through 6 (Saturday).
#[wasm_bindgen(js_name = "resolveSlot")]
pub fn resolve_slot_js(dataset_json: &str, day: u8, slot: &str, date: &str) -> Result<String, JsValue> {
    resolve_slot_impl(dataset_json, day, slot, date).map_err(js_err)
}

/// True if `candidate_json` overlaps any of `entries_json` on a shared day.
#[wasm_bindgen(js_name = "hasConflict")]
pub fn has_conflict_js(entries_json: &str, candidate_json: &str, exclude_id: Option<String>) -> Result<bool, JsValue> {
    has_conflict_impl(entries_json, candidate_json, exclude_id.as_deref()).map_err(js_err)
}

/// Every `{day, entryId, entryName, overlapMinutes}` collision of the
/// candidate with the existing entries.
#[wasm_bindgen(js_name = "findConflicts")]
pub fn find_conflicts_js(
    entries_json: &str,
    candidate_json: &str,
    exclude_id: Option<String>,
) -> Result<String, JsValue> {
    find_conflicts_impl(entries_json, candidate_json, exclude_id.as_deref()).map_err(js_err)
}

#[wasm_bindgen(js_name = "expandOccurrences")]
pub fn expand_occurrences(entry_json: &str) -> Result<String, JsValue> {
    expand_occurrences_impl(entry_json).map_err(js_err)
}

/// All class meetings of a term not cancelled by a holiday, plus makeups.
#[wasm_bindgen(js_name = "exportCalendar")]
pub fn export_calendar_js(dataset_json: &str) -> Result<String, JsValue> {
    export_calendar_impl(dataset_json).map_err(js_err)
}

#[wasm_bindgen(js_name = "orderTodos")]
pub fn order_todos(todos_json: &str, pending_only: bool) -> Result<String, JsValue> {
    order_todos_impl(todos_json, pending_only).map_err(js_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATASET: &str = r#"{
        "term": {"id": "t1", "name": "Term 1", "startDate": "2024-08-01", "endDate": "2024-12-15"},
        "subjects": {
            "calc": {
                "id": "calc", "name": "Calculus", "days": [3],
                "startTime": "13:00", "endTime": "15:00",
                "startDate": "2024-08-01", "endDate": "2024-12-15"
            }
        },
        "holidays": {
            "mid": {
                "id": "mid", "name": "Break", "date": "2024-10-15",
                "makeup": {"date": "2024-10-20", "startTime": "09:00", "endTime": "11:00"}
            }
        }
    }"#;

    fn json(s: &str) -> serde_json::Value {
        serde_json::from_str(s).unwrap()
    }

    #[test]
    fn start_of_week_honours_convention() {
        assert_eq!(start_of_week_impl("2024-08-07", "sunday").unwrap(), "2024-08-04");
        assert_eq!(start_of_week_impl("2024-08-07", "monday").unwrap(), "2024-08-05");
        assert!(start_of_week_impl("2024-08-07", "friday").is_err());
        assert!(start_of_week_impl("07/08/2024", "sunday").is_err());
    }

    #[test]
    fn resolve_slot_returns_tagged_cell() {
        let cell = json(&resolve_slot_impl(DATASET, 3, "13:00", "2024-08-07").unwrap());
        assert_eq!(cell["kind"], "Subject");
        assert_eq!(cell["payload"]["id"], "calc");

        let makeup = json(&resolve_slot_impl(DATASET, 0, "09:30", "2024-10-20").unwrap());
        assert_eq!(makeup["kind"], "Makeup");

        let empty = json(&resolve_slot_impl(DATASET, 3, "15:00", "2024-08-07").unwrap());
        assert_eq!(empty["kind"], "Empty");
    }

    #[test]
    fn resolve_week_uses_default_grid() {
        let grid = json(&resolve_week_impl(DATASET, "2024-10-16", None).unwrap());
        assert_eq!(grid["weekStart"], "2024-10-13");
        assert_eq!(grid["rows"].as_array().unwrap().len(), 12);
        assert_eq!(grid["rows"][0]["slot"], "08:00");
        // 10:00 on Tuesday the 15th is the holiday.
        assert_eq!(grid["rows"][2]["cells"][2]["kind"], "Holiday");
    }

    #[test]
    fn resolve_week_accepts_partial_config() {
        let grid = json(&resolve_week_impl(DATASET, "2024-10-16", Some(r#"{"weekStart": "monday"}"#)).unwrap());
        assert_eq!(grid["weekStart"], "2024-10-14");
        assert_eq!(grid["rows"].as_array().unwrap().len(), 12);
    }

    #[test]
    fn conflicts_cross_the_boundary() {
        let entries = r#"[{"id": "phys", "name": "Physics", "days": [5], "startTime": "09:00", "endTime": "12:00",
            "startDate": "2024-08-01", "endDate": "2024-12-15"}]"#;
        let candidate = r#"{"id": "chem", "name": "Chemistry", "days": [1, 5], "startTime": "10:00",
            "endTime": "11:00", "startDate": "2024-08-01", "endDate": "2024-12-15"}"#;

        assert!(has_conflict_impl(entries, candidate, None).unwrap());
        assert!(!has_conflict_impl(entries, candidate, Some("phys")).unwrap());

        let conflicts = json(&find_conflicts_impl(entries, candidate, None).unwrap());
        assert_eq!(conflicts[0]["day"], 5);
        assert_eq!(conflicts[0]["entryId"], "phys");
        assert_eq!(conflicts[0]["overlapMinutes"], 60);
    }

    #[test]
    fn normalized_dataset_feeds_resolution() {
        let raw = r#"{"timetable": {"wednesday": [{"id": "calc", "subjectName": "Calculus",
            "startTime": "13:00", "endTime": "15:00"}]}}"#;
        let term = r#"{"id": "t1", "name": "Term 1", "startDate": "2024-08-01", "endDate": "2024-12-15"}"#;

        let dataset = normalize_dataset_impl(raw, term).unwrap();
        let cell = json(&resolve_slot_impl(&dataset, 3, "14:00", "2024-08-07").unwrap());
        assert_eq!(cell["payload"]["name"], "Calculus");
    }

    #[test]
    fn export_and_expand_produce_events() {
        let events = json(&export_calendar_impl(DATASET).unwrap());
        let events = events.as_array().unwrap();
        assert!(events.iter().any(|e| e["kind"] == "makeup"));
        assert!(events.iter().all(|e| e["start"] != "2024-10-15T13:00:00"));

        let entry = r#"{"id": "calc", "name": "Calculus", "days": [3], "startTime": "13:00", "endTime": "15:00",
            "startDate": "2024-08-01", "endDate": "2024-08-14"}"#;
        let occurrences = json(&expand_occurrences_impl(entry).unwrap());
        assert_eq!(occurrences.as_array().unwrap().len(), 2);
        assert_eq!(occurrences[0]["date"], "2024-08-07");
    }

    #[test]
    fn todos_are_ordered_and_filtered() {
        let todos = r#"[
            {"id": "a", "text": "Read", "date": "2024-09-03", "priority": "low"},
            {"id": "b", "text": "Lab", "date": "2024-09-03", "priority": "high", "completed": true},
            {"id": "c", "text": "Buy", "date": "2024-09-01"}
        ]"#;

        let all = json(&order_todos_impl(todos, false).unwrap());
        let ids: Vec<&str> = all.as_array().unwrap().iter().map(|t| t["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["c", "b", "a"]);

        let pending = json(&order_todos_impl(todos, true).unwrap());
        assert_eq!(pending.as_array().unwrap().len(), 2);
    }

    #[test]
    fn malformed_json_is_reported() {
        let err = resolve_week_impl("{", "2024-10-16", None).unwrap_err();
        assert!(err.starts_with("Invalid dataset JSON"), "{err}");
    }
}
