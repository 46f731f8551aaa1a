//! Tests for cell occupancy: makeup > holiday > subject > empty.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use timetable_engine::resolver::{resolve_slot_checked, time_slots, OccupantKind};
use timetable_engine::{
    resolve_slot, resolve_week, CellContent, DayOfWeek, GridConfig, Holiday, Makeup, RecurringEntry, Term,
    TermDataset, TimeOfDay, WeekStart,
};

// ── Helpers ─────────────────────────────────────────────────────────────────

fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

fn t(s: &str) -> TimeOfDay {
    s.parse().unwrap()
}

fn term() -> Term {
    Term {
        id: "term_1".to_string(),
        name: "Term 1/2025".to_string(),
        start_date: date("2024-08-01"),
        end_date: date("2024-12-15"),
    }
}

fn entry(id: &str, days: &[DayOfWeek], start: &str, end: &str) -> RecurringEntry {
    RecurringEntry {
        id: id.to_string(),
        name: format!("Subject {id}"),
        code: String::new(),
        instructor: String::new(),
        days: days.iter().copied().collect::<BTreeSet<_>>(),
        start_time: t(start),
        end_time: t(end),
        start_date: date("2024-08-01"),
        end_date: date("2024-12-15"),
        location: "Room 301".to_string(),
        online_link: None,
        notes: None,
    }
}

fn holiday(id: &str, on: &str) -> Holiday {
    Holiday {
        id: id.to_string(),
        name: format!("Holiday {id}"),
        date: date(on),
        makeup: None,
    }
}

fn with_makeup(mut h: Holiday, on: &str, start: &str, end: &str) -> Holiday {
    h.makeup = Some(Makeup {
        date: date(on),
        start_time: t(start),
        end_time: t(end),
        location: None,
    });
    h
}

fn dataset(entries: Vec<RecurringEntry>, holidays: Vec<Holiday>) -> TermDataset {
    let mut ds = TermDataset::new(term());
    for e in entries {
        ds.subjects.insert(e.id.clone(), e);
    }
    for h in holidays {
        ds.holidays.insert(h.id.clone(), h);
    }
    ds
}

// ── Subjects ────────────────────────────────────────────────────────────────

#[test]
fn subject_occupies_slot_at_its_start_time() {
    // Wednesday 13:00-15:00; 2024-08-07 is a Wednesday.
    let ds = dataset(vec![entry("calc", &[DayOfWeek::Wednesday], "13:00", "15:00")], vec![]);

    let cell = resolve_slot(&ds, DayOfWeek::Wednesday, t("13:00"), date("2024-08-07"));
    assert_eq!(cell.occupant_id(), Some("calc"));
    assert!(matches!(cell, CellContent::Subject(_)));
}

#[test]
fn slot_equal_to_end_time_is_empty() {
    let ds = dataset(vec![entry("calc", &[DayOfWeek::Wednesday], "13:00", "15:00")], vec![]);

    let cell = resolve_slot(&ds, DayOfWeek::Wednesday, t("15:00"), date("2024-08-07"));
    assert_eq!(cell, CellContent::Empty);
}

#[test]
fn subject_outside_validity_period_is_not_placed() {
    let mut e = entry("calc", &[DayOfWeek::Wednesday], "13:00", "15:00");
    e.start_date = date("2024-09-01");
    let ds = dataset(vec![e], vec![]);

    assert!(resolve_slot(&ds, DayOfWeek::Wednesday, t("13:00"), date("2024-08-28")).is_empty());
    assert!(!resolve_slot(&ds, DayOfWeek::Wednesday, t("13:00"), date("2024-09-04")).is_empty());
}

#[test]
fn subject_on_boundary_dates_is_placed() {
    let mut e = entry("calc", &[DayOfWeek::Wednesday], "13:00", "15:00");
    e.start_date = date("2024-08-07");
    e.end_date = date("2024-08-14");
    let ds = dataset(vec![e], vec![]);

    assert!(!resolve_slot(&ds, DayOfWeek::Wednesday, t("13:00"), date("2024-08-07")).is_empty());
    assert!(!resolve_slot(&ds, DayOfWeek::Wednesday, t("13:00"), date("2024-08-14")).is_empty());
    assert!(resolve_slot(&ds, DayOfWeek::Wednesday, t("13:00"), date("2024-08-21")).is_empty());
}

#[test]
fn multi_day_entry_occupies_each_of_its_days() {
    let ds = dataset(
        vec![entry("cs", &[DayOfWeek::Tuesday, DayOfWeek::Thursday], "10:00", "12:00")],
        vec![],
    );

    // 2024-08-06 Tuesday, 2024-08-08 Thursday, 2024-08-07 Wednesday.
    assert!(!resolve_slot(&ds, DayOfWeek::Tuesday, t("11:00"), date("2024-08-06")).is_empty());
    assert!(!resolve_slot(&ds, DayOfWeek::Thursday, t("11:00"), date("2024-08-08")).is_empty());
    assert!(resolve_slot(&ds, DayOfWeek::Wednesday, t("11:00"), date("2024-08-07")).is_empty());
}

// ── Holidays ────────────────────────────────────────────────────────────────

#[test]
fn holiday_on_exact_date_suppresses_subject() {
    // 2024-10-16 is a Wednesday.
    let ds = dataset(
        vec![entry("calc", &[DayOfWeek::Wednesday], "13:00", "15:00")],
        vec![holiday("mid", "2024-10-16")],
    );

    let cell = resolve_slot(&ds, DayOfWeek::Wednesday, t("13:00"), date("2024-10-16"));
    assert!(matches!(cell, CellContent::Holiday(h) if h.id == "mid"));
}

#[test]
fn holiday_fills_every_slot_of_its_date() {
    let ds = dataset(vec![], vec![holiday("mid", "2024-10-16")]);

    let cell = resolve_slot(&ds, DayOfWeek::Wednesday, t("08:00"), date("2024-10-16"));
    assert!(matches!(cell, CellContent::Holiday(_)));
}

#[test]
fn holidays_sharing_a_date_show_lowest_id_without_warnings() {
    let ds = dataset(
        vec![entry("calc", &[DayOfWeek::Wednesday], "13:00", "15:00")],
        vec![holiday("z_sports", "2024-10-16"), holiday("a_midterm", "2024-10-16")],
    );

    let (cell, warning) = resolve_slot_checked(&ds, DayOfWeek::Wednesday, t("13:00"), date("2024-10-16"));
    assert_eq!(cell.occupant_id(), Some("a_midterm"));
    assert_eq!(warning, None);

    let grid = resolve_week(&ds, date("2024-10-16"), &GridConfig::default());
    assert!(grid.warnings.is_empty());
}

#[test]
fn holiday_on_nearby_date_does_not_cancel_class() {
    // Holiday on Tuesday 2024-10-15; the Wednesday class the next day still meets.
    let ds = dataset(
        vec![entry("calc", &[DayOfWeek::Wednesday], "13:00", "15:00")],
        vec![with_makeup(holiday("mid", "2024-10-15"), "2024-10-20", "09:00", "11:00")],
    );

    let cell = resolve_slot(&ds, DayOfWeek::Wednesday, t("13:00"), date("2024-10-16"));
    assert!(matches!(cell, CellContent::Subject(e) if e.id == "calc"));
}

#[test]
fn holiday_does_not_recur_weekly() {
    let ds = dataset(
        vec![entry("calc", &[DayOfWeek::Wednesday], "13:00", "15:00")],
        vec![holiday("mid", "2024-10-16")],
    );

    let cell = resolve_slot(&ds, DayOfWeek::Wednesday, t("13:00"), date("2024-10-23"));
    assert!(matches!(cell, CellContent::Subject(_)));
}

// ── Makeups ─────────────────────────────────────────────────────────────────

#[test]
fn makeup_is_placed_on_its_own_weekday() {
    // 2024-10-20 is a Sunday; the original class met on Tuesdays.
    let ds = dataset(
        vec![],
        vec![with_makeup(holiday("mid", "2024-10-15"), "2024-10-20", "09:00", "11:00")],
    );

    let cell = resolve_slot(&ds, DayOfWeek::Sunday, t("09:30"), date("2024-10-20"));
    assert!(matches!(cell, CellContent::Makeup(h) if h.id == "mid"));
}

#[test]
fn makeup_ignores_day_argument() {
    let ds = dataset(
        vec![],
        vec![with_makeup(holiday("mid", "2024-10-15"), "2024-10-20", "09:00", "11:00")],
    );

    let cell = resolve_slot(&ds, DayOfWeek::Monday, t("09:30"), date("2024-10-20"));
    assert!(matches!(cell, CellContent::Makeup(_)));
}

#[test]
fn makeup_range_is_half_open() {
    let ds = dataset(
        vec![],
        vec![with_makeup(holiday("mid", "2024-10-15"), "2024-10-20", "09:00", "11:00")],
    );

    assert!(resolve_slot(&ds, DayOfWeek::Sunday, t("11:00"), date("2024-10-20")).is_empty());
    assert!(resolve_slot(&ds, DayOfWeek::Sunday, t("08:59"), date("2024-10-20")).is_empty());
}

#[test]
fn makeup_only_on_exact_date() {
    let ds = dataset(
        vec![],
        vec![with_makeup(holiday("mid", "2024-10-15"), "2024-10-20", "09:00", "11:00")],
    );

    assert!(resolve_slot(&ds, DayOfWeek::Sunday, t("09:30"), date("2024-10-27")).is_empty());
}

// ── Precedence ──────────────────────────────────────────────────────────────

#[test]
fn makeup_dominates_holiday_and_subject() {
    // A holiday on Wednesday 2024-10-16 with a makeup the same day at class time.
    let ds = dataset(
        vec![entry("calc", &[DayOfWeek::Wednesday], "13:00", "15:00")],
        vec![with_makeup(holiday("mid", "2024-10-16"), "2024-10-16", "13:00", "14:00")],
    );

    let at_13 = resolve_slot(&ds, DayOfWeek::Wednesday, t("13:00"), date("2024-10-16"));
    assert!(matches!(at_13, CellContent::Makeup(_)));

    // Outside the makeup window the holiday still cancels the class.
    let at_14 = resolve_slot(&ds, DayOfWeek::Wednesday, t("14:00"), date("2024-10-16"));
    assert!(matches!(at_14, CellContent::Holiday(_)));
}

#[test]
fn makeup_from_another_holiday_beats_holiday_on_same_date() {
    let ds = dataset(
        vec![],
        vec![
            holiday("a_day_off", "2024-10-20"),
            with_makeup(holiday("b_moved", "2024-10-15"), "2024-10-20", "09:00", "11:00"),
        ],
    );

    let cell = resolve_slot(&ds, DayOfWeek::Sunday, t("10:00"), date("2024-10-20"));
    assert!(matches!(cell, CellContent::Makeup(h) if h.id == "b_moved"));
}

#[test]
fn resolution_is_idempotent() {
    let ds = dataset(
        vec![entry("calc", &[DayOfWeek::Wednesday], "13:00", "15:00")],
        vec![with_makeup(holiday("mid", "2024-10-16"), "2024-10-20", "09:00", "11:00")],
    );

    for (day, slot, on) in [
        (DayOfWeek::Wednesday, "13:00", "2024-10-16"),
        (DayOfWeek::Sunday, "09:00", "2024-10-20"),
        (DayOfWeek::Wednesday, "14:00", "2024-10-23"),
        (DayOfWeek::Friday, "10:00", "2024-10-18"),
    ] {
        let first = resolve_slot(&ds, day, t(slot), date(on));
        let second = resolve_slot(&ds, day, t(slot), date(on));
        assert_eq!(first, second);
    }
}

// ── Data integrity ──────────────────────────────────────────────────────────

#[test]
fn overlapping_subjects_pick_lowest_id_and_warn() {
    // Bypasses the conflict checker by inserting directly into the snapshot.
    let ds = dataset(
        vec![
            entry("b_phys", &[DayOfWeek::Friday], "09:00", "12:00"),
            entry("a_chem", &[DayOfWeek::Friday], "10:00", "11:00"),
        ],
        vec![],
    );

    let (cell, warning) = resolve_slot_checked(&ds, DayOfWeek::Friday, t("10:00"), date("2024-08-09"));
    assert_eq!(cell.occupant_id(), Some("a_chem"));

    let warning = warning.expect("ambiguity must be reported");
    assert_eq!(warning.kind, OccupantKind::Subject);
    assert_eq!(warning.chosen, "a_chem");
    assert_eq!(warning.others, vec!["b_phys".to_string()]);
}

#[test]
fn single_match_has_no_warning() {
    let ds = dataset(vec![entry("phys", &[DayOfWeek::Friday], "09:00", "12:00")], vec![]);

    let (_, warning) = resolve_slot_checked(&ds, DayOfWeek::Friday, t("10:00"), date("2024-08-09"));
    assert!(warning.is_none());
}

// ── Week grid ───────────────────────────────────────────────────────────────

#[test]
fn default_grid_has_hourly_rows_eight_to_nineteen() {
    let config = GridConfig::default();
    assert_eq!(config.slots.len(), 12);
    assert_eq!(config.slots[0], t("08:00"));
    assert_eq!(config.slots[11], t("19:00"));
    assert_eq!(config.week_start, WeekStart::Sunday);
}

#[test]
fn week_grid_places_subjects_holidays_and_makeups() {
    let ds = dataset(
        vec![
            entry("calc", &[DayOfWeek::Wednesday], "13:00", "15:00"),
            entry("cs", &[DayOfWeek::Tuesday], "10:00", "12:00"),
        ],
        vec![with_makeup(holiday("mid", "2024-10-15"), "2024-10-20", "09:00", "11:00")],
    );

    // Week of Sunday 2024-10-13 .. Saturday 2024-10-19.
    let grid = resolve_week(&ds, date("2024-10-16"), &GridConfig::default());
    assert_eq!(grid.week_start, date("2024-10-13"));
    assert_eq!(grid.days.len(), 7);
    assert_eq!(grid.days[2].day, DayOfWeek::Tuesday);
    assert_eq!(grid.rows.len(), 12);
    assert!(grid.warnings.is_empty());

    // Row 2 is 10:00, column 2 is Tuesday the 15th: holiday.
    assert!(matches!(grid.cell(2, 2), Some(CellContent::Holiday(_))));
    // Row 5 is 13:00, column 3 is Wednesday the 16th: calculus.
    assert_eq!(grid.cell(5, 3).and_then(|c| c.occupant_id()), Some("calc"));
    // Row 7 is 15:00: class has ended.
    assert!(grid.cell(7, 3).is_some_and(|c| c.is_empty()));

    // The makeup on Sunday the 20th is in the following week.
    let next = resolve_week(&ds, date("2024-10-20"), &GridConfig::default());
    assert!(matches!(next.cell(1, 0), Some(CellContent::Makeup(_))));
}

#[test]
fn monday_grid_shifts_columns() {
    let ds = dataset(vec![entry("calc", &[DayOfWeek::Wednesday], "13:00", "15:00")], vec![]);
    let config = GridConfig {
        week_start: WeekStart::Monday,
        ..GridConfig::default()
    };

    let grid = resolve_week(&ds, date("2024-08-07"), &config);
    assert_eq!(grid.week_start, date("2024-08-05"));
    assert_eq!(grid.days[0].day, DayOfWeek::Monday);
    assert_eq!(grid.cell(5, 2).and_then(|c| c.occupant_id()), Some("calc"));
}

#[test]
fn grid_collects_integrity_warnings() {
    let ds = dataset(
        vec![
            entry("a", &[DayOfWeek::Friday], "09:00", "11:00"),
            entry("b", &[DayOfWeek::Friday], "10:00", "12:00"),
        ],
        vec![],
    );

    let grid = resolve_week(&ds, date("2024-08-09"), &GridConfig::default());
    // Only the 10:00 row overlaps.
    assert_eq!(grid.warnings.len(), 1);
    assert_eq!(grid.warnings[0].slot, t("10:00"));
}

#[test]
fn cell_content_serializes_with_kind_and_payload() {
    let ds = dataset(vec![entry("calc", &[DayOfWeek::Wednesday], "13:00", "15:00")], vec![]);
    let cell = resolve_slot(&ds, DayOfWeek::Wednesday, t("13:00"), date("2024-08-07"));

    let json: serde_json::Value = serde_json::to_value(&cell).unwrap();
    assert_eq!(json["kind"], "Subject");
    assert_eq!(json["payload"]["id"], "calc");
    assert_eq!(json["payload"]["startTime"], "13:00");

    let empty = serde_json::to_value(CellContent::Empty).unwrap();
    assert_eq!(empty["kind"], "Empty");
}

#[test]
fn custom_slots_every_thirty_minutes() {
    let slots = time_slots(t("08:00"), t("10:00"), 30).unwrap();
    assert_eq!(slots, vec![t("08:00"), t("08:30"), t("09:00"), t("09:30"), t("10:00")]);
    assert!(time_slots(t("08:00"), t("10:00"), 0).is_err());
}

#[test]
fn oversized_slot_step_gives_only_the_first_row() {
    assert_eq!(time_slots(t("08:00"), t("19:00"), u32::MAX).unwrap(), vec![t("08:00")]);
    assert_eq!(time_slots(t("08:00"), t("19:00"), 24 * 60).unwrap(), vec![t("08:00")]);
    assert_eq!(time_slots(t("23:59"), t("23:59"), 1).unwrap(), vec![t("23:59")]);
}
