//! Calendar and time-of-day arithmetic shared by the resolver, expander, and
//! conflict checker.
//!
//! Dates are plain calendar days (`NaiveDate`); times are whole minutes since
//! midnight (`TimeOfDay`). Nothing in this module reads the system clock except
//! [`today_in`].

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TimetableError};

const MINUTES_PER_DAY: u32 = 24 * 60;

/// Day of the week, indexed 0 = Sunday through 6 = Saturday.
///
/// Serialized as its integer index so stored records keep the `dayOfWeek`
/// shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum DayOfWeek {
    Sunday = 0,
    Monday = 1,
    Tuesday = 2,
    Wednesday = 3,
    Thursday = 4,
    Friday = 5,
    Saturday = 6,
}

impl DayOfWeek {
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Sunday,
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
    ];

    /// Look up a day by its 0 = Sunday index.
    pub fn from_index(index: u8) -> Result<Self> {
        Self::ALL
            .get(index as usize)
            .copied()
            .ok_or_else(|| TimetableError::InvalidDate(format!("day index {index} is not in 0..=6")))
    }

    pub fn index(self) -> u8 {
        self as u8
    }

    /// The weekday a calendar date falls on.
    pub fn of(date: NaiveDate) -> Self {
        Self::from(date.weekday())
    }

    /// Parse a lower-case English day name as used by bucketed timetables
    /// (`"monday"`). Matching is case-insensitive.
    pub fn from_name(name: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|d| d.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| TimetableError::InvalidDate(format!("unknown day name '{name}'")))
    }

    pub fn name(self) -> &'static str {
        match self {
            DayOfWeek::Sunday => "sunday",
            DayOfWeek::Monday => "monday",
            DayOfWeek::Tuesday => "tuesday",
            DayOfWeek::Wednesday => "wednesday",
            DayOfWeek::Thursday => "thursday",
            DayOfWeek::Friday => "friday",
            DayOfWeek::Saturday => "saturday",
        }
    }

    /// Two-letter RFC 5545 BYDAY code.
    pub fn rrule_code(self) -> &'static str {
        match self {
            DayOfWeek::Sunday => "SU",
            DayOfWeek::Monday => "MO",
            DayOfWeek::Tuesday => "TU",
            DayOfWeek::Wednesday => "WE",
            DayOfWeek::Thursday => "TH",
            DayOfWeek::Friday => "FR",
            DayOfWeek::Saturday => "SA",
        }
    }
}

impl From<Weekday> for DayOfWeek {
    fn from(w: Weekday) -> Self {
        // num_days_from_sunday is always 0..=6.
        Self::ALL[w.num_days_from_sunday() as usize]
    }
}

impl TryFrom<u8> for DayOfWeek {
    type Error = TimetableError;

    fn try_from(index: u8) -> Result<Self> {
        Self::from_index(index)
    }
}

impl From<DayOfWeek> for u8 {
    fn from(d: DayOfWeek) -> u8 {
        d.index()
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.name();
        let (first, rest) = name.split_at(1);
        write!(f, "{}{}", first.to_ascii_uppercase(), rest)
    }
}

/// Which weekday a displayed week begins on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekStart {
    #[default]
    Sunday,
    Monday,
}

impl WeekStart {
    pub fn first_day(self) -> DayOfWeek {
        match self {
            WeekStart::Sunday => DayOfWeek::Sunday,
            WeekStart::Monday => DayOfWeek::Monday,
        }
    }
}

impl FromStr for WeekStart {
    type Err = TimetableError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sunday" | "sun" => Ok(WeekStart::Sunday),
            "monday" | "mon" => Ok(WeekStart::Monday),
            other => Err(TimetableError::InvalidDate(format!(
                "week start must be 'sunday' or 'monday', got '{other}'"
            ))),
        }
    }
}

/// A wall-clock time with minute precision, `00:00` through `23:59`.
///
/// Serialized as an `HH:MM` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay(pub(crate) u16);

impl TimeOfDay {
    pub fn from_minutes(minutes: u32) -> Result<Self> {
        if minutes >= MINUTES_PER_DAY {
            return Err(TimetableError::InvalidTime(format!(
                "{minutes} minutes is past the end of the day"
            )));
        }
        Ok(TimeOfDay(minutes as u16))
    }

    pub fn hm(hour: u32, minute: u32) -> Result<Self> {
        if hour > 23 || minute > 59 {
            return Err(TimetableError::InvalidTime(format!("{hour}:{minute:02}")));
        }
        Self::from_minutes(hour * 60 + minute)
    }

    pub fn minutes(self) -> u32 {
        u32::from(self.0)
    }

    pub fn to_naive_time(self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.minutes() / 60, self.minutes() % 60, 0)
            .unwrap_or(NaiveTime::MIN)
    }
}

impl FromStr for TimeOfDay {
    type Err = TimetableError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_minutes(time_to_minutes(s)?)
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = TimetableError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<TimeOfDay> for String {
    fn from(t: TimeOfDay) -> String {
        t.to_string()
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

/// Parse `HH:MM` (one- or two-digit hour, two-digit minute) into minutes
/// since midnight.
///
/// # Errors
/// Returns `TimetableError::InvalidTime` for anything else, including
/// out-of-range hours or minutes.
pub fn time_to_minutes(hhmm: &str) -> Result<u32> {
    let invalid = || TimetableError::InvalidTime(format!("'{hhmm}' is not HH:MM"));

    let (h, m) = hhmm.split_once(':').ok_or_else(invalid)?;
    if h.is_empty() || h.len() > 2 || m.len() != 2 {
        return Err(invalid());
    }
    if !h.bytes().chain(m.bytes()).all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let hours: u32 = h.parse().map_err(|_| invalid())?;
    let minutes: u32 = m.parse().map_err(|_| invalid())?;
    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }
    Ok(hours * 60 + minutes)
}

/// Format minutes since midnight as zero-padded `HH:MM`.
pub fn minutes_to_time(minutes: u32) -> Result<String> {
    TimeOfDay::from_minutes(minutes).map(|t| t.to_string())
}

/// Half-open membership: `start <= time < end`.
///
/// A class ending at 12:00 does not occupy the 12:00 slot.
pub fn is_time_in_range(time: TimeOfDay, start: TimeOfDay, end: TimeOfDay) -> bool {
    start <= time && time < end
}

/// Parse a `YYYY-MM-DD` calendar date.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| TimetableError::InvalidDate(format!("'{s}': {e}")))
}

/// Inclusive on both ends: `start <= date <= end`.
pub fn is_date_in_period(date: NaiveDate, start: NaiveDate, end: NaiveDate) -> bool {
    start <= date && date <= end
}

/// First day of the week containing `reference`.
pub fn start_of_week(reference: NaiveDate, week_start: WeekStart) -> NaiveDate {
    let current = i64::from(DayOfWeek::of(reference).index());
    let first = i64::from(week_start.first_day().index());
    let back = (current - first).rem_euclid(7);
    reference - Duration::days(back)
}

/// `week_start + day_index` days. `day_index` must be in `0..=6`.
pub fn date_for_day_offset(week_start: NaiveDate, day_index: u32) -> Result<NaiveDate> {
    if day_index > 6 {
        return Err(TimetableError::InvalidDate(format!(
            "day offset {day_index} is outside a week"
        )));
    }
    Ok(week_start + Duration::days(i64::from(day_index)))
}

/// The seven consecutive dates of the week beginning at `week_start`.
pub fn week_days(week_start: NaiveDate) -> [NaiveDate; 7] {
    std::array::from_fn(|i| week_start + Duration::days(i as i64))
}

/// Move a week start forward (positive) or backward (negative) by whole weeks.
pub fn navigate_week(week_start: NaiveDate, weeks: i64) -> NaiveDate {
    week_start + Duration::weeks(weeks)
}

pub fn is_in_week(date: NaiveDate, week_start: NaiveDate) -> bool {
    is_date_in_period(date, week_start, week_start + Duration::days(6))
}

/// Absolute number of whole days between two dates.
pub fn days_between(a: NaiveDate, b: NaiveDate) -> i64 {
    (a - b).num_days().abs()
}

/// Today's calendar date in the given timezone.
pub fn today_in(tz: Tz) -> NaiveDate {
    Utc::now().with_timezone(&tz).date_naive()
}

/// Human-oriented distance of a date from "today".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelativeDay {
    Today,
    Tomorrow,
    Yesterday,
    InDays(i64),
    DaysAgo(i64),
    /// More than a week away in either direction.
    On(NaiveDate),
}

pub fn relative_day(date: NaiveDate, today: NaiveDate) -> RelativeDay {
    match (date - today).num_days() {
        0 => RelativeDay::Today,
        1 => RelativeDay::Tomorrow,
        -1 => RelativeDay::Yesterday,
        n @ 2..=7 => RelativeDay::InDays(n),
        n @ -7..=-2 => RelativeDay::DaysAgo(-n),
        _ => RelativeDay::On(date),
    }
}

impl fmt::Display for RelativeDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelativeDay::Today => write!(f, "today"),
            RelativeDay::Tomorrow => write!(f, "tomorrow"),
            RelativeDay::Yesterday => write!(f, "yesterday"),
            RelativeDay::InDays(n) => write!(f, "in {n} days"),
            RelativeDay::DaysAgo(n) => write!(f, "{n} days ago"),
            RelativeDay::On(d) => write!(f, "{}", d.format("%a %-d %b %Y")),
        }
    }
}

/// Academic year and semester derivation.
///
/// The year rolls over in `year_start_month`; `era_offset` is added to the
/// Gregorian year (543 gives the Buddhist era). Semesters are counted from
/// the rollover month: the first five months are semester 1, the next five
/// semester 2, and the remaining two the summer semester 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcademicCalendar {
    pub year_start_month: u32,
    pub era_offset: i32,
}

impl Default for AcademicCalendar {
    fn default() -> Self {
        AcademicCalendar {
            year_start_month: 8,
            era_offset: 0,
        }
    }
}

impl AcademicCalendar {
    /// `year_start_month` must name a calendar month.
    pub fn validate(&self) -> Result<()> {
        if !(1..=12).contains(&self.year_start_month) {
            return Err(TimetableError::InvalidDate(format!(
                "academic year start month {} is not in 1..=12",
                self.year_start_month
            )));
        }
        Ok(())
    }

    pub fn academic_year(&self, date: NaiveDate) -> i32 {
        let rolled = if date.month() >= self.year_start_month { 1 } else { 0 };
        date.year() + self.era_offset + rolled
    }

    pub fn semester(&self, date: NaiveDate) -> u8 {
        let start = self.year_start_month.clamp(1, 12);
        let months_in = (date.month() + 12 - start) % 12;
        match months_in {
            0..=4 => 1,
            5..=9 => 2,
            _ => 3,
        }
    }

    /// Default display name for a term beginning on `date`, e.g. `Term 1/2025`.
    pub fn term_name(&self, date: NaiveDate) -> String {
        format!("Term {}/{}", self.semester(date), self.academic_year(date))
    }
}
