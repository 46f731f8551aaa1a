//! `timetable.toml`: display and calendar settings for the CLI.
//!
//! ```toml
//! week_start = "monday"
//! timezone = "Asia/Bangkok"
//!
//! [slots]
//! start = "08:00"
//! end = "19:00"
//! step_minutes = 60
//!
//! [academic]
//! year_start_month = 8
//! era_offset = 543
//! ```
//!
//! Every field is optional.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use timetable_engine::clock::AcademicCalendar;
use timetable_engine::resolver::time_slots;
use timetable_engine::{GridConfig, TimeOfDay, WeekStart};
use tracing::{debug, info};

pub const DEFAULT_CONFIG_FILE: &str = "timetable.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    pub week_start: WeekStart,
    /// IANA zone used to decide what "today" is.
    pub timezone: String,
    pub slots: SlotConfig,
    pub academic: AcademicCalendar,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SlotConfig {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
    pub step_minutes: u32,
}

impl Default for CliConfig {
    fn default() -> Self {
        CliConfig {
            week_start: WeekStart::Sunday,
            timezone: "UTC".to_string(),
            slots: SlotConfig::default(),
            academic: AcademicCalendar::default(),
        }
    }
}

impl Default for SlotConfig {
    fn default() -> Self {
        SlotConfig {
            start: GridConfig::FIRST_SLOT,
            end: GridConfig::LAST_SLOT,
            step_minutes: 60,
        }
    }
}

impl CliConfig {
    /// Load from an explicit path (which must exist), else from
    /// `./timetable.toml` if present, else defaults.
    #[tracing::instrument]
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let path = match explicit {
            Some(p) => Some(p.to_path_buf()),
            None => Some(PathBuf::from(DEFAULT_CONFIG_FILE)).filter(|p| p.is_file()),
        };

        let Some(path) = path else {
            debug!("no config file; using defaults");
            return Ok(CliConfig::default());
        };

        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config = Self::from_toml(&text).with_context(|| format!("invalid config file {}", path.display()))?;
        info!(config = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        let config: CliConfig = toml::from_str(text)?;
        config.timezone()?;
        config.grid()?;
        config.academic.validate()?;
        Ok(config)
    }

    pub fn timezone(&self) -> anyhow::Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| anyhow!("unknown timezone '{}'", self.timezone))
    }

    pub fn grid(&self) -> anyhow::Result<GridConfig> {
        if self.slots.end < self.slots.start {
            return Err(anyhow!(
                "slot range ends at {} before it starts at {}",
                self.slots.end,
                self.slots.start
            ));
        }
        let slots = time_slots(self.slots.start, self.slots.end, self.slots.step_minutes)?;
        Ok(GridConfig {
            week_start: self.week_start,
            slots,
        })
    }
}
