//! Season phase as set by the league administrator

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Current phase of the season
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Period {
    /// League configuration before team building opens
    Setup,
    /// Team building before week 1 locks
    Preseason,
    /// Regular season week
    Week(u32),
}

impl Period {
    /// Transfers are unlimited and free outside the regular season
    pub fn transfers_are_free(self) -> bool {
        matches!(self, Period::Setup | Period::Preseason)
    }

    pub fn week(self) -> Option<u32> {
        match self {
            Period::Week(week) => Some(week),
            _ => None,
        }
    }
}

impl Default for Period {
    fn default() -> Self {
        Period::Preseason
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Setup => f.write_str("Setup"),
            Period::Preseason => f.write_str("Preseason"),
            Period::Week(week) => write!(f, "{week}"),
        }
    }
}

impl FromStr for Period {
    type Err = String;

    /// Parses the stored setting value: "Setup", "Preseason" or a week number
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim();
        if value.eq_ignore_ascii_case("setup") {
            return Ok(Period::Setup);
        }
        if value.eq_ignore_ascii_case("preseason") {
            return Ok(Period::Preseason);
        }
        let digits = value.strip_prefix("Week ").unwrap_or(value);
        match digits.parse::<u32>() {
            Ok(week) if week > 0 => Ok(Period::Week(week)),
            _ => Err(format!("Invalid period '{value}'")),
        }
    }
}
