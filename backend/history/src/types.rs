use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use quill_core::{CorrectionResult, SourceType};

/// One stored essay check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: u64,
    pub content: String,
    pub result: CorrectionResult,
    pub source_type: SourceType,
    pub created_at: DateTime<Local>,
}

/// Age window for listing records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryFilter {
    #[default]
    All,
    /// Within the last 24 hours.
    Today,
    ThreeDays,
    Week,
}

impl HistoryFilter {
    /// Whether a record created at `created_at` falls in the window ending at `now`.
    ///
    /// Windows count whole elapsed days, so `ThreeDays` keeps anything less
    /// than four full days old.
    pub fn admits(&self, created_at: DateTime<Local>, now: DateTime<Local>) -> bool {
        let days = (now - created_at).num_days();
        match self {
            Self::All => true,
            Self::Today => days == 0,
            Self::ThreeDays => days <= 3,
            Self::Week => days <= 7,
        }
    }
}

impl FromStr for HistoryFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "today" => Ok(Self::Today),
            "3days" | "three_days" => Ok(Self::ThreeDays),
            "week" => Ok(Self::Week),
            other => Err(format!("unknown history filter '{other}' (all, today, 3days, week)")),
        }
    }
}

impl fmt::Display for HistoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::All => "all",
            Self::Today => "today",
            Self::ThreeDays => "3days",
            Self::Week => "week",
        };
        write!(f, "{}", s)
    }
}
