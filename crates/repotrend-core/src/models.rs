use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::Error;

pub const DEFAULT_DESCRIPTION: &str = "No description available";

/// Repository model
///
/// Identity is `id`. `is_favorite` is never trusted from the network; it is
/// re-derived from the favorites store before anything is shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub id: i64,
    pub name: String,
    pub full_name: String,
    pub description: Option<String>,
    pub owner: Owner,
    pub stars: u32,
    pub language: Option<String>,
    pub forks: u32,
    pub created_at: DateTime<Utc>,
    pub html_url: String,
    #[serde(default)]
    pub is_favorite: bool,
}

impl Repository {
    /// Copy with the favorite flag set to `is_favorite`
    pub fn with_favorite(&self, is_favorite: bool) -> Self {
        Self {
            is_favorite,
            ..self.clone()
        }
    }

    pub fn description_or_default(&self) -> &str {
        self.description.as_deref().unwrap_or(DEFAULT_DESCRIPTION)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub id: i64,
    pub login: String,
    pub avatar_url: Option<String>,
}

/// Window used to pick "trending" repositories by creation date
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeFrame {
    #[default]
    Day,
    Week,
    Month,
}

impl TimeFrame {
    pub fn display_name(&self) -> &'static str {
        match self {
            TimeFrame::Day => "Last Day",
            TimeFrame::Week => "Last Week",
            TimeFrame::Month => "Last Month",
        }
    }

    /// Key understood by the trending listing endpoint
    pub fn listing_key(&self) -> &'static str {
        match self {
            TimeFrame::Day => "daily",
            TimeFrame::Week => "weekly",
            TimeFrame::Month => "monthly",
        }
    }
}

impl std::fmt::Display for TimeFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl FromStr for TimeFrame {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "day" | "daily" => Ok(TimeFrame::Day),
            "week" | "weekly" => Ok(TimeFrame::Week),
            "month" | "monthly" => Ok(TimeFrame::Month),
            other => Err(Error::ConfigError(format!(
                "Unknown time frame '{}', expected day, week or month",
                other
            ))),
        }
    }
}
