use chrono::{NaiveDate, Utc};
use serde::Serialize;

/// Hard cap on trending rows returned to readers, whatever the caller asks for.
pub const TRENDING_MAX_LIMIT: i64 = 20;
pub const TRENDING_DEFAULT_LIMIT: i64 = 10;

/// Category stored on a trending row when the caller supplies none.
pub const DEFAULT_TRENDING_CATEGORY: &str = "user-search";
/// Category stored on the raw search log when the caller supplies none.
pub const DEFAULT_LOG_CATEGORY: &str = "uncategorized";

/// Result of recording one search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordOutcome {
    Accepted,
    Duplicate,
    Rejected,
}

impl RecordOutcome {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RecordOutcome::Accepted => "accepted",
            RecordOutcome::Duplicate => "duplicate",
            RecordOutcome::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for RecordOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[must_use]
pub fn clamp_trending_limit(limit: Option<i64>) -> i64 {
    limit
        .unwrap_or(TRENDING_DEFAULT_LIMIT)
        .clamp(0, TRENDING_MAX_LIMIT)
}

/// Category filter for trending reads. Blank and `all` mean no filter.
#[must_use]
pub fn category_filter(category: Option<&str>) -> Option<&str> {
    category
        .map(str::trim)
        .filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case("all"))
}

/// The current calendar day in UTC, used as the dedup day.
#[must_use]
pub fn today_utc() -> NaiveDate {
    Utc::now().date_naive()
}
