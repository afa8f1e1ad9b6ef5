use serde::{Deserialize, Serialize};

/// A persisted visit row, as returned by list and search.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryRow {
    pub url: String,
    pub title: Option<String>,
    pub timestamp: String,
}

/// Overall result of a collect batch.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CollectStatus {
    Ok,
    PartialError,
    Error,
}

impl CollectStatus {
    /// HTTP status code the collect endpoint answers with.
    pub fn http_status(&self) -> u16 {
        match self {
            CollectStatus::Ok => 200,
            CollectStatus::PartialError => 207,
            CollectStatus::Error => 500,
        }
    }
}

/// Per-batch counters reported by the collect endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollectReport {
    pub message: String,
    pub status: CollectStatus,
    #[serde(default)]
    pub inserted: u64,
    #[serde(default)]
    pub skipped: u64,
    #[serde(default)]
    pub errors: u64,
}

impl CollectReport {
    pub fn from_counts(inserted: u64, skipped: u64, errors: u64) -> Self {
        let status = if errors == 0 {
            CollectStatus::Ok
        } else if inserted > 0 {
            CollectStatus::PartialError
        } else {
            CollectStatus::Error
        };
        Self {
            message: format!(
                "Processed. inserted: {}, skipped (duplicate/invalid): {}, errors: {}.",
                inserted, skipped, errors
            ),
            status,
            inserted,
            skipped,
            errors,
        }
    }

    pub fn empty() -> Self {
        Self {
            message: "No data to process".to_string(),
            status: CollectStatus::Ok,
            inserted: 0,
            skipped: 0,
            errors: 0,
        }
    }
}

/// Validated pagination window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    /// Rows to skip. Saturates at `i64::MAX`, which is past the end of any table.
    pub fn offset(&self) -> i64 {
        u64::from(self.page.saturating_sub(1))
            .checked_mul(u64::from(self.limit))
            .and_then(|n| i64::try_from(n).ok())
            .unwrap_or(i64::MAX)
    }
}

/// One page of list or search results.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryPage {
    pub results: Vec<HistoryRow>,
    pub page: u32,
    pub limit: u32,
    pub total_results: u64,
    pub total_pages: u64,
}

/// Result of a delete request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeleteReport {
    pub message: String,
    pub deleted: u64,
}

/// Aggregate view over a user's visits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct HistoryStats {
    pub total_visits: u64,
    /// Top domains by visit count, most visited first.
    pub top_domains: Vec<DomainCount>,
    /// Visits per UTC hour, index 0..=23.
    pub visits_by_hour: Vec<u64>,
    /// Visits per weekday, `Mon` first.
    pub visits_by_day: Vec<DayCount>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DayCount {
    pub day: String,
    pub visits: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DomainCount {
    pub domain: String,
    pub visits: u64,
}
