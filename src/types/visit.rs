use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// One recorded page visit.
///
/// The same shape is used for the local `visitedUrls`/`bookmarkedUrls` lists and
/// for the payload of the backend collect endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VisitEntry {
    pub url: String,
    #[serde(default)]
    pub title: String,
    pub timestamp: String,
}

impl VisitEntry {
    pub fn new(url: impl Into<String>, title: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            timestamp: timestamp.into(),
        }
    }

    /// Builds an entry stamped with the current time.
    pub fn visited_now(url: &str, title: &str) -> Self {
        Self::new(url, title, now_timestamp())
    }

    /// Bookmarks and server rows are identified by url + timestamp.
    pub fn same_visit(&self, url: &str, timestamp: &str) -> bool {
        self.url == url && self.timestamp == timestamp
    }
}

/// Identifies a visit row for deletion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VisitKey {
    pub url: String,
    pub timestamp: String,
}

impl From<&VisitEntry> for VisitKey {
    fn from(entry: &VisitEntry) -> Self {
        Self {
            url: entry.url.clone(),
            timestamp: entry.timestamp.clone(),
        }
    }
}

/// Current time as an RFC 3339 UTC string with millisecond precision.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parses an ISO-8601 timestamp and renders it in the canonical stored form
/// (`YYYY-MM-DDTHH:MM:SS.mmmZ`, UTC).
///
/// Accepts RFC 3339 with any offset, and naive `YYYY-MM-DD[T ]HH:MM:SS[.f]`
/// which is taken as UTC.
pub fn canonical_timestamp(raw: &str) -> Result<String, String> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed
            .with_timezone(&Utc)
            .to_rfc3339_opts(SecondsFormat::Millis, true));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive
                .and_utc()
                .to_rfc3339_opts(SecondsFormat::Millis, true));
        }
    }
    Err(format!("unparseable timestamp: {}", raw))
}
