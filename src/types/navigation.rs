use serde::{Deserialize, Serialize};

/// Tab update event delivered by the browser when a page changes state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NavigationEvent {
    #[serde(default)]
    pub tab_id: Option<i64>,
    /// Loading status, `"complete"` once the page has finished loading.
    pub status: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

impl NavigationEvent {
    pub fn complete(url: &str, title: &str) -> Self {
        Self {
            tab_id: None,
            status: "complete".to_string(),
            url: Some(url.to_string()),
            title: Some(title.to_string()),
        }
    }

    /// Returns `(url, title)` when the event describes a finished http(s) page
    /// with a non-empty title.
    pub fn recordable(&self) -> Option<(&str, &str)> {
        if self.status != "complete" {
            return None;
        }
        let url = self.url.as_deref()?;
        let title = self.title.as_deref()?;
        if !url.starts_with("http") || title.is_empty() {
            return None;
        }
        Some((url, title))
    }
}

/// What the history collector did with a navigation event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum CollectOutcome {
    /// The event was not a finished http(s) page with a title.
    Ignored,
    /// Tracking is switched off.
    TrackingDisabled,
    /// The entry was accepted by the backend.
    Sent { inserted: u64, skipped: u64 },
    /// No session and the offline policy discards visits.
    Dropped,
    /// No session; the visit waits in the pending queue.
    Queued { pending: usize },
    /// The backend refused the token and the session was cleared.
    SessionRevoked,
    /// The backend call failed for another reason.
    Failed { message: String },
}
