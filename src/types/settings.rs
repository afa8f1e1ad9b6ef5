use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What the collector does with a visit when nobody is logged in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OfflinePolicy {
    /// Discard the visit.
    #[default]
    Drop,
    /// Keep the visit in `pendingVisits` and send it after the next login.
    Queue,
}

impl fmt::Display for OfflinePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OfflinePolicy::Drop => write!(f, "drop"),
            OfflinePolicy::Queue => write!(f, "queue"),
        }
    }
}

impl FromStr for OfflinePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "drop" => Ok(OfflinePolicy::Drop),
            "queue" => Ok(OfflinePolicy::Queue),
            other => Err(format!("unknown offline policy: {}", other)),
        }
    }
}
