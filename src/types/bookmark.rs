use serde::{Deserialize, Serialize};

/// Counts produced by a bookmark toggle pass.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ToggleSummary {
    pub added_count: usize,
    pub removed_count: usize,
}

/// Counts produced by deleting visits from the local lists.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct LocalDeletion {
    pub visited_removed: usize,
    pub bookmarks_removed: usize,
}
