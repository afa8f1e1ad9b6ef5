//! Bookmark toggling and local deletion over the extension's visit lists.
//!
//! Bookmarks are identified by url + timestamp. Toggling an item that is
//! bookmarked removes it; otherwise it is added, taking the stored visit entry
//! when one exists so the bookmark keeps the recorded title.

use log::info;

use crate::store::{ExtensionStorage, LocalStore};
use crate::types::bookmark::{LocalDeletion, ToggleSummary};
use crate::types::errors::StoreError;
use crate::types::visit::VisitEntry;

/// Applies a toggle pass to `bookmarks` in place. Items are processed in order,
/// so an item listed twice in one pass is added and then removed again.
pub fn toggle_bookmarks(
    bookmarks: &mut Vec<VisitEntry>,
    visited: &[VisitEntry],
    items: &[VisitEntry],
) -> ToggleSummary {
    let mut summary = ToggleSummary::default();
    for item in items {
        match bookmarks
            .iter()
            .position(|b| b.same_visit(&item.url, &item.timestamp))
        {
            Some(index) => {
                bookmarks.remove(index);
                summary.removed_count += 1;
            }
            None => {
                let entry = visited
                    .iter()
                    .find(|v| v.same_visit(&item.url, &item.timestamp))
                    .cloned()
                    .unwrap_or_else(|| item.clone());
                bookmarks.push(entry);
                summary.added_count += 1;
            }
        }
    }
    summary
}

/// Removes every entry whose timestamp is listed, returning how many went.
pub fn remove_by_timestamps(entries: &mut Vec<VisitEntry>, timestamps: &[String]) -> usize {
    let before = entries.len();
    entries.retain(|e| !timestamps.contains(&e.timestamp));
    before - entries.len()
}

/// Toggles `items` against the stored bookmark list and persists the result.
pub fn toggle_stored_bookmarks<S: LocalStore>(
    storage: &mut ExtensionStorage<S>,
    items: &[VisitEntry],
) -> Result<ToggleSummary, StoreError> {
    let mut bookmarks = storage.bookmarks()?;
    let visited = storage.visited()?;
    let summary = toggle_bookmarks(&mut bookmarks, &visited, items);
    storage.set_bookmarks(&bookmarks)?;
    info!(
        "[bookmarks] toggled {} item(s): +{} -{}",
        items.len(),
        summary.added_count,
        summary.removed_count
    );
    Ok(summary)
}

/// Deletes the listed timestamps from both the visit and bookmark lists.
pub fn delete_local_entries<S: LocalStore>(
    storage: &mut ExtensionStorage<S>,
    timestamps: &[String],
) -> Result<LocalDeletion, StoreError> {
    let mut visited = storage.visited()?;
    let mut bookmarks = storage.bookmarks()?;
    let deletion = LocalDeletion {
        visited_removed: remove_by_timestamps(&mut visited, timestamps),
        bookmarks_removed: remove_by_timestamps(&mut bookmarks, timestamps),
    };
    storage.set_visited(&visited)?;
    storage.set_bookmarks(&bookmarks)?;
    Ok(deletion)
}
