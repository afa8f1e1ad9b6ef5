//! Turns finished page loads into visit records.
//!
//! With a session, each visit is sent to the backend as a one-element batch
//! and kept in the local `visitedUrls` list (deduplicated by normalized URL).
//! Without one, [`OfflinePolicy`] decides whether the visit is dropped or
//! parked in `pendingVisits` until the next login.

use log::{debug, info, warn};

use super::backend_client::HistoryBackend;
use super::url_normalizer::same_page;
use crate::store::{ExtensionStorage, LocalStore};
use crate::types::errors::{SessionError, StoreError};
use crate::types::history::CollectReport;
use crate::types::navigation::{CollectOutcome, NavigationEvent};
use crate::types::settings::OfflinePolicy;
use crate::types::visit::VisitEntry;

pub struct HistoryCollector<'a, S: LocalStore, B: HistoryBackend> {
    storage: &'a mut ExtensionStorage<S>,
    backend: &'a B,
    policy: OfflinePolicy,
}

impl<'a, S: LocalStore, B: HistoryBackend> HistoryCollector<'a, S, B> {
    pub fn new(storage: &'a mut ExtensionStorage<S>, backend: &'a B, policy: OfflinePolicy) -> Self {
        Self {
            storage,
            backend,
            policy,
        }
    }

    /// Handles one tab update. Backend failures are reported in the outcome;
    /// only local storage failures surface as errors.
    pub async fn handle_navigation(
        &mut self,
        event: &NavigationEvent,
    ) -> Result<CollectOutcome, StoreError> {
        let Some((url, title)) = event.recordable() else {
            return Ok(CollectOutcome::Ignored);
        };
        if !self.storage.tracking_enabled()? {
            debug!("[collector] tracking disabled, skipping {}", url);
            return Ok(CollectOutcome::TrackingDisabled);
        }

        let entry = VisitEntry::visited_now(url, title);
        let Some(token) = self.storage.access_token()? else {
            return self.handle_offline(entry);
        };

        self.remember_visits(std::slice::from_ref(&entry))?;

        match self.backend.collect(&token, std::slice::from_ref(&entry)).await {
            Ok(report) => {
                debug!("[collector] sent {}: {}", entry.url, report.message);
                Ok(CollectOutcome::Sent {
                    inserted: report.inserted,
                    skipped: report.skipped,
                })
            }
            Err(e) if e.is_session_rejected() => {
                warn!("[collector] backend refused session, logging out: {}", e);
                self.storage.clear_session()?;
                Ok(CollectOutcome::SessionRevoked)
            }
            Err(e) => {
                warn!("[collector] failed to send {}: {}", entry.url, e);
                Ok(CollectOutcome::Failed {
                    message: e.to_string(),
                })
            }
        }
    }

    fn handle_offline(&mut self, entry: VisitEntry) -> Result<CollectOutcome, StoreError> {
        match self.policy {
            OfflinePolicy::Drop => {
                debug!("[collector] no session, dropping {}", entry.url);
                Ok(CollectOutcome::Dropped)
            }
            OfflinePolicy::Queue => {
                let mut pending = self.storage.pending()?;
                pending.push(entry);
                self.storage.set_pending(&pending)?;
                debug!("[collector] no session, {} visit(s) queued", pending.len());
                Ok(CollectOutcome::Queued {
                    pending: pending.len(),
                })
            }
        }
    }

    /// Appends entries to `visitedUrls`, skipping URLs already listed in
    /// normalized form.
    fn remember_visits(&mut self, entries: &[VisitEntry]) -> Result<(), StoreError> {
        let mut visited = self.storage.visited()?;
        let before = visited.len();
        for entry in entries {
            if !visited.iter().any(|v| same_page(&v.url, &entry.url)) {
                visited.push(entry.clone());
            }
        }
        if visited.len() != before {
            self.storage.set_visited(&visited)?;
        }
        Ok(())
    }

    /// Sends queued visits in one batch. Returns `None` when nothing was
    /// queued. The queue is cleared only once the backend accepted it; a
    /// refused session is torn down.
    pub async fn flush_pending(&mut self, token: &str) -> Result<Option<CollectReport>, SessionError> {
        let pending = self.storage.pending()?;
        if pending.is_empty() {
            return Ok(None);
        }

        match self.backend.collect(token, &pending).await {
            Ok(report) => {
                self.storage.set_pending(&[])?;
                self.remember_visits(&pending)?;
                info!(
                    "[collector] flushed {} queued visit(s): {}",
                    pending.len(),
                    report.message
                );
                Ok(Some(report))
            }
            Err(e) => {
                if e.is_session_rejected() {
                    self.storage.clear_session()?;
                }
                warn!("[collector] failed to flush queued visits: {}", e);
                Err(SessionError::Backend(e))
            }
        }
    }
}
