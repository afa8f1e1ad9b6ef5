//! The extension's view of the Memordo REST API.
//!
//! `HistoryBackend` is the seam the collector, session bridge and message
//! router talk to. `HttpBackend` implements it over HTTP; tests swap in
//! in-process fakes.

use crate::types::errors::BackendError;
use crate::types::history::{CollectReport, DeleteReport, HistoryPage};
use crate::types::session::{Credentials, TokenPair};
use crate::types::visit::{VisitEntry, VisitKey};

/// Prefix every API route is mounted under.
pub const API_PREFIX: &str = "/memo/api";

/// Operations the extension performs against the history backend.
#[allow(async_fn_in_trait)]
pub trait HistoryBackend {
    async fn login(&self, credentials: &Credentials) -> Result<TokenPair, BackendError>;
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, BackendError>;
    async fn collect(&self, token: &str, entries: &[VisitEntry]) -> Result<CollectReport, BackendError>;
    async fn delete(&self, token: &str, keys: &[VisitKey]) -> Result<DeleteReport, BackendError>;
    async fn list(&self, token: &str, page: u32, limit: u32) -> Result<HistoryPage, BackendError>;
    async fn search(
        &self,
        token: &str,
        query: &str,
        page: u32,
        limit: u32,
    ) -> Result<HistoryPage, BackendError>;
}
