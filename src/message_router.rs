//! Message handler for the extension's popup and background events.
//!
//! `handle_message` dispatches an action string with its JSON payload to the
//! collector, session bridge, bookmark and search logic, and answers with the
//! JSON the UI expects. Errors are plain messages suitable for a toast. Any
//! server call refused with a 403 logs the extension out.

use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::server::history_service::{DEFAULT_LIST_LIMIT, DEFAULT_SEARCH_LIMIT};
use crate::services::backend_client::HistoryBackend;
use crate::services::bookmark_toggle::{delete_local_entries, toggle_stored_bookmarks};
use crate::services::history_collector::HistoryCollector;
use crate::services::history_search::{search_stored, HistoryFilter};
use crate::services::session_bridge::SessionBridge;
use crate::store::{ExtensionStorage, LocalStore};
use crate::types::errors::{BackendError, SessionError};
use crate::types::navigation::NavigationEvent;
use crate::types::settings::OfflinePolicy;
use crate::types::visit::{VisitEntry, VisitKey};

/// Everything a message handler may touch.
pub struct ExtensionContext<S: LocalStore, B: HistoryBackend> {
    pub storage: ExtensionStorage<S>,
    pub backend: B,
    pub policy: OfflinePolicy,
}

impl<S: LocalStore, B: HistoryBackend> ExtensionContext<S, B> {
    pub fn new(storage: ExtensionStorage<S>, backend: B, policy: OfflinePolicy) -> Self {
        Self {
            storage,
            backend,
            policy,
        }
    }

    fn session(&mut self) -> SessionBridge<'_, S, B> {
        SessionBridge::new(&mut self.storage, &self.backend, self.policy)
    }

    fn collector(&mut self) -> HistoryCollector<'_, S, B> {
        HistoryCollector::new(&mut self.storage, &self.backend, self.policy)
    }
}

fn parse_data<T: DeserializeOwned>(action: &str, data: &Value) -> Result<T, String> {
    serde_json::from_value(data.clone()).map_err(|e| format!("invalid {} payload: {}", action, e))
}

/// Like `parse_data`, but a missing payload means all defaults.
fn parse_optional<T: DeserializeOwned + Default>(action: &str, data: &Value) -> Result<T, String> {
    if data.is_null() {
        return Ok(T::default());
    }
    parse_data(action, data)
}

#[derive(Debug, Default, Deserialize)]
struct ServerPageRequest {
    query: Option<String>,
    page: Option<u32>,
    limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct LocalSearchRequest {
    #[serde(default)]
    query: String,
    #[serde(default)]
    filter: HistoryFilter,
}

fn require_token<S: LocalStore, B: HistoryBackend>(ctx: &ExtensionContext<S, B>) -> Result<String, String> {
    ctx.storage
        .access_token()
        .map_err(|e| e.to_string())?
        .ok_or_else(|| SessionError::NotLoggedIn.to_string())
}

/// Turns a failed server call into the toast message, ending the session
/// first when the backend refused the token.
fn server_failure<S: LocalStore, B: HistoryBackend>(
    ctx: &mut ExtensionContext<S, B>,
    action: &str,
    err: BackendError,
) -> String {
    if err.is_session_rejected() {
        if let Err(e) = ctx.session().force_logout() {
            warn!("[router] failed to clear rejected session: {}", e);
        }
    }
    warn!("[router] {} failed: {}", action, err);
    err.to_string()
}

/// Dispatch one extension message.
///
/// Returns `Ok(Value)` with the response body or `Err(String)` with the
/// message to show the user.
pub async fn handle_message<S: LocalStore, B: HistoryBackend>(
    ctx: &mut ExtensionContext<S, B>,
    action: &str,
    data: &Value,
) -> Result<Value, String> {
    debug!("[router] {}", action);
    match action {
        // ─── Session ───
        "login" => {
            let email = data.get("email").and_then(|v| v.as_str()).ok_or("missing email")?;
            let password = data.get("password").and_then(|v| v.as_str()).ok_or("missing password")?;
            if email.trim().is_empty() || password.is_empty() {
                return Err("Email and password are required".to_string());
            }
            let session = ctx
                .session()
                .login(email, password)
                .await
                .map_err(|e| match e {
                    SessionError::LoginFailed(msg) => msg,
                    other => other.to_string(),
                })?;
            Ok(json!({"success": true, "email": session.user_email}))
        }
        "logout" => {
            ctx.session().logout().map_err(|e| e.to_string())?;
            Ok(json!({"success": true}))
        }
        "refreshSession" => {
            let session = ctx.session().refresh().await.map_err(|e| e.to_string())?;
            Ok(json!({"success": true, "email": session.user_email}))
        }

        // ─── Bookmarks & local history ───
        "toggleBookmarks" => {
            let items: Vec<VisitEntry> = parse_data(action, data)?;
            let summary = toggle_stored_bookmarks(&mut ctx.storage, &items).map_err(|e| e.to_string())?;
            Ok(json!({
                "success": true,
                "addedCount": summary.added_count,
                "removedCount": summary.removed_count,
            }))
        }
        "deleteLocalHistory" => {
            let timestamps: Vec<String> = parse_data(action, data)?;
            let deletion = delete_local_entries(&mut ctx.storage, &timestamps).map_err(|e| e.to_string())?;
            Ok(json!({
                "success": true,
                "visitedRemoved": deletion.visited_removed,
                "bookmarksRemoved": deletion.bookmarks_removed,
            }))
        }
        "searchLocalHistory" => {
            let request: LocalSearchRequest = parse_optional(action, data)?;
            let results =
                search_stored(&ctx.storage, request.filter, &request.query).map_err(|e| e.to_string())?;
            Ok(json!({"success": true, "count": results.len(), "results": results}))
        }

        // ─── Server history ───
        "deleteHistoryFromServer" => {
            let keys: Vec<VisitKey> = parse_data(action, data)?;
            let token = require_token(ctx)?;
            let result = ctx.backend.delete(&token, &keys).await;
            match result {
                Ok(report) => Ok(json!({"success": true, "deletedCount": report.deleted})),
                Err(e) => Err(server_failure(ctx, action, e)),
            }
        }
        "listServerHistory" => {
            let request: ServerPageRequest = parse_optional(action, data)?;
            let token = require_token(ctx)?;
            let page = request.page.unwrap_or(1);
            let limit = request.limit.unwrap_or(DEFAULT_LIST_LIMIT);
            let result = ctx.backend.list(&token, page, limit).await;
            match result {
                Ok(history) => Ok(json!({"success": true, "history": history})),
                Err(e) => Err(server_failure(ctx, action, e)),
            }
        }
        "searchServerHistory" => {
            let request: ServerPageRequest = parse_data(action, data)?;
            let query = request
                .query
                .as_deref()
                .map(str::trim)
                .filter(|q| !q.is_empty())
                .ok_or("missing query")?;
            let token = require_token(ctx)?;
            let page = request.page.unwrap_or(1);
            let limit = request.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
            let result = ctx.backend.search(&token, query, page, limit).await;
            match result {
                Ok(history) => Ok(json!({"success": true, "history": history})),
                Err(e) => Err(server_failure(ctx, action, e)),
            }
        }

        // ─── Collection ───
        "navigationComplete" => {
            let event: NavigationEvent = parse_data(action, data)?;
            let outcome = ctx
                .collector()
                .handle_navigation(&event)
                .await
                .map_err(|e| e.to_string())?;
            Ok(json!({"success": true, "outcome": outcome}))
        }
        "setTrackingEnabled" => {
            let enabled = data.get("enabled").and_then(|v| v.as_bool()).ok_or("missing enabled")?;
            ctx.storage.set_tracking_enabled(enabled).map_err(|e| e.to_string())?;
            Ok(json!({"success": true, "trackingEnabled": enabled}))
        }
        "getState" => {
            let session = ctx.storage.session().map_err(|e| e.to_string())?;
            let tracking = ctx.storage.tracking_enabled().map_err(|e| e.to_string())?;
            let visited = ctx.storage.visited().map_err(|e| e.to_string())?;
            let bookmarks = ctx.storage.bookmarks().map_err(|e| e.to_string())?;
            Ok(json!({
                "loggedIn": session.is_some(),
                "userEmail": session.and_then(|s| s.user_email),
                "trackingEnabled": tracking,
                "visitedCount": visited.len(),
                "bookmarkCount": bookmarks.len(),
            }))
        }

        _ => Err(format!("unknown action: {}", action)),
    }
}
