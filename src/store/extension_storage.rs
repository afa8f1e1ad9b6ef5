//! Typed access to the extension's storage keys.

use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::local_store::LocalStore;
use crate::types::errors::StoreError;
use crate::types::session::Session;
use crate::types::visit::VisitEntry;

pub const ACCESS_TOKEN_KEY: &str = "accessToken";
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";
pub const USER_EMAIL_KEY: &str = "userEmail";
pub const VISITED_URLS_KEY: &str = "visitedUrls";
pub const BOOKMARKED_URLS_KEY: &str = "bookmarkedUrls";
pub const TRACKING_ENABLED_KEY: &str = "trackingEnabled";
pub const PENDING_VISITS_KEY: &str = "pendingVisits";

/// Keys left behind by older builds that also signed in with Google.
const LEGACY_SESSION_KEYS: [&str; 2] = ["googleAccessToken", "googleRefreshToken"];

/// Wraps a [`LocalStore`] with the extension's key layout.
pub struct ExtensionStorage<S: LocalStore> {
    store: S,
}

impl<S: LocalStore> ExtensionStorage<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    /// Seeds first-run defaults without touching keys that already exist.
    pub fn initialize_defaults(&mut self) -> Result<(), StoreError> {
        if self.store.get(TRACKING_ENABLED_KEY)?.is_none() {
            self.store.set(TRACKING_ENABLED_KEY, Value::Bool(true))?;
            debug!("[storage] trackingEnabled initialised to true");
        }
        for key in [BOOKMARKED_URLS_KEY, VISITED_URLS_KEY] {
            if self.store.get(key)?.is_none() {
                self.store.set(key, Value::Array(Vec::new()))?;
            }
        }
        Ok(())
    }

    fn get_string(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self.store.get(key)? {
            Some(Value::String(s)) if !s.is_empty() => Ok(Some(s)),
            _ => Ok(None),
        }
    }

    /// Reads a list key; a non-array value reads as empty and bad elements are skipped.
    fn get_list<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>, StoreError> {
        let items = match self.store.get(key)? {
            Some(Value::Array(items)) => items,
            Some(_) => {
                warn!("[storage] {} is not a list, treating as empty", key);
                return Ok(Vec::new());
            }
            None => return Ok(Vec::new()),
        };
        Ok(items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect())
    }

    fn set_list<T: Serialize>(&mut self, key: &str, items: &[T]) -> Result<(), StoreError> {
        let value = serde_json::to_value(items)
            .map_err(|e| StoreError::SerializationError(e.to_string()))?;
        self.store.set(key, value)
    }

    // ─── Session ───

    pub fn access_token(&self) -> Result<Option<String>, StoreError> {
        self.get_string(ACCESS_TOKEN_KEY)
    }

    /// The stored session, present only when an access token exists.
    pub fn session(&self) -> Result<Option<Session>, StoreError> {
        let Some(access_token) = self.access_token()? else {
            return Ok(None);
        };
        Ok(Some(Session {
            access_token,
            refresh_token: self.get_string(REFRESH_TOKEN_KEY)?,
            user_email: self.get_string(USER_EMAIL_KEY)?,
        }))
    }

    pub fn save_session(&mut self, session: &Session) -> Result<(), StoreError> {
        self.store
            .set(ACCESS_TOKEN_KEY, Value::String(session.access_token.clone()))?;
        match &session.refresh_token {
            Some(token) => self.store.set(REFRESH_TOKEN_KEY, Value::String(token.clone()))?,
            None => self.store.remove(&[REFRESH_TOKEN_KEY])?,
        }
        match &session.user_email {
            Some(email) => self.store.set(USER_EMAIL_KEY, Value::String(email.clone()))?,
            None => self.store.remove(&[USER_EMAIL_KEY])?,
        }
        Ok(())
    }

    pub fn clear_session(&mut self) -> Result<(), StoreError> {
        let mut keys = vec![ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_EMAIL_KEY];
        keys.extend(LEGACY_SESSION_KEYS);
        self.store.remove(&keys)
    }

    // ─── Settings ───

    /// Tracking defaults to on when the flag was never written.
    pub fn tracking_enabled(&self) -> Result<bool, StoreError> {
        match self.store.get(TRACKING_ENABLED_KEY)? {
            Some(Value::Bool(enabled)) => Ok(enabled),
            Some(other) => Err(StoreError::InvalidValue(format!(
                "{} must be a boolean, found {}",
                TRACKING_ENABLED_KEY, other
            ))),
            None => Ok(true),
        }
    }

    pub fn set_tracking_enabled(&mut self, enabled: bool) -> Result<(), StoreError> {
        self.store.set(TRACKING_ENABLED_KEY, Value::Bool(enabled))
    }

    // ─── Lists ───

    pub fn visited(&self) -> Result<Vec<VisitEntry>, StoreError> {
        self.get_list(VISITED_URLS_KEY)
    }

    pub fn set_visited(&mut self, entries: &[VisitEntry]) -> Result<(), StoreError> {
        self.set_list(VISITED_URLS_KEY, entries)
    }

    pub fn bookmarks(&self) -> Result<Vec<VisitEntry>, StoreError> {
        self.get_list(BOOKMARKED_URLS_KEY)
    }

    pub fn set_bookmarks(&mut self, entries: &[VisitEntry]) -> Result<(), StoreError> {
        self.set_list(BOOKMARKED_URLS_KEY, entries)
    }

    pub fn pending(&self) -> Result<Vec<VisitEntry>, StoreError> {
        self.get_list(PENDING_VISITS_KEY)
    }

    pub fn set_pending(&mut self, entries: &[VisitEntry]) -> Result<(), StoreError> {
        if entries.is_empty() {
            self.store.remove(&[PENDING_VISITS_KEY])
        } else {
            self.set_list(PENDING_VISITS_KEY, entries)
        }
    }
}
