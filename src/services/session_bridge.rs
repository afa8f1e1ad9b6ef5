//! Login state shared between the popup and the background collector.

use log::{info, warn};

use super::backend_client::HistoryBackend;
use super::history_collector::HistoryCollector;
use crate::store::{ExtensionStorage, LocalStore};
use crate::types::errors::{BackendError, SessionError};
use crate::types::session::{Credentials, Session};
use crate::types::settings::OfflinePolicy;

pub struct SessionBridge<'a, S: LocalStore, B: HistoryBackend> {
    storage: &'a mut ExtensionStorage<S>,
    backend: &'a B,
    policy: OfflinePolicy,
}

impl<'a, S: LocalStore, B: HistoryBackend> SessionBridge<'a, S, B> {
    pub fn new(storage: &'a mut ExtensionStorage<S>, backend: &'a B, policy: OfflinePolicy) -> Self {
        Self {
            storage,
            backend,
            policy,
        }
    }

    /// Logs in and stores the returned tokens. Under [`OfflinePolicy::Queue`]
    /// the pending visits are sent right after; a failed flush leaves them
    /// queued and does not fail the login.
    pub async fn login(&mut self, email: &str, password: &str) -> Result<Session, SessionError> {
        let credentials = Credentials {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        let pair = self
            .backend
            .login(&credentials)
            .await
            .map_err(|e| SessionError::LoginFailed(login_message(e)))?;

        let session = Session {
            access_token: pair.access_token,
            refresh_token: Some(pair.refresh_token),
            user_email: Some(pair.email),
        };
        self.storage.save_session(&session)?;
        info!(
            "[session] logged in as {}",
            session.user_email.as_deref().unwrap_or_default()
        );

        if self.policy == OfflinePolicy::Queue {
            let mut collector = HistoryCollector::new(&mut *self.storage, self.backend, self.policy);
            if let Err(e) = collector.flush_pending(&session.access_token).await {
                warn!("[session] queued visits kept for later: {}", e);
            }
        }
        Ok(session)
    }

    pub fn logout(&mut self) -> Result<(), SessionError> {
        self.storage.clear_session()?;
        info!("[session] logged out");
        Ok(())
    }

    /// Session teardown after the backend refused the stored token.
    pub fn force_logout(&mut self) -> Result<(), SessionError> {
        warn!("[session] session rejected by backend, clearing tokens");
        self.storage.clear_session()?;
        Ok(())
    }

    pub fn current_session(&self) -> Result<Option<Session>, SessionError> {
        Ok(self.storage.session()?)
    }

    /// Trades the stored refresh token for a new pair. A refused refresh
    /// token ends the session.
    pub async fn refresh(&mut self) -> Result<Session, SessionError> {
        let current = self.storage.session()?.ok_or(SessionError::NotLoggedIn)?;
        let refresh_token = current.refresh_token.ok_or(SessionError::NotLoggedIn)?;

        let pair = match self.backend.refresh(&refresh_token).await {
            Ok(pair) => pair,
            Err(e) => {
                if e.is_session_rejected() {
                    self.force_logout()?;
                }
                return Err(SessionError::Backend(e));
            }
        };
        let session = Session {
            access_token: pair.access_token,
            refresh_token: Some(pair.refresh_token),
            user_email: Some(pair.email),
        };
        self.storage.save_session(&session)?;
        Ok(session)
    }
}

/// The backend's own wording when it sent one, so the popup can show it as is.
fn login_message(err: BackendError) -> String {
    match err {
        BackendError::Rejected(msg) | BackendError::HttpStatus(_, msg) => msg,
        other => other.to_string(),
    }
}
