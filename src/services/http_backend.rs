//! reqwest client for the Memordo REST API.

use std::time::Duration;

use log::{debug, warn};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::backend_client::{HistoryBackend, API_PREFIX};
use crate::types::errors::BackendError;
use crate::types::history::{CollectReport, DeleteReport, HistoryPage};
use crate::types::session::{Credentials, RefreshRequest, TokenPair};
use crate::types::visit::{VisitEntry, VisitKey};

/// Longest slice of a non-JSON error body carried into an error message.
const ERROR_BODY_PREVIEW: usize = 100;

/// reqwest-backed [`HistoryBackend`].
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::NetworkError(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, API_PREFIX, path)
    }

    async fn post_json<B, T>(&self, path: &str, token: Option<&str>, body: &B) -> Result<T, BackendError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut request = self.client.post(self.endpoint(path)).json(body);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await.map_err(network_error)?;
        decode(path, response).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        token: &str,
        query: &[(&str, String)],
    ) -> Result<T, BackendError> {
        let response = self
            .client
            .get(self.endpoint(path))
            .bearer_auth(token)
            .query(query)
            .send()
            .await
            .map_err(network_error)?;
        decode(path, response).await
    }
}

fn network_error(e: reqwest::Error) -> BackendError {
    warn!("[backend] request failed: {}", e);
    BackendError::NetworkError(e.to_string())
}

/// Maps a response onto the typed result. 403 means the session was refused;
/// 207 carries a collect report like any success.
async fn decode<T: DeserializeOwned>(path: &str, response: Response) -> Result<T, BackendError> {
    let status = response.status();
    let text = response.text().await.map_err(network_error)?;
    debug!("[backend] {} -> {}", path, status);

    if status.is_success() || status == StatusCode::MULTI_STATUS {
        return serde_json::from_str(&text).map_err(|e| BackendError::DecodeError(e.to_string()));
    }

    let message = error_message(&text);
    if status == StatusCode::FORBIDDEN {
        return Err(BackendError::Rejected(message));
    }
    Err(BackendError::HttpStatus(status.as_u16(), message))
}

/// Pulls `message` or `error` out of a JSON error body, falling back to the
/// start of the raw text.
fn error_message(text: &str) -> String {
    if let Ok(Value::Object(body)) = serde_json::from_str::<Value>(text) {
        for field in ["message", "error"] {
            if let Some(Value::String(msg)) = body.get(field) {
                return msg.clone();
            }
        }
    }
    text.chars().take(ERROR_BODY_PREVIEW).collect()
}

impl HistoryBackend for HttpBackend {
    async fn login(&self, credentials: &Credentials) -> Result<TokenPair, BackendError> {
        self.post_json("/login", None, credentials).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, BackendError> {
        let body = RefreshRequest {
            refresh_token: refresh_token.to_string(),
        };
        self.post_json("/refresh", None, &body).await
    }

    async fn collect(&self, token: &str, entries: &[VisitEntry]) -> Result<CollectReport, BackendError> {
        self.post_json("/history/collect", Some(token), entries).await
    }

    async fn delete(&self, token: &str, keys: &[VisitKey]) -> Result<DeleteReport, BackendError> {
        self.post_json("/history/delete", Some(token), keys).await
    }

    async fn list(&self, token: &str, page: u32, limit: u32) -> Result<HistoryPage, BackendError> {
        let query = [("page", page.to_string()), ("limit", limit.to_string())];
        self.get_json("/history/list", token, &query).await
    }

    async fn search(
        &self,
        token: &str,
        query: &str,
        page: u32,
        limit: u32,
    ) -> Result<HistoryPage, BackendError> {
        let params = [
            ("q", query.to_string()),
            ("page", page.to_string()),
            ("limit", limit.to_string()),
        ];
        self.get_json("/history/search", token, &params).await
    }
}
