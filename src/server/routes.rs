//! REST routes of the Memordo backend, mounted under `/memo/api`.

use std::sync::{Arc, Mutex, MutexGuard};

use axum::extract::{Query, State};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use log::info;
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};

use super::api_error::ApiError;
use super::auth::AuthUser;
use super::auth_service::{
    validate_registration, AuthService, AuthServiceTrait, PasswordDigest, TokenPolicy,
};
use super::history_service::{
    parse_page, HistoryService, HistoryServiceTrait, DEFAULT_LIST_LIMIT, DEFAULT_SEARCH_LIMIT,
};
use crate::database::Database;
use crate::types::errors::AuthError;
use crate::types::history::{CollectReport, DeleteReport, HistoryPage, HistoryStats};
use crate::types::session::{Credentials, RefreshRequest, TokenPair};

/// Shared state of every handler.
///
/// The connection sits behind a blocking mutex; handlers take it only around
/// synchronous queries and never across an `.await`.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Database>>,
    pub tokens: TokenPolicy,
}

impl AppState {
    pub fn new(db: Database, tokens: TokenPolicy) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            tokens,
        }
    }

    pub fn lock_db(&self) -> Result<MutexGuard<'_, Database>, ApiError> {
        self.db
            .lock()
            .map_err(|e| ApiError::Internal(format!("database lock poisoned: {}", e)))
    }
}

/// Raw pagination/search query; validated by `parse_page`.
#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub q: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// Builds the full application router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION]);

    let api = Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/history/collect", post(collect))
        .route("/history/list", get(list))
        .route("/history/search", get(search))
        .route("/history/delete", post(delete))
        .route("/history/stats", get(stats));

    Router::new()
        .route("/", get(health))
        .nest("/memo/api", api)
        .layer(cors)
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "message": "Memordo server is running." }))
}

/// Runs password hashing on the blocking pool.
async fn off_reactor<T, F>(task: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, AuthError> + Send + 'static,
{
    let result = tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| ApiError::Internal(format!("password task failed: {}", e)))?;
    Ok(result?)
}

async fn register(
    State(state): State<AppState>,
    Json(creds): Json<Credentials>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let email = validate_registration(&creds.email, &creds.password)?;
    {
        let db = state.lock_db()?;
        AuthService::new(db.connection(), state.tokens).ensure_email_free(&email)?;
    }

    let password = creds.password;
    let digest = off_reactor(move || PasswordDigest::derive(&password)).await?;

    let db = state.lock_db()?;
    let user_id = AuthService::new(db.connection(), state.tokens).insert_user(&email, &digest)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Registered", "userId": user_id })),
    ))
}

async fn login(
    State(state): State<AppState>,
    Json(creds): Json<Credentials>,
) -> Result<Json<TokenPair>, ApiError> {
    let account = {
        let db = state.lock_db()?;
        AuthService::new(db.connection(), state.tokens).account(&creds.email)?
    };

    let password = creds.password;
    let digest = account.password;
    off_reactor(move || digest.verify(&password)).await?;

    let db = state.lock_db()?;
    let pair = AuthService::new(db.connection(), state.tokens).issue_pair(account.id, account.email)?;
    info!("[api] user {} logged in", account.id);
    Ok(Json(pair))
}

async fn refresh(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> Result<Json<TokenPair>, ApiError> {
    let db = state.lock_db()?;
    let pair = AuthService::new(db.connection(), state.tokens).refresh(&body.refresh_token)?;
    Ok(Json(pair))
}

async fn collect(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<CollectReport>), ApiError> {
    let entries = body
        .as_array()
        .ok_or_else(|| ApiError::BadRequest("Request body must be a JSON array".to_string()))?;

    let db = state.lock_db()?;
    let report = HistoryService::new(db.connection()).collect(user_id, entries)?;
    info!(
        "[api] collect user={} inserted={} skipped={} errors={}",
        user_id, report.inserted, report.skipped, report.errors
    );
    let status = StatusCode::from_u16(report.status.http_status())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    Ok((status, Json(report)))
}

async fn list(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryPage>, ApiError> {
    let page = parse_page(query.page.as_deref(), query.limit.as_deref(), DEFAULT_LIST_LIMIT)?;
    let db = state.lock_db()?;
    Ok(Json(HistoryService::new(db.connection()).list(user_id, page)?))
}

async fn search(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryPage>, ApiError> {
    let q = query.q.as_deref().map(str::trim).unwrap_or_default();
    if q.is_empty() {
        return Err(ApiError::BadRequest("Search query (q) is required".to_string()));
    }
    let page = parse_page(query.page.as_deref(), query.limit.as_deref(), DEFAULT_SEARCH_LIMIT)?;
    let db = state.lock_db()?;
    Ok(Json(HistoryService::new(db.connection()).search(user_id, q, page)?))
}

async fn delete(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<Value>,
) -> Result<Json<DeleteReport>, ApiError> {
    let keys = body
        .as_array()
        .ok_or_else(|| ApiError::BadRequest("Request body must be a JSON array".to_string()))?;
    let db = state.lock_db()?;
    Ok(Json(HistoryService::new(db.connection()).delete(user_id, keys)?))
}

async fn stats(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<HistoryStats>, ApiError> {
    let db = state.lock_db()?;
    Ok(Json(HistoryService::new(db.connection()).stats(user_id)?))
}
