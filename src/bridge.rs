//! Memordo extension bridge: the extension's message API over stdin/stdout.
//!
//! Protocol: one JSON object per line (newline-delimited JSON).
//! Request:  {"id":1, "action":"login", "data":{"email":"...","password":"..."}}
//! Response: {"id":1, "response":{...}}; failures answer {"success":false,"message":"..."}.
//! Logs go to stderr.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use log::{error, info, warn};
use serde_json::{json, Value};

use memordo::config::{ClientConfig, CLIENT_CONFIG_ENV};
use memordo::message_router::{handle_message, ExtensionContext};
use memordo::services::http_backend::HttpBackend;
use memordo::store::{ExtensionStorage, JsonFileStore};

/// Fixed-window limit on messages per second.
struct RateLimiter {
    window_start: Instant,
    request_count: u32,
    max_per_second: u32,
}

impl RateLimiter {
    fn new(max_per_second: u32) -> Self {
        Self {
            window_start: Instant::now(),
            request_count: 0,
            max_per_second,
        }
    }

    /// Returns true if the message is allowed, false if rate-limited.
    fn check(&mut self) -> bool {
        if self.window_start.elapsed().as_secs() >= 1 {
            self.window_start = Instant::now();
            self.request_count = 0;
        }
        self.request_count += 1;
        self.request_count <= self.max_per_second
    }
}

fn emit(value: &Value) -> io::Result<()> {
    let mut out = io::stdout().lock();
    writeln!(out, "{}", value)?;
    out.flush()
}

fn failure(id: Value, message: impl Into<String>) -> Value {
    json!({"id": id, "response": {"success": false, "message": message.into()}})
}

fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    if let Err(e) = run() {
        error!("memordo-bridge failed: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::var(CLIENT_CONFIG_ENV).ok().map(PathBuf::from);
    let config = ClientConfig::load(config_path.as_deref())?;

    let store_path = config
        .store_path
        .clone()
        .unwrap_or_else(|| PathBuf::from("extension_storage.json"));
    let mut storage = ExtensionStorage::new(JsonFileStore::open(&store_path)?);
    storage.initialize_defaults()?;
    info!("Extension storage at {}", store_path.display());

    let backend = HttpBackend::new(
        &config.backend_url,
        Duration::from_secs(config.request_timeout_secs),
    )?;
    info!(
        "Backend {} (offline policy: {})",
        backend.base_url(),
        config.offline_policy
    );
    let mut ctx = ExtensionContext::new(storage, backend, config.offline_policy);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    emit(&json!({"event": "ready", "version": env!("CARGO_PKG_VERSION")}))?;

    let mut rate_limiter = RateLimiter::new(200);

    for line in io::stdin().lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                emit(&failure(Value::Null, format!("parse error: {}", e)))?;
                continue;
            }
        };

        let id = req.get("id").cloned().unwrap_or(Value::Null);

        if !rate_limiter.check() {
            warn!("rate limit exceeded, dropping message {}", id);
            emit(&failure(id, "rate limit exceeded"))?;
            continue;
        }

        let action = req.get("action").and_then(|v| v.as_str()).unwrap_or("");
        let data = req.get("data").cloned().unwrap_or(json!({}));

        let response = match runtime.block_on(handle_message(&mut ctx, action, &data)) {
            Ok(val) => json!({"id": id, "response": val}),
            Err(err) => failure(id, err),
        };
        emit(&response)?;
    }
    Ok(())
}
