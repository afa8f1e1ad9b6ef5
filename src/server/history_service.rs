//! Per-user visit history for the Memordo backend.
//!
//! Implements `HistoryServiceTrait`: batch collection, paginated listing and
//! search, deletion by (url, timestamp) and aggregate stats, backed by SQLite
//! via `rusqlite`. Every operation is scoped to one user id.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use log::{debug, error, warn};
use rusqlite::{params, Connection};
use serde_json::Value;

use crate::types::errors::HistoryError;
use crate::types::history::{
    CollectReport, DayCount, DeleteReport, DomainCount, HistoryPage, HistoryRow, HistoryStats, PageRequest,
};
use crate::types::visit::canonical_timestamp;

/// Default page size of `GET /history/list`.
pub const DEFAULT_LIST_LIMIT: u32 = 100;

/// Default page size of `GET /history/search`.
pub const DEFAULT_SEARCH_LIMIT: u32 = 50;

const TOP_DOMAIN_COUNT: usize = 10;

/// Trait defining server-side history operations.
pub trait HistoryServiceTrait {
    fn collect(&mut self, user_id: i64, entries: &[Value]) -> Result<CollectReport, HistoryError>;
    fn list(&self, user_id: i64, page: PageRequest) -> Result<HistoryPage, HistoryError>;
    fn search(&self, user_id: i64, query: &str, page: PageRequest) -> Result<HistoryPage, HistoryError>;
    fn delete(&mut self, user_id: i64, keys: &[Value]) -> Result<DeleteReport, HistoryError>;
    fn stats(&self, user_id: i64) -> Result<HistoryStats, HistoryError>;
}

/// History service backed by a SQLite connection.
pub struct HistoryService<'a> {
    conn: &'a Connection,
}

/// Validates raw `page`/`limit` query values.
///
/// Missing values fall back to `1` and `default_limit`; anything that is not an
/// integer ≥ 1 is rejected.
pub fn parse_page(
    page: Option<&str>,
    limit: Option<&str>,
    default_limit: u32,
) -> Result<PageRequest, HistoryError> {
    let page = parse_positive(page, 1);
    let limit = parse_positive(limit, default_limit);
    match (page, limit) {
        (Some(page), Some(limit)) => Ok(PageRequest { page, limit }),
        _ => Err(HistoryError::InvalidInput(
            "page and limit must be integers of at least 1".to_string(),
        )),
    }
}

fn parse_positive(raw: Option<&str>, default: u32) -> Option<u32> {
    match raw {
        None => Some(default),
        Some(s) => s.trim().parse::<u32>().ok().filter(|n| *n >= 1),
    }
}

/// Escapes LIKE wildcards so the query text matches literally.
fn like_pattern(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    escaped.push('%');
    for ch in query.to_lowercase().chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

impl<'a> HistoryService<'a> {
    /// Creates a new `HistoryService` using the provided database connection.
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Pulls `(url, title, timestamp)` out of a raw collect entry, or `None`
    /// when the entry is not an object or lacks a url or timestamp.
    fn entry_fields(entry: &Value) -> Option<(&str, Option<&str>, &str)> {
        let obj = entry.as_object()?;
        let url = obj.get("url")?.as_str().filter(|s| !s.is_empty())?;
        let timestamp = obj.get("timestamp")?.as_str().filter(|s| !s.is_empty())?;
        let title = obj
            .get("title")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty());
        Some((url, title, timestamp))
    }

    fn row_to_history(row: &rusqlite::Row) -> rusqlite::Result<HistoryRow> {
        Ok(HistoryRow {
            url: row.get(0)?,
            title: row.get(1)?,
            timestamp: row.get(2)?,
        })
    }

    fn page_of(results: Vec<HistoryRow>, page: PageRequest, total: u64) -> HistoryPage {
        let limit = page.limit as u64;
        HistoryPage {
            results,
            page: page.page,
            limit: page.limit,
            total_results: total,
            total_pages: total.div_ceil(limit),
        }
    }
}

impl<'a> HistoryServiceTrait for HistoryService<'a> {
    /// Inserts a batch inside one transaction.
    ///
    /// Malformed entries and ignored duplicates count as skipped; unparseable
    /// timestamps and failed inserts count as errors without aborting the batch.
    fn collect(&mut self, user_id: i64, entries: &[Value]) -> Result<CollectReport, HistoryError> {
        if entries.is_empty() {
            return Ok(CollectReport::empty());
        }

        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| HistoryError::TransactionError(e.to_string()))?;

        let mut inserted = 0u64;
        let mut skipped = 0u64;
        let mut errors = 0u64;
        {
            let mut stmt = tx
                .prepare(
                    "INSERT OR IGNORE INTO visit_history (user_id, url, title, timestamp) \
                     VALUES (?1, ?2, ?3, ?4)",
                )
                .map_err(|e| HistoryError::DatabaseError(e.to_string()))?;

            for entry in entries {
                let Some((url, title, raw_timestamp)) = Self::entry_fields(entry) else {
                    skipped += 1;
                    continue;
                };
                let timestamp = match canonical_timestamp(raw_timestamp) {
                    Ok(ts) => ts,
                    Err(e) => {
                        warn!("[history] rejected entry for user {}: {}", user_id, e);
                        errors += 1;
                        continue;
                    }
                };
                match stmt.execute(params![user_id, url, title, timestamp]) {
                    Ok(0) => skipped += 1,
                    Ok(_) => inserted += 1,
                    Err(e) => {
                        error!("[history] insert failed for {}: {}", url, e);
                        errors += 1;
                    }
                }
            }
        }

        tx.commit()
            .map_err(|e| HistoryError::TransactionError(e.to_string()))?;

        debug!(
            "[history] user {} collect: inserted={} skipped={} errors={}",
            user_id, inserted, skipped, errors
        );
        Ok(CollectReport::from_counts(inserted, skipped, errors))
    }

    /// Lists a user's visits, newest first.
    fn list(&self, user_id: i64, page: PageRequest) -> Result<HistoryPage, HistoryError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT url, title, timestamp FROM visit_history \
                 WHERE user_id = ?1 \
                 ORDER BY timestamp DESC, id DESC LIMIT ?2 OFFSET ?3",
            )
            .map_err(|e| HistoryError::DatabaseError(e.to_string()))?;

        let rows = stmt
            .query_map(
                params![user_id, page.limit as i64, page.offset()],
                Self::row_to_history,
            )
            .map_err(|e| HistoryError::DatabaseError(e.to_string()))?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row.map_err(|e| HistoryError::DatabaseError(e.to_string()))?);
        }

        let total: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM visit_history WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .map_err(|e| HistoryError::DatabaseError(e.to_string()))?;

        Ok(Self::page_of(results, page, total as u64))
    }

    /// Case-insensitive substring search over title and URL.
    fn search(&self, user_id: i64, query: &str, page: PageRequest) -> Result<HistoryPage, HistoryError> {
        if query.is_empty() {
            return Err(HistoryError::InvalidInput("search query (q) is required".to_string()));
        }
        let pattern = like_pattern(query);

        let mut stmt = self
            .conn
            .prepare(
                "SELECT url, title, timestamp FROM visit_history \
                 WHERE user_id = ?1 \
                   AND (LOWER(title) LIKE ?2 ESCAPE '\\' OR LOWER(url) LIKE ?2 ESCAPE '\\') \
                 ORDER BY timestamp DESC, id DESC LIMIT ?3 OFFSET ?4",
            )
            .map_err(|e| HistoryError::DatabaseError(e.to_string()))?;

        let rows = stmt
            .query_map(
                params![user_id, pattern, page.limit as i64, page.offset()],
                Self::row_to_history,
            )
            .map_err(|e| HistoryError::DatabaseError(e.to_string()))?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row.map_err(|e| HistoryError::DatabaseError(e.to_string()))?);
        }

        let total: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM visit_history \
                 WHERE user_id = ?1 \
                   AND (LOWER(title) LIKE ?2 ESCAPE '\\' OR LOWER(url) LIKE ?2 ESCAPE '\\')",
                params![user_id, pattern],
                |row| row.get(0),
            )
            .map_err(|e| HistoryError::DatabaseError(e.to_string()))?;

        Ok(Self::page_of(results, page, total as u64))
    }

    /// Deletes rows matching the supplied (url, timestamp) pairs.
    fn delete(&mut self, user_id: i64, keys: &[Value]) -> Result<DeleteReport, HistoryError> {
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| HistoryError::TransactionError(e.to_string()))?;

        let mut deleted = 0u64;
        {
            let mut stmt = tx
                .prepare(
                    "DELETE FROM visit_history WHERE user_id = ?1 AND url = ?2 AND timestamp = ?3",
                )
                .map_err(|e| HistoryError::DatabaseError(e.to_string()))?;

            for key in keys {
                let Some((url, _, raw_timestamp)) = Self::entry_fields(key) else {
                    continue;
                };
                let Ok(timestamp) = canonical_timestamp(raw_timestamp) else {
                    continue;
                };
                let affected = stmt
                    .execute(params![user_id, url, timestamp])
                    .map_err(|e| HistoryError::DatabaseError(e.to_string()))?;
                deleted += affected as u64;
            }
        }

        tx.commit()
            .map_err(|e| HistoryError::TransactionError(e.to_string()))?;

        Ok(DeleteReport {
            message: format!("Deleted {} entries.", deleted),
            deleted,
        })
    }

    /// Aggregates domains, hours and weekdays over every visit of the user.
    fn stats(&self, user_id: i64) -> Result<HistoryStats, HistoryError> {
        let mut stmt = self
            .conn
            .prepare("SELECT url, timestamp FROM visit_history WHERE user_id = ?1")
            .map_err(|e| HistoryError::DatabaseError(e.to_string()))?;

        let rows = stmt
            .query_map(params![user_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(|e| HistoryError::DatabaseError(e.to_string()))?;

        let weekdays = [
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
            Weekday::Sun,
        ];
        let mut stats = HistoryStats {
            visits_by_hour: vec![0; 24],
            visits_by_day: weekdays
                .iter()
                .map(|d| DayCount {
                    day: d.to_string(),
                    visits: 0,
                })
                .collect(),
            ..HistoryStats::default()
        };
        let mut domains: HashMap<String, u64> = HashMap::new();

        for row in rows {
            let (url, timestamp) = row.map_err(|e| HistoryError::DatabaseError(e.to_string()))?;
            stats.total_visits += 1;

            // Unparseable rows still count toward the total.
            if let Some(host) = url::Url::parse(&url).ok().and_then(|u| u.host_str().map(str::to_lowercase)) {
                *domains.entry(host).or_insert(0) += 1;
            }
            if let Ok(at) = DateTime::parse_from_rfc3339(&timestamp) {
                let at = at.with_timezone(&Utc);
                stats.visits_by_hour[at.hour() as usize] += 1;
                stats.visits_by_day[at.weekday().num_days_from_monday() as usize].visits += 1;
            }
        }

        let mut ranked: Vec<DomainCount> = domains
            .into_iter()
            .map(|(domain, visits)| DomainCount { domain, visits })
            .collect();
        ranked.sort_by(|a, b| b.visits.cmp(&a.visits).then_with(|| a.domain.cmp(&b.domain)));
        ranked.truncate(TOP_DOMAIN_COUNT);
        stats.top_domains = ranked;

        Ok(stats)
    }
}
