//! Unit tests for the backend history service.
//!
//! These exercise collection, listing, search, deletion and stats through the
//! `HistoryServiceTrait` interface, using an in-memory SQLite database.

use memordo::database::Database;
use memordo::server::history_service::{parse_page, HistoryService, HistoryServiceTrait};
use memordo::types::errors::HistoryError;
use memordo::types::history::{CollectStatus, PageRequest};
use rusqlite::params;
use serde_json::{json, Value};

/// Helper: fresh in-memory database with two users.
fn setup() -> (Database, i64, i64) {
    let db = Database::open_in_memory().expect("Failed to open in-memory database");
    let mut ids = Vec::new();
    for email in ["alice@memo.io", "bob@memo.io"] {
        db.connection()
            .execute(
                "INSERT INTO users (email, password_hash, salt, created_at) VALUES (?1, 'h', 's', 0)",
                params![email],
            )
            .unwrap();
        ids.push(db.connection().last_insert_rowid());
    }
    (db, ids[0], ids[1])
}

fn visit(url: &str, title: &str, ts: &str) -> Value {
    json!({"url": url, "title": title, "timestamp": ts})
}

fn page(page: u32, limit: u32) -> PageRequest {
    PageRequest { page, limit }
}

#[test]
fn collect_empty_batch_is_ok() {
    let (db, alice, _) = setup();
    let mut svc = HistoryService::new(db.connection());
    let report = svc.collect(alice, &[]).unwrap();
    assert_eq!(report.status, CollectStatus::Ok);
    assert_eq!(report.message, "No data to process");
}

#[test]
fn collect_counts_inserted_skipped_and_errors() {
    let (db, alice, _) = setup();
    let mut svc = HistoryService::new(db.connection());

    let batch = vec![
        visit("https://a.io", "A", "2024-05-01T10:00:00.000Z"),
        json!({"title": "no url", "timestamp": "2024-05-01T10:00:00.000Z"}),
        json!("not an object"),
        visit("https://b.io", "B", "last tuesday"),
        visit("https://a.io", "A again", "2024-05-01T10:00:00.000Z"),
    ];
    let report = svc.collect(alice, &batch).unwrap();

    assert_eq!((report.inserted, report.skipped, report.errors), (1, 3, 1));
    assert_eq!(report.status, CollectStatus::PartialError);
    assert_eq!(report.status.http_status(), 207);
}

#[test]
fn collect_with_only_errors_reports_error() {
    let (db, alice, _) = setup();
    let mut svc = HistoryService::new(db.connection());
    let report = svc.collect(alice, &[visit("https://a.io", "A", "??")]).unwrap();
    assert_eq!(report.status, CollectStatus::Error);
    assert_eq!(report.status.http_status(), 500);
}

#[test]
fn collect_stores_canonical_utc_timestamps() {
    let (db, alice, _) = setup();
    let mut svc = HistoryService::new(db.connection());
    svc.collect(alice, &[visit("https://a.io", "A", "2024-05-01T09:30:00+09:00")])
        .unwrap();

    let listed = svc.list(alice, page(1, 10)).unwrap();
    assert_eq!(listed.results[0].timestamp, "2024-05-01T00:30:00.000Z");

    // The same instant in another offset is a duplicate.
    let again = svc
        .collect(alice, &[visit("https://a.io", "A", "2024-05-01T00:30:00Z")])
        .unwrap();
    assert_eq!((again.inserted, again.skipped), (0, 1));
}

#[test]
fn list_is_newest_first_and_paginated() {
    let (db, alice, _) = setup();
    let mut svc = HistoryService::new(db.connection());
    let batch: Vec<Value> = (1..=5)
        .map(|i| visit(&format!("https://site{}.io", i), "S", &format!("2024-05-0{}T00:00:00.000Z", i)))
        .collect();
    svc.collect(alice, &batch).unwrap();

    let first = svc.list(alice, page(1, 2)).unwrap();
    assert_eq!(first.total_results, 5);
    assert_eq!(first.total_pages, 3);
    assert_eq!(first.results[0].url, "https://site5.io");
    assert_eq!(first.results[1].url, "https://site4.io");

    let last = svc.list(alice, page(3, 2)).unwrap();
    assert_eq!(last.results.len(), 1);
    assert_eq!(last.results[0].url, "https://site1.io");
}

#[test]
fn list_is_scoped_to_user() {
    let (db, alice, bob) = setup();
    let mut svc = HistoryService::new(db.connection());
    svc.collect(alice, &[visit("https://a.io", "A", "2024-05-01T00:00:00Z")]).unwrap();

    assert_eq!(svc.list(bob, page(1, 10)).unwrap().total_results, 0);
    assert_eq!(svc.list(alice, page(1, 10)).unwrap().total_results, 1);
}

#[test]
fn empty_title_is_stored_as_null() {
    let (db, alice, _) = setup();
    let mut svc = HistoryService::new(db.connection());
    svc.collect(alice, &[visit("https://a.io", "", "2024-05-01T00:00:00Z")]).unwrap();
    assert_eq!(svc.list(alice, page(1, 10)).unwrap().results[0].title, None);
}

#[test]
fn search_is_case_insensitive_over_title_and_url() {
    let (db, alice, _) = setup();
    let mut svc = HistoryService::new(db.connection());
    svc.collect(
        alice,
        &[
            visit("https://docs.rs/tokio", "Tokio docs", "2024-05-01T00:00:00Z"),
            visit("https://example.com/RUST", "Example", "2024-05-02T00:00:00Z"),
            visit("https://other.io", "Nothing", "2024-05-03T00:00:00Z"),
        ],
    )
    .unwrap();

    assert_eq!(svc.search(alice, "TOKIO", page(1, 50)).unwrap().total_results, 1);
    let rust = svc.search(alice, "rust", page(1, 50)).unwrap();
    assert_eq!(rust.results.len(), 1);
    assert_eq!(rust.results[0].url, "https://example.com/RUST");
}

#[test]
fn search_matches_like_wildcards_literally() {
    let (db, alice, _) = setup();
    let mut svc = HistoryService::new(db.connection());
    svc.collect(
        alice,
        &[
            visit("https://shop.io/a", "100% cotton", "2024-05-01T00:00:00Z"),
            visit("https://shop.io/b", "1000 items", "2024-05-02T00:00:00Z"),
        ],
    )
    .unwrap();

    let hits = svc.search(alice, "0%", page(1, 50)).unwrap();
    assert_eq!(hits.total_results, 1);
    assert_eq!(hits.results[0].title.as_deref(), Some("100% cotton"));
}

#[test]
fn search_requires_query() {
    let (db, alice, _) = setup();
    let svc = HistoryService::new(db.connection());
    assert!(matches!(
        svc.search(alice, "", page(1, 50)),
        Err(HistoryError::InvalidInput(_))
    ));
}

#[test]
fn delete_removes_matching_pairs_only_for_user() {
    let (db, alice, bob) = setup();
    let mut svc = HistoryService::new(db.connection());
    let ts = "2024-05-01T00:00:00.000Z";
    svc.collect(alice, &[visit("https://a.io", "A", ts), visit("https://b.io", "B", ts)])
        .unwrap();
    svc.collect(bob, &[visit("https://a.io", "A", ts)]).unwrap();

    let report = svc
        .delete(
            alice,
            &[
                json!({"url": "https://a.io", "timestamp": "2024-05-01T02:00:00+02:00"}),
                json!({"url": "https://missing.io", "timestamp": ts}),
                json!({"timestamp": ts}),
            ],
        )
        .unwrap();

    assert_eq!(report.deleted, 1);
    assert_eq!(svc.list(alice, page(1, 10)).unwrap().total_results, 1);
    assert_eq!(svc.list(bob, page(1, 10)).unwrap().total_results, 1);
}

#[test]
fn stats_aggregate_domains_hours_and_days() {
    let (db, alice, _) = setup();
    let mut svc = HistoryService::new(db.connection());
    svc.collect(
        alice,
        &[
            // 2024-05-01 is a Wednesday.
            visit("https://docs.rs/a", "a", "2024-05-01T08:00:00Z"),
            visit("https://docs.rs/b", "b", "2024-05-01T08:30:00Z"),
            visit("https://news.io/", "n", "2024-05-04T23:00:00Z"),
        ],
    )
    .unwrap();

    let stats = svc.stats(alice).unwrap();
    assert_eq!(stats.total_visits, 3);
    assert_eq!(stats.top_domains[0].domain, "docs.rs");
    assert_eq!(stats.top_domains[0].visits, 2);
    assert_eq!(stats.visits_by_hour.len(), 24);
    assert_eq!(stats.visits_by_hour[8], 2);
    assert_eq!(stats.visits_by_hour[23], 1);
    let days: Vec<(&str, u64)> = stats
        .visits_by_day
        .iter()
        .map(|d| (d.day.as_str(), d.visits))
        .collect();
    assert_eq!(
        days,
        vec![("Mon", 0), ("Tue", 0), ("Wed", 2), ("Thu", 0), ("Fri", 0), ("Sat", 1), ("Sun", 0)]
    );
}

#[test]
fn stats_serialize_weekdays_monday_first() {
    let (db, alice, _) = setup();
    let svc = HistoryService::new(db.connection());
    let json = serde_json::to_value(svc.stats(alice).unwrap()).unwrap();
    assert_eq!(json["visits_by_day"][0], json!({"day": "Mon", "visits": 0}));
    assert_eq!(json["visits_by_day"][6]["day"], "Sun");
}

#[test]
fn parse_page_validates_values() {
    assert_eq!(
        parse_page(Some("2"), Some("25"), 100).unwrap(),
        PageRequest { page: 2, limit: 25 }
    );
    assert_eq!(parse_page(None, None, 100).unwrap(), PageRequest { page: 1, limit: 100 });
    assert!(parse_page(Some("1.5"), None, 100).is_err());
    assert!(parse_page(None, Some("0"), 100).is_err());
    assert!(parse_page(Some("4294967296"), None, 100).is_err());
    assert!(parse_page(None, Some("99999999999"), 100).is_err());
}

#[test]
fn page_far_past_the_end_is_empty() {
    let (db, alice, _) = setup();
    let mut svc = HistoryService::new(db.connection());
    svc.collect(alice, &[visit("https://a.io", "A", "2024-05-01T10:00:00Z")])
        .unwrap();

    let request = parse_page(Some("4294967295"), Some("4294967295"), 50).unwrap();
    assert_eq!(request.page, u32::MAX);
    assert_eq!(request.offset(), i64::MAX);

    let listed = svc.list(alice, request).unwrap();
    assert!(listed.results.is_empty());
    assert_eq!(listed.page, u32::MAX);
    assert_eq!(listed.total_results, 1);

    let found = svc.search(alice, "a.io", request).unwrap();
    assert!(found.results.is_empty());
    assert_eq!(found.total_results, 1);
}
