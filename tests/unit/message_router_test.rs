//! Tests for the extension message handler.

mod fake_backend;

use fake_backend::{FakeBackend, Mode, WRONG_PASSWORD};
use memordo::message_router::{handle_message, ExtensionContext};
use memordo::store::{ExtensionStorage, MemoryStore};
use memordo::types::settings::OfflinePolicy;
use memordo::types::visit::VisitEntry;
use rstest::rstest;
use serde_json::{json, Value};

fn context() -> ExtensionContext<MemoryStore, FakeBackend> {
    let mut storage = ExtensionStorage::new(MemoryStore::new());
    storage.initialize_defaults().unwrap();
    ExtensionContext::new(storage, FakeBackend::new(), OfflinePolicy::Drop)
}

async fn logged_in_context() -> ExtensionContext<MemoryStore, FakeBackend> {
    let mut ctx = context();
    handle_message(&mut ctx, "login", &json!({"email": "alice@memo.io", "password": "hunter22"}))
        .await
        .unwrap();
    ctx
}

#[tokio::test]
async fn login_and_logout_round_trip() {
    let mut ctx = context();

    let response = handle_message(
        &mut ctx,
        "login",
        &json!({"email": "alice@memo.io", "password": "hunter22"}),
    )
    .await
    .unwrap();
    assert_eq!(response, json!({"success": true, "email": "alice@memo.io"}));

    let state = handle_message(&mut ctx, "getState", &Value::Null).await.unwrap();
    assert_eq!(state["loggedIn"], true);
    assert_eq!(state["userEmail"], "alice@memo.io");

    let response = handle_message(&mut ctx, "logout", &Value::Null).await.unwrap();
    assert_eq!(response, json!({"success": true}));
    let state = handle_message(&mut ctx, "getState", &Value::Null).await.unwrap();
    assert_eq!(state["loggedIn"], false);
    assert_eq!(state["userEmail"], Value::Null);
}

#[tokio::test]
async fn login_errors_are_messages() {
    let mut ctx = context();

    let err = handle_message(&mut ctx, "login", &json!({"email": "alice@memo.io"}))
        .await
        .unwrap_err();
    assert_eq!(err, "missing password");

    let err = handle_message(
        &mut ctx,
        "login",
        &json!({"email": "alice@memo.io", "password": WRONG_PASSWORD}),
    )
    .await
    .unwrap_err();
    assert_eq!(err, "Invalid email or password");
}

#[tokio::test]
async fn navigation_complete_reports_outcome() {
    let mut ctx = logged_in_context().await;
    let event = json!({"tabId": 3, "status": "complete", "url": "https://a.io", "title": "A"});

    let response = handle_message(&mut ctx, "navigationComplete", &event).await.unwrap();

    assert_eq!(response["success"], true);
    assert_eq!(response["outcome"]["kind"], "sent");
    assert_eq!(response["outcome"]["inserted"], 1);
    let state = handle_message(&mut ctx, "getState", &Value::Null).await.unwrap();
    assert_eq!(state["visitedCount"], 1);
}

#[tokio::test]
async fn tracking_toggle_stops_collection() {
    let mut ctx = logged_in_context().await;

    let response = handle_message(&mut ctx, "setTrackingEnabled", &json!({"enabled": false}))
        .await
        .unwrap();
    assert_eq!(response, json!({"success": true, "trackingEnabled": false}));

    let event = json!({"status": "complete", "url": "https://a.io", "title": "A"});
    let response = handle_message(&mut ctx, "navigationComplete", &event).await.unwrap();
    assert_eq!(response["outcome"]["kind"], "trackingDisabled");
    assert!(ctx.backend.collected.borrow().is_empty());

    let err = handle_message(&mut ctx, "setTrackingEnabled", &json!({"enabled": "no"}))
        .await
        .unwrap_err();
    assert_eq!(err, "missing enabled");
}

#[tokio::test]
async fn toggle_bookmarks_reports_counts() {
    let mut ctx = context();
    let item = json!([{"url": "https://a.io", "title": "A", "timestamp": "2024-05-01T00:00:00.000Z"}]);

    let added = handle_message(&mut ctx, "toggleBookmarks", &item).await.unwrap();
    assert_eq!(added, json!({"success": true, "addedCount": 1, "removedCount": 0}));

    let removed = handle_message(&mut ctx, "toggleBookmarks", &item).await.unwrap();
    assert_eq!(removed, json!({"success": true, "addedCount": 0, "removedCount": 1}));

    let err = handle_message(&mut ctx, "toggleBookmarks", &json!({"url": "x"}))
        .await
        .unwrap_err();
    assert!(err.starts_with("invalid toggleBookmarks payload"));
}

#[tokio::test]
async fn delete_local_history_reports_both_lists() {
    let mut ctx = context();
    let ts = "2024-05-01T00:00:00.000Z";
    ctx.storage
        .set_visited(&[VisitEntry::new("https://a.io", "A", ts)])
        .unwrap();
    ctx.storage
        .set_bookmarks(&[VisitEntry::new("https://a.io", "A", ts)])
        .unwrap();

    let response = handle_message(&mut ctx, "deleteLocalHistory", &json!([ts])).await.unwrap();

    assert_eq!(
        response,
        json!({"success": true, "visitedRemoved": 1, "bookmarksRemoved": 1})
    );
}

#[tokio::test]
async fn delete_from_server_requires_session() {
    let mut ctx = context();
    let keys = json!([{"url": "https://a.io", "timestamp": "2024-05-01T00:00:00.000Z"}]);
    let err = handle_message(&mut ctx, "deleteHistoryFromServer", &keys)
        .await
        .unwrap_err();
    assert_eq!(err, "Not logged in");
}

#[tokio::test]
async fn delete_from_server_reports_count() {
    let mut ctx = logged_in_context().await;
    let keys = json!([
        {"url": "https://a.io", "timestamp": "2024-05-01T00:00:00.000Z"},
        {"url": "https://b.io", "timestamp": "2024-05-02T00:00:00.000Z"}
    ]);

    let response = handle_message(&mut ctx, "deleteHistoryFromServer", &keys).await.unwrap();

    assert_eq!(response, json!({"success": true, "deletedCount": 2}));
    assert_eq!(ctx.backend.deleted.borrow()[0].0, "access-1");
}

#[tokio::test]
async fn rejected_server_delete_logs_out() {
    let mut ctx = logged_in_context().await;
    ctx.backend.mode.set(Mode::Reject);
    let keys = json!([{"url": "https://a.io", "timestamp": "2024-05-01T00:00:00.000Z"}]);

    let err = handle_message(&mut ctx, "deleteHistoryFromServer", &keys)
        .await
        .unwrap_err();

    assert!(err.contains("Invalid token"));
    assert_eq!(ctx.storage.session().unwrap(), None);
}

#[tokio::test]
async fn get_state_reports_counts_and_defaults() {
    let mut ctx = context();
    let state = handle_message(&mut ctx, "getState", &Value::Null).await.unwrap();
    assert_eq!(
        state,
        json!({
            "loggedIn": false,
            "userEmail": null,
            "trackingEnabled": true,
            "visitedCount": 0,
            "bookmarkCount": 0,
        })
    );
}

#[tokio::test]
async fn unknown_action_is_an_error() {
    let mut ctx = context();
    let err = handle_message(&mut ctx, "launchRockets", &Value::Null)
        .await
        .unwrap_err();
    assert_eq!(err, "unknown action: launchRockets");
}

#[tokio::test]
async fn server_list_and_search_use_default_paging() {
    let mut ctx = logged_in_context().await;

    let listed = handle_message(&mut ctx, "listServerHistory", &Value::Null).await.unwrap();
    assert_eq!(listed["success"], true);
    assert_eq!(listed["history"]["page"], 1);
    assert_eq!(listed["history"]["limit"], 100);

    let found = handle_message(&mut ctx, "searchServerHistory", &json!({"query": "rust", "page": 2}))
        .await
        .unwrap();
    assert_eq!(found["history"]["page"], 2);
    assert_eq!(found["history"]["limit"], 50);
}

#[tokio::test]
async fn server_search_requires_query_and_session() {
    let mut ctx = context();
    let err = handle_message(&mut ctx, "searchServerHistory", &json!({"query": "  "}))
        .await
        .unwrap_err();
    assert_eq!(err, "missing query");

    let err = handle_message(&mut ctx, "listServerHistory", &json!({}))
        .await
        .unwrap_err();
    assert_eq!(err, "Not logged in");
}

#[rstest]
#[case("listServerHistory", json!({"page": 1}))]
#[case("searchServerHistory", json!({"query": "rust"}))]
#[case("deleteHistoryFromServer", json!([{"url": "https://a.io", "timestamp": "2024-05-01T00:00:00.000Z"}]))]
#[case("refreshSession", Value::Null)]
#[tokio::test]
async fn rejected_server_calls_end_the_session(#[case] action: &str, #[case] data: Value) {
    let mut ctx = logged_in_context().await;
    ctx.backend.mode.set(Mode::Reject);

    let err = handle_message(&mut ctx, action, &data).await.unwrap_err();

    assert!(err.contains("Invalid token"), "{}: {}", action, err);
    assert_eq!(ctx.storage.session().unwrap(), None);
    let state = handle_message(&mut ctx, "getState", &Value::Null).await.unwrap();
    assert_eq!(state["loggedIn"], false);
}

#[rstest]
#[case("listServerHistory", Value::Null)]
#[case("refreshSession", Value::Null)]
#[tokio::test]
async fn offline_server_calls_keep_the_session(#[case] action: &str, #[case] data: Value) {
    let mut ctx = logged_in_context().await;
    ctx.backend.mode.set(Mode::Offline);

    let err = handle_message(&mut ctx, action, &data).await.unwrap_err();

    assert!(err.contains("connection refused"), "{}: {}", action, err);
    assert!(ctx.storage.session().unwrap().is_some());
}

#[tokio::test]
async fn refresh_session_rotates_tokens() {
    let mut ctx = logged_in_context().await;
    let response = handle_message(&mut ctx, "refreshSession", &Value::Null).await.unwrap();
    assert_eq!(response, json!({"success": true, "email": "alice@memo.io"}));
    assert_eq!(ctx.storage.access_token().unwrap().as_deref(), Some("access-2"));
}

#[tokio::test]
async fn local_search_filters_visited_or_bookmarks() {
    let mut ctx = context();
    ctx.storage
        .set_visited(&[
            VisitEntry::new("https://www.rust-lang.org", "러스트 프로그래밍 언어", "2024-05-01T00:00:00.000Z"),
            VisitEntry::new("https://news.io", "Morning news", "2024-05-02T00:00:00.000Z"),
        ])
        .unwrap();
    ctx.storage
        .set_bookmarks(&[VisitEntry::new("https://news.io", "Morning news", "2024-05-02T00:00:00.000Z")])
        .unwrap();

    let found = handle_message(&mut ctx, "searchLocalHistory", &json!({"query": "ㄹㅅㅌ"}))
        .await
        .unwrap();
    assert_eq!(found["count"], 1);
    assert_eq!(found["results"][0]["url"], "https://www.rust-lang.org");

    let bookmarks = handle_message(
        &mut ctx,
        "searchLocalHistory",
        &json!({"query": "rust", "filter": "bookmarks"}),
    )
    .await
    .unwrap();
    assert_eq!(bookmarks["count"], 0);

    let everything = handle_message(&mut ctx, "searchLocalHistory", &Value::Null).await.unwrap();
    assert_eq!(everything["count"], 2);
}
