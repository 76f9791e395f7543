// tests/api_http.rs
//
// HTTP-level tests for the status Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET /        (liveness text, or a check when configured)
// - GET /health  (cursor is visible)
// - GET /check   (worker attached / detached)
// - GET /test

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value as Json;
use tokio::sync::watch;
use tower::ServiceExt as _; // for `oneshot`

use common::{context, dispatcher, entry, RecordingApi, StaticFeed};
use rss_telegram_relay::api::{self, AppState, LIVENESS_TEXT, TEST_MESSAGE};
use rss_telegram_relay::{Backoff, WorkerActor};

const BODY_LIMIT: usize = 1024 * 1024;

fn detached_router(api: Arc<RecordingApi>, cursor: &str, root_triggers_check: bool) -> Router {
    let (_tx, rx) = watch::channel(cursor.to_string());
    let state = AppState {
        cursor: rx,
        dispatcher: dispatcher(api),
        worker: None,
        root_triggers_check,
    };
    api::router(state, None)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build request");
    let resp = app.oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    (status, bytes)
}

fn json(bytes: &[u8]) -> Json {
    serde_json::from_slice(bytes).expect("json body")
}

#[tokio::test]
async fn root_is_plain_liveness_text() {
    let app = detached_router(RecordingApi::new(), "", false);
    let (status, body) = get(app, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(String::from_utf8(body).unwrap(), LIVENESS_TEXT);
}

#[tokio::test]
async fn health_reports_last_post_id() {
    let app = detached_router(RecordingApi::new(), "p42", false);
    let (status, body) = get(app, "/health").await;
    assert_eq!(status, StatusCode::OK);

    let v = json(&body);
    assert_eq!(v["status"], "healthy");
    assert_eq!(v["last_post_id"], "p42");
    assert!(v["timestamp"].as_str().is_some_and(|t| !t.is_empty()));
}

#[tokio::test]
async fn check_without_worker_is_unavailable() {
    let app = detached_router(RecordingApi::new(), "", false);
    let (status, body) = get(app, "/check").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json(&body)["status"], "error");

    // the root route forwards to the same handler when configured to
    let app = detached_router(RecordingApi::new(), "", true);
    let (status, _) = get(app, "/").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_route_sends_a_message() {
    let api = RecordingApi::new();
    let app = detached_router(api.clone(), "", false);
    let (status, body) = get(app, "/test").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["status"], "success");

    let msgs = api.messages();
    assert_eq!(msgs.len(), 1);
    assert_eq!(msgs[0].text, TEST_MESSAGE);
}

#[tokio::test]
async fn test_route_reports_missing_token() {
    let app = detached_router(RecordingApi::without_token(), "", false);
    let (_, body) = get(app, "/test").await;
    let v = json(&body);
    assert_eq!(v["status"], "error");
    assert!(v["message"].as_str().unwrap().contains("Failed to send test message"));
}

#[tokio::test]
async fn check_runs_through_the_worker() {
    let dir = tempfile::tempdir().unwrap();
    let api = RecordingApi::new();
    let feed = StaticFeed::new(vec![entry("p1", "Assembly", "<p>Hi</p>")]);
    let ctx = context(feed.clone(), api.clone(), &dir.path().join("c.txt"), 1).await;

    let mut cursor = ctx.subscribe();
    let (actor, handle) = WorkerActor::new(
        ctx,
        Backoff::new(Duration::from_secs(3600), Duration::from_secs(60)),
    );
    tokio::spawn(actor.run());

    // the timer fires once at startup and forwards p1
    tokio::time::timeout(Duration::from_secs(5), cursor.changed())
        .await
        .expect("first cycle in time")
        .unwrap();
    assert_eq!(cursor.borrow().as_str(), "p1");

    let state = AppState {
        cursor: cursor.clone(),
        dispatcher: dispatcher(api.clone()),
        worker: Some(handle),
        root_triggers_check: false,
    };
    let app = api::router(state, None);

    let (status, body) = get(app.clone(), "/check").await;
    assert_eq!(status, StatusCode::OK);
    let v = json(&body);
    assert_eq!(v["status"], "success");
    assert_eq!(v["message"], "No new posts.");
    assert_eq!(v["posts_sent"], 0);

    feed.set(vec![entry("p2", "Sports day", ""), entry("p1", "Assembly", "")]);
    let (_, body) = get(app.clone(), "/check").await;
    let v = json(&body);
    assert_eq!(v["message"], "Sent 1 new post(s).");
    assert_eq!(v["posts_sent"], 1);

    let (_, body) = get(app.clone(), "/health").await;
    assert_eq!(json(&body)["last_post_id"], "p2");

    feed.set(vec![]);
    let (_, body) = get(app, "/check").await;
    let v = json(&body);
    assert_eq!(v["status"], "warning");
    assert_eq!(v["message"], "No RSS posts found.");

    assert_eq!(api.messages().len(), 2);
}
