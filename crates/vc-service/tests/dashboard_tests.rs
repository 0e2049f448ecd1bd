//! Dashboard API tests.
//!
//! Runs the dashboard router in-process with `tower::ServiceExt::oneshot`
//! against a live lifecycle actor and an in-memory SQLite archive.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tower::util::ServiceExt;
use vc_service::dashboard::{dashboard_router, DashboardState};
use vc_service::history::SqliteHistoryArchive;
use vc_test_utils::*;

async fn app(harness: &TestHarness) -> (Router, SqliteHistoryArchive) {
    let history = SqliteHistoryArchive::open_in_memory().await.unwrap();
    let state = Arc::new(DashboardState {
        controller: harness.controller.clone(),
        history: history.clone(),
    });
    (dashboard_router(state), history)
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("Failed to build request");
    let response = app
        .oneshot(request)
        .await
        .expect("Failed to execute request");
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_sessions_lists_active_sessions() {
    let harness = TestHarness::new();
    harness.join(&member(1, "alice"), ROOM_A, t(0)).await;
    harness.join(&member(2, "bob"), ROOM_A, t(5)).await;
    let (app, _) = app(&harness).await;

    let (status, body) = get_json(app, "/api/sessions").await;

    assert_eq!(status, StatusCode::OK);
    let sessions = body.as_array().unwrap();
    assert_eq!(sessions.len(), 1);
    let session = sessions.first().unwrap();
    assert_eq!(session["room_id"], ROOM_A.get());
    assert_eq!(session["starter_id"], 1);
    assert_eq!(session["participants"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_session_by_room() {
    let harness = TestHarness::new();
    harness.join(&member(1, "alice"), ROOM_A, t(0)).await;
    let (app, _) = app(&harness).await;

    let (status, body) = get_json(app, &format!("/api/sessions/{}", ROOM_A.get())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["room_name"], "alice\u{306E}VC");
    assert_eq!(body["participants"][0]["name"], "alice");
    assert_eq!(body["participants"][0]["connected"], true);
}

#[tokio::test]
async fn test_unknown_session_is_not_found() {
    let harness = TestHarness::new();
    let (app, _) = app(&harness).await;

    let (status, body) = get_json(app, "/api/sessions/999").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_status_reports_counts() {
    let harness = TestHarness::new();
    harness.join(&member(1, "alice"), ROOM_A, t(0)).await;
    harness.join(&member(2, "bob"), ROOM_B, t(0)).await;
    let (app, _) = app(&harness).await;

    let (status, body) = get_json(app, "/api/status").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["active_sessions"], 2);
    assert_eq!(body["connected_participants"], 2);
    assert_eq!(body["sessions_started"], 2);
    assert_eq!(body["sessions_ended"], 0);
    assert!(body["mailbox_peak_depth"].as_u64().unwrap() >= 1);
}

#[tokio::test]
async fn test_history_returns_archived_sessions() {
    let harness = TestHarness::new();
    let alice = member(1, "alice");
    harness.join(&alice, ROOM_A, t(0)).await;
    harness.leave(&alice, t(120)).await;
    let (app, archive) = app(&harness).await;

    // The harness archives into memory; copy the record into SQLite
    let record = harness.history.records().pop().unwrap();
    archive.insert(&record).await.unwrap();

    let uri = format!("/api/guilds/{}/history", GUILD.get());
    let (status, body) = get_json(app.clone(), &uri).await;
    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    let row = rows.first().unwrap();
    assert!(row["id"].is_i64());
    assert_eq!(row["room_id"], ROOM_A.get());
    assert_eq!(row["duration_seconds"], 120);
    assert_eq!(row["participants"]["1"]["total_sec"], 120);

    let (_, body) = get_json(app, "/api/guilds/42/history?limit=5").await;
    assert!(body.as_array().unwrap().is_empty());
}
