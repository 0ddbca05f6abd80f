//! Idle expiry, passive status polling, and concurrent-login policy.

use axum::http::StatusCode;
use chrono::Duration;

use wardgate_core::config::ConcurrencyPolicy;

use crate::helpers::{TestApp, test_config};

const ALERTS: &str = "/admin/alerts/";

#[tokio::test]
async fn test_idle_expiry_scenario() {
    let app = TestApp::new().await;
    app.create_superuser("root", "08000000001", "P@ssw0rd-xyz").await;
    let token = app.login("/admin/login/", "root", "P@ssw0rd-xyz").await;

    app.clock.advance(Duration::minutes(29));
    let response = app.request("GET", ALERTS, None, Some(&token)).await;
    assert_eq!(response.status, StatusCode::OK);

    // No activity for a full timeout plus one second after the extension.
    app.clock.advance(Duration::minutes(30) + Duration::seconds(1));
    let response = app.request("GET", ALERTS, None, Some(&token)).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["error"], "session_expired");
    assert_eq!(
        response.session_cookie("wardgate_session").as_deref(),
        Some("")
    );
    assert_eq!(app.memory.session_count().await, 0);
}

#[tokio::test]
async fn test_idle_expiry_boundary_is_inclusive() {
    let app = TestApp::new().await;
    app.create_superuser("root", "08000000001", "P@ssw0rd-xyz").await;
    let token = app.login("/admin/login/", "root", "P@ssw0rd-xyz").await;

    app.clock.advance(Duration::minutes(30));
    let response = app.request("GET", ALERTS, None, Some(&token)).await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_status_polling_does_not_extend() {
    let app = TestApp::new().await;
    app.create_user("nurse", "0712345678", "pw", false).await;
    let token = app.login("/app/login/", "0712345678", "pw").await;

    app.clock.advance(Duration::minutes(10));
    let status = app
        .request("GET", "/auth/session/status", None, Some(&token))
        .await;
    assert_eq!(status.status, StatusCode::OK);
    assert_eq!(status.body["authenticated"], true);
    assert_eq!(status.body["seconds_remaining"], 20 * 60);
    assert_eq!(status.body["warning"], false);

    app.clock.advance(Duration::minutes(16));
    let status = app
        .request("GET", "/auth/session/status", None, Some(&token))
        .await;
    assert_eq!(status.body["seconds_remaining"], 4 * 60);
    assert_eq!(status.body["warning"], true);

    app.clock.advance(Duration::minutes(5));
    let status = app
        .request("GET", "/auth/session/status", None, Some(&token))
        .await;
    assert_eq!(status.body["authenticated"], false);
    assert_eq!(app.memory.activity_count().await, 1, "only the login is recorded");
}

#[tokio::test]
async fn test_single_session_policy_preempts_older_login() {
    let mut config = test_config();
    config.session.concurrency = ConcurrencyPolicy::Single;
    let app = TestApp::with_config(config).await;
    app.create_superuser("root", "08000000001", "P@ssw0rd-xyz").await;

    let first = app.login("/admin/login/", "root", "P@ssw0rd-xyz").await;
    let second = app.login("/admin/login/", "root", "P@ssw0rd-xyz").await;
    assert_ne!(first, second);
    assert_eq!(app.memory.session_count().await, 1);

    let response = app.request("GET", ALERTS, None, Some(&first)).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    let response = app.request("GET", ALERTS, None, Some(&second)).await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_sweep_ends_idle_sessions() {
    let app = TestApp::new().await;
    app.create_user("nurse", "0712345678", "pw", false).await;
    app.login("/app/login/", "0712345678", "pw").await;

    app.clock.advance(Duration::minutes(31));
    assert_eq!(app.services.sweep().await.unwrap(), 1);
    assert_eq!(app.memory.session_count().await, 0);
}
