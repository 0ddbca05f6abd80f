//! Login, logout, and realm routing over HTTP.

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::json;

use wardgate_core::types::PageRequest;
use wardgate_database::store::{ActivityFilter, AlertFilter};
use wardgate_entity::activity::{ActionKind, AlertKind, AlertSeverity};

use crate::helpers::{CLIENT_IP, TestApp};

#[tokio::test]
async fn test_realm_router_scenario() {
    let app = TestApp::new().await;
    app.create_user("admin1", "08011112222", "pw", true).await;

    let by_username = app
        .request(
            "POST",
            "/admin/login/",
            Some(json!({ "identifier": "admin1", "password": "pw" })),
            None,
        )
        .await;
    assert_eq!(by_username.status, StatusCode::OK);
    assert_eq!(by_username.body["display_name"], "admin1");

    let by_phone_on_admin = app
        .request(
            "POST",
            "/admin/login/",
            Some(json!({ "identifier": "08011112222", "password": "pw" })),
            None,
        )
        .await;
    assert_eq!(by_phone_on_admin.status, StatusCode::UNAUTHORIZED);
    assert_eq!(by_phone_on_admin.body["error"], "authentication_failed");
    assert_eq!(by_phone_on_admin.body["message"], "Invalid credentials");

    let by_phone_on_app = app
        .request(
            "POST",
            "/app/login/",
            Some(json!({ "identifier": "08011112222", "password": "pw" })),
            None,
        )
        .await;
    assert_eq!(by_phone_on_app.status, StatusCode::OK);
}

#[tokio::test]
async fn test_realm_isolation_for_non_staff() {
    let app = TestApp::new().await;
    app.create_user("ward_clerk", "0711223344", "pw", false).await;

    let phone_on_admin = app
        .request(
            "POST",
            "/admin/login/",
            Some(json!({ "identifier": "0711223344", "password": "pw" })),
            None,
        )
        .await;
    assert_eq!(phone_on_admin.status, StatusCode::UNAUTHORIZED);

    let username_on_app = app
        .request(
            "POST",
            "/app/login/",
            Some(json!({ "identifier": "ward_clerk", "password": "pw" })),
            None,
        )
        .await;
    assert_eq!(username_on_app.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_generic_login_follows_referer() {
    let app = TestApp::new().await;
    app.create_user("admin1", "08011112222", "pw", true).await;

    let req = Request::builder()
        .method("POST")
        .uri("/auth/login/")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::ACCEPT, "application/json")
        .header(header::REFERER, "https://ward.example/admin/login/?next=/admin/")
        .body(Body::from(
            json!({ "identifier": "admin1", "password": "pw" }).to_string(),
        ))
        .unwrap();
    assert_eq!(app.send(req).await.status, StatusCode::OK);

    // Without a Referer the application realm applies, which keys on phone.
    let response = app
        .request(
            "POST",
            "/auth/login/",
            Some(json!({ "identifier": "admin1", "password": "pw" })),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_form_login_redirects_same_site_only() {
    let app = TestApp::new().await;
    app.create_user("nurse", "0712345678", "pw", false).await;

    let form = |next: &str| {
        Request::builder()
            .method("POST")
            .uri("/app/login/")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(format!(
                "identifier=0712345678&password=pw&next={next}"
            )))
            .unwrap()
    };

    let response = app.send(form("%2Fpatients%2F12%2F")).await;
    assert_eq!(response.status, StatusCode::FOUND);
    assert_eq!(response.location(), Some("/patients/12/"));
    let cookie = response.session_cookie("wardgate_session").unwrap();
    assert!(!cookie.is_empty());
    let set_cookie = response.headers[header::SET_COOKIE].to_str().unwrap();
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Strict"));

    let response = app.send(form("https%3A%2F%2Fevil.example%2F")).await;
    assert_eq!(response.status, StatusCode::FOUND);
    assert_eq!(response.location(), Some("/"));
}

#[tokio::test]
async fn test_failed_login_writes_exactly_one_record() {
    let app = TestApp::new().await;
    let nurse = app.create_user("nurse", "0712345678", "pw", false).await;

    let response = app
        .request(
            "POST",
            "/app/login/",
            Some(json!({ "identifier": "0712345678", "password": "wrong" })),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let records = app
        .services
        .recorder
        .list(&ActivityFilter::default(), &PageRequest::default())
        .await
        .unwrap();
    assert_eq!(records.total_items, 1);
    let record = &records.items[0];
    assert!(matches!(
        record.action_kind,
        ActionKind::AccessDenied | ActionKind::Error
    ));
    // The identifier resolved, so the record names the user.
    assert_eq!(record.user_id, Some(nurse.id));
    assert_eq!(record.ip_address.as_deref(), Some(CLIENT_IP));
}

#[tokio::test]
async fn test_failed_login_burst_raises_one_alert() {
    let app = TestApp::new().await;

    for _ in 0..5 {
        let response = app
            .request(
                "POST",
                "/app/login/",
                Some(json!({ "identifier": "08000000009", "password": "guess" })),
                None,
            )
            .await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        app.clock.advance(chrono::Duration::minutes(1));
    }

    let alerts = app
        .services
        .alerts
        .list(&AlertFilter::default(), &PageRequest::default())
        .await
        .unwrap();
    assert_eq!(alerts.total_items, 1);
    let alert = &alerts.items[0];
    assert_eq!(alert.alert_kind, AlertKind::MultipleFailedLogins);
    assert_eq!(alert.severity, AlertSeverity::Warning);
    assert_eq!(alert.user_id, None);
    assert_eq!(alert.ip_address.as_deref(), Some(CLIENT_IP));

    // A sixth failure inside the cooldown adds nothing.
    app.request(
        "POST",
        "/app/login/",
        Some(json!({ "identifier": "08000000009", "password": "guess" })),
        None,
    )
    .await;
    let alerts = app
        .services
        .alerts
        .list(&AlertFilter::default(), &PageRequest::default())
        .await
        .unwrap();
    assert_eq!(alerts.total_items, 1);
}

#[tokio::test]
async fn test_logout_clears_cookie_and_ends_session() {
    let app = TestApp::new().await;
    app.create_user("nurse", "0712345678", "pw", false).await;
    let token = app.login("/app/login/", "0712345678", "pw").await;
    assert_eq!(app.memory.session_count().await, 1);

    let response = app
        .request("POST", "/auth/logout/?reason=shift_end", None, Some(&token))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, json!({ "logged_out": true }));
    assert_eq!(
        response.session_cookie("wardgate_session").as_deref(),
        Some("")
    );
    assert_eq!(app.memory.session_count().await, 0);

    let logouts = app
        .services
        .recorder
        .list(&ActivityFilter::default(), &PageRequest::default())
        .await
        .unwrap()
        .items
        .into_iter()
        .filter(|r| r.action_kind == ActionKind::Logout)
        .count();
    assert_eq!(logouts, 1);
}

#[tokio::test]
async fn test_health_is_not_recorded() {
    let app = TestApp::new().await;
    let response = app.request("GET", "/health", None, None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
    assert_eq!(app.memory.activity_count().await, 0);
}

#[tokio::test]
async fn test_admin_login_with_app_session_cookie() {
    let app = TestApp::new().await;
    app.create_user("ward_clerk", "0711223344", "pw", false).await;
    let staff = app.create_superuser("charge_nurse", "0755667788", "pw").await;
    let clerk_token = app.login("/app/login/", "0711223344", "pw").await;

    let response = app
        .request(
            "POST",
            "/admin/login/",
            Some(json!({ "identifier": "charge_nurse", "password": "pw" })),
            Some(&clerk_token),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
    assert_eq!(response.body["user_id"], json!(staff.id.get()));
    let staff_token = response
        .session_cookie(&app.config.server.cookie_name)
        .expect("admin login sets a session cookie");
    assert_ne!(staff_token, clerk_token);

    let alerts = app
        .services
        .detector
        .list_alerts(
            &AlertFilter {
                kind: Some(AlertKind::PrivilegeEscalation),
                ..Default::default()
            },
            &PageRequest::default(),
        )
        .await
        .unwrap();
    assert_eq!(alerts.total_items, 0);

    // The new session opens the console.
    let console = app.request("GET", "/admin/activity/statistics", None, Some(&staff_token)).await;
    assert_eq!(console.status, StatusCode::OK);
}
