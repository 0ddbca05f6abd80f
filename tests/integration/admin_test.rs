//! Admin console endpoints behind the interceptor.

use axum::http::StatusCode;
use serde_json::json;

use wardgate_core::types::PageRequest;
use wardgate_database::store::{ActivityFilter, AlertFilter};
use wardgate_entity::activity::{ActionKind, AlertKind};
use wardgate_entity::role::NewRole;
use wardgate_service::RequestContext;

use crate::helpers::TestApp;

#[tokio::test]
async fn test_anonymous_admin_request_is_unauthenticated() {
    let app = TestApp::new().await;
    let response = app.request("GET", "/admin/alerts/", None, None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["error"], "session_expired");
}

#[tokio::test]
async fn test_non_staff_on_admin_path_raises_privilege_escalation() {
    let app = TestApp::new().await;
    let clerk = app.create_user("ward_clerk", "0711223344", "pw", false).await;
    let token = app.login("/app/login/", "0711223344", "pw").await;

    for path in ["/admin/alerts/", "/admin/patients/12/"] {
        let response = app.request("GET", path, None, Some(&token)).await;
        assert_eq!(response.status, StatusCode::FORBIDDEN);
        assert_eq!(response.body["error"], "forbidden");
        assert_eq!(response.body["message"], "Forbidden");
    }

    let alerts = app
        .services
        .alerts
        .list(
            &AlertFilter {
                kind: Some(AlertKind::PrivilegeEscalation),
                ..Default::default()
            },
            &PageRequest::default(),
        )
        .await
        .unwrap();
    // The second attempt falls inside the cooldown.
    assert_eq!(alerts.total_items, 1);
    assert_eq!(alerts.items[0].user_id, Some(clerk.id));

    let denied = app
        .services
        .recorder
        .list(
            &ActivityFilter {
                user_id: Some(clerk.id),
                ..Default::default()
            },
            &PageRequest::default(),
        )
        .await
        .unwrap()
        .items
        .into_iter()
        .filter(|r| r.action_kind == ActionKind::AccessDenied)
        .count();
    assert_eq!(denied, 2);
}

#[tokio::test]
async fn test_staff_needs_the_codename() {
    let app = TestApp::new().await;
    let auditor = app.create_user("auditor", "0755000111", "pw", true).await;
    let token = app.login("/admin/login/", "auditor", "pw").await;

    let response = app.request("GET", "/admin/audit/", None, Some(&token)).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let ctx = RequestContext::system();
    let roles = &app.services.roles;
    let role = roles
        .create(
            &ctx,
            NewRole {
                name: "Auditor".to_string(),
                description: String::new(),
            },
        )
        .await
        .unwrap();
    roles
        .add_permission(&ctx, role.id, "audit.view_auditlog")
        .await
        .unwrap();
    roles.grant_role(&ctx, auditor.id, "auditor").await.unwrap();

    let response = app.request("GET", "/admin/audit/", None, Some(&token)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["success"], true);
    // Creating the auditor, the role, the permission, and the grant.
    assert!(response.body["data"]["total_items"].as_u64().unwrap() >= 4);

    // Other admin endpoints stay closed.
    let response = app
        .request("GET", "/admin/activity/statistics", None, Some(&token))
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_resolve_alert_over_http() {
    let app = TestApp::new().await;
    let root = app.create_superuser("root", "08000000001", "P@ssw0rd-xyz").await;
    let token = app.login("/admin/login/", "root", "P@ssw0rd-xyz").await;
    let alert = app
        .services
        .detector
        .report_system_error("pharmacy-sync", "Upstream refused the batch", json!({}))
        .await
        .unwrap();

    let open = app
        .request("GET", "/admin/alerts/?open=true", None, Some(&token))
        .await;
    assert_eq!(open.status, StatusCode::OK);
    assert_eq!(open.body["data"]["total_items"], 1);

    let path = format!("/admin/alerts/{}/resolve", alert.id);
    let response = app
        .request("POST", &path, Some(json!({ "notes": "Retried manually" })), Some(&token))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["is_resolved"], true);
    assert_eq!(response.body["data"]["resolved_by"], root.id.get());

    let again = app
        .request("POST", &path, Some(json!({ "notes": "again" })), Some(&token))
        .await;
    assert_eq!(again.status, StatusCode::CONFLICT);
    assert_eq!(again.body["error"], "conflict");

    let missing = app
        .request("POST", "/admin/alerts/9999/resolve", Some(json!({})), Some(&token))
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let open = app
        .request("GET", "/admin/alerts/?open=true", None, Some(&token))
        .await;
    assert_eq!(open.body["data"]["total_items"], 0);
}

#[tokio::test]
async fn test_bulk_users_over_http() {
    let app = TestApp::new().await;
    let root = app.create_superuser("root", "08000000001", "P@ssw0rd-xyz").await;
    let token = app.login("/admin/login/", "root", "P@ssw0rd-xyz").await;
    let a = app.create_user("porter_a", "0790000001", "pw", false).await;
    let b = app.create_user("porter_b", "0790000002", "pw", false).await;

    let response = app
        .request(
            "POST",
            "/admin/users/bulk",
            Some(json!({ "action": "deactivate", "ids": [a.id, b.id, 9999] })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["affected_ids"], json!([a.id, b.id]));
    assert_eq!(response.body["data"]["skipped_ids"], json!([9999]));

    let deleted_self = app
        .request(
            "POST",
            "/admin/users/bulk",
            Some(json!({ "action": "delete", "ids": [root.id] })),
            Some(&token),
        )
        .await;
    assert_eq!(deleted_self.status, StatusCode::OK);
    assert_eq!(deleted_self.body["data"]["affected_ids"], json!([]));

    let unknown = app
        .request(
            "POST",
            "/admin/users/bulk",
            Some(json!({ "action": "promote", "ids": [a.id] })),
            Some(&token),
        )
        .await;
    assert_eq!(unknown.status, StatusCode::BAD_REQUEST);
    assert_eq!(unknown.body["error"], "validation_error");
}

#[tokio::test]
async fn test_statistics_over_http() {
    let app = TestApp::new().await;
    app.create_superuser("root", "08000000001", "P@ssw0rd-xyz").await;
    let token = app.login("/admin/login/", "root", "P@ssw0rd-xyz").await;

    let response = app
        .request("GET", "/admin/activity/statistics?range=7d", None, Some(&token))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["success"], true);

    let bad = app
        .request("GET", "/admin/activity/statistics?range=1y", None, Some(&token))
        .await;
    assert_eq!(bad.status, StatusCode::BAD_REQUEST);
}
