//! Superuser bootstrap and the role graph, end to end through the service
//! graph the server runs.

use wardgate_auth::gate::{Operation, Scope};
use wardgate_core::error::ErrorKind;
use wardgate_entity::permission::NewPermission;
use wardgate_entity::role::NewRole;
use wardgate_service::RequestContext;

use crate::helpers::TestApp;

fn role(name: &str) -> NewRole {
    NewRole {
        name: name.to_string(),
        description: String::new(),
    }
}

#[tokio::test]
async fn test_superuser_bootstrap() {
    let app = TestApp::new().await;
    let root = app
        .create_superuser("root", "08000000001", "P@ssw0rd-xyz")
        .await;
    assert!(root.is_active);
    assert!(root.is_staff);
    assert!(root.is_superuser);

    let found = app
        .services
        .identity
        .find_by_username("root")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, root.id);

    let decision = app
        .services
        .gate
        .authorize(
            Some(&root),
            &Operation::new("any.perm", Scope::AdminConsole),
            None,
        )
        .await;
    assert!(decision.is_allowed());
}

#[tokio::test]
async fn test_cycle_rejection_leaves_graph_unchanged() {
    let app = TestApp::new().await;
    let ctx = RequestContext::system();
    let roles = &app.services.roles;

    let a = roles.create(&ctx, role("A")).await.unwrap();
    let b = roles.create(&ctx, role("B")).await.unwrap();
    let c = roles.create(&ctx, role("C")).await.unwrap();
    roles.set_parent(&ctx, b.id, Some(a.id)).await.unwrap();
    roles.set_parent(&ctx, c.id, Some(b.id)).await.unwrap();

    let err = roles.set_parent(&ctx, a.id, Some(c.id)).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);

    let after = roles.list().await.unwrap();
    let parent_of = |id| after.iter().find(|r| r.id == id).unwrap().parent_id;
    assert_eq!(parent_of(a.id), None);
    assert_eq!(parent_of(b.id), Some(a.id));
    assert_eq!(parent_of(c.id), Some(b.id));
}

#[tokio::test]
async fn test_inherited_permission_scenario() {
    let app = TestApp::new().await;
    let ctx = RequestContext::system();
    let roles = &app.services.roles;
    app.services
        .stores
        .permissions
        .insert(&NewPermission {
            object_type: "patients".to_string(),
            codename: "view".to_string(),
            name: "Can view patients".to_string(),
        })
        .await
        .unwrap();

    let doctor = roles.create(&ctx, role("doctor")).await.unwrap();
    let senior = roles.create(&ctx, role("senior_doctor")).await.unwrap();
    roles.set_parent(&ctx, senior.id, Some(doctor.id)).await.unwrap();
    roles.add_permission(&ctx, doctor.id, "patients.view").await.unwrap();

    let user = app.create_user("house", "0799000111", "pw", false).await;
    roles.grant_role(&ctx, user.id, "senior_doctor").await.unwrap();

    let resolver = &app.services.resolver;
    assert!(resolver.has_permission(&user, "patients.view").await.unwrap());

    roles
        .remove_permission(&ctx, doctor.id, "patients.view")
        .await
        .unwrap();
    assert!(!resolver.has_permission(&user, "patients.view").await.unwrap());
}

#[tokio::test]
async fn test_password_round_trip() {
    let app = TestApp::new().await;
    let user = app.create_user("nurse", "0712345678", "pw", false).await;
    let identity = &app.services.identity;

    identity
        .set_password(&RequestContext::system(), user.id, "Night-shift-77")
        .await
        .unwrap();
    let user = identity.get(user.id).await.unwrap();
    assert!(identity.verify_password(&user, "Night-shift-77").unwrap());
    assert!(!identity.verify_password(&user, "Night-shift-78").unwrap());
    assert!(!identity.verify_password(&user, "pw").unwrap());
}
