//! The capability evaluation endpoint.

mod common;

use axum::http::StatusCode;
use common::*;
use serde_json::json;

#[tokio::test]
async fn test_evaluate_reports_grants_and_denials() {
    let app = spawn_app();
    signup(&app, "Acme", "owner@acme.test", "password-123").await;
    let owner_token = login(&app, "owner@acme.test", "password-123").await;

    create_user(&app, &owner_token, "staff@acme.test", "password-789", "staff").await;
    let staff_token = login(&app, "staff@acme.test", "password-789").await;

    let (status, body) = request(
        &app,
        "POST",
        "/authz/evaluate",
        Some(&staff_token),
        Some(json!({
            "permissions": ["clients.view", "users.delete", "organization.transfer"],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["all_allowed"], false);

    let decisions = body["decisions"].as_array().unwrap();
    assert_eq!(decisions.len(), 3);
    assert_eq!(decisions[0]["permission"], "clients.view");
    assert_eq!(decisions[0]["allowed"], true);
    assert_eq!(decisions[1]["allowed"], false);
    assert_eq!(decisions[1]["reason"], "NOT_GRANTED");
    assert_eq!(decisions[2]["allowed"], false);
}

#[tokio::test]
async fn test_evaluate_applies_self_scope_against_a_resource() {
    let app = spawn_app();
    signup(&app, "Acme", "owner@acme.test", "password-123").await;
    let owner_token = login(&app, "owner@acme.test", "password-123").await;

    let staff_id = create_user(&app, &owner_token, "staff@acme.test", "password-789", "staff").await;
    let other_id = create_user(&app, &owner_token, "mate@acme.test", "password-789", "staff").await;
    let staff_token = login(&app, "staff@acme.test", "password-789").await;

    let (_, me) = request(&app, "GET", "/users/me", Some(&staff_token), None).await;
    let org_id = me["org_id"].as_str().unwrap();
    assert_eq!(me["user_id"].as_str().unwrap().parse::<uuid::Uuid>().unwrap(), staff_id);

    // Own record: allowed.
    let (_, body) = request(
        &app,
        "POST",
        "/authz/evaluate",
        Some(&staff_token),
        Some(json!({
            "permissions": ["users.edit"],
            "resource": { "id": staff_id, "org_id": org_id },
        })),
    )
    .await;
    assert_eq!(body["decisions"][0]["allowed"], true);

    // A colleague's record: self-scope violation.
    let (_, body) = request(
        &app,
        "POST",
        "/authz/evaluate",
        Some(&staff_token),
        Some(json!({
            "permissions": ["users.edit"],
            "resource": { "id": other_id, "org_id": org_id },
        })),
    )
    .await;
    assert_eq!(body["decisions"][0]["allowed"], false);
    assert_eq!(body["decisions"][0]["reason"], "SELF_SCOPE_VIOLATION");
}

#[tokio::test]
async fn test_evaluate_rejects_unknown_permission_strings() {
    let app = spawn_app();
    signup(&app, "Acme", "owner@acme.test", "password-123").await;
    let token = login(&app, "owner@acme.test", "password-123").await;

    // The capability set is closed; unknown strings fail at the edge.
    let (status, _) = request(
        &app,
        "POST",
        "/authz/evaluate",
        Some(&token),
        Some(json!({ "permissions": ["users.fly"] })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_evaluate_system_wide_resource_rules() {
    let app = spawn_app();
    signup(&app, "Acme", "owner@acme.test", "password-123").await;
    let token = login(&app, "owner@acme.test", "password-123").await;

    let resource_id = uuid::Uuid::new_v4();

    let (_, body) = request(
        &app,
        "POST",
        "/authz/evaluate",
        Some(&token),
        Some(json!({
            "permissions": ["clients.view", "clients.edit"],
            "resource": { "id": resource_id },
        })),
    )
    .await;

    // Readable by every tenant, writable only by a super admin.
    assert_eq!(body["decisions"][0]["allowed"], true);
    assert_eq!(body["decisions"][1]["allowed"], false);
    assert_eq!(
        body["decisions"][1]["reason"],
        "SYSTEM_RESOURCE_READ_ONLY"
    );
}
