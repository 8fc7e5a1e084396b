//! Organization management: edit, delete, and ownership transfer.

mod common;

use axum::http::StatusCode;
use common::*;
use serde_json::json;

#[tokio::test]
async fn test_admin_edits_but_cannot_delete_organization() {
    let app = spawn_app();
    let (org_id, _) = signup(&app, "Acme", "owner@acme.test", "password-123").await;
    let owner_token = login(&app, "owner@acme.test", "password-123").await;

    create_user(&app, &owner_token, "admin@acme.test", "password-789", "admin").await;
    let admin_token = login(&app, "admin@acme.test", "password-789").await;

    let (status, body) = request(
        &app,
        "PATCH",
        &format!("/organizations/{}", org_id),
        Some(&admin_token),
        Some(json!({ "org_name": "Acme Renamed" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["org_name"], "Acme Renamed");

    // organization.delete is an owner capability.
    let (status, _) = request(
        &app,
        "DELETE",
        &format!("/organizations/{}", org_id),
        Some(&admin_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_deleted_organization_blocks_logins() {
    let app = spawn_app();
    let (org_id, _) = signup(&app, "Acme", "owner@acme.test", "password-123").await;
    let owner_token = login(&app, "owner@acme.test", "password-123").await;

    let (status, _) = request(
        &app,
        "DELETE",
        &format!("/organizations/{}", org_id),
        Some(&owner_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // A fresh login into the retired tenant fails like any bad credential.
    let (status, _) = request(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": "owner@acme.test", "password": "password-123" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_ownership_transfer_swaps_roles() {
    let app = spawn_app();
    let (org_id, owner_id) = signup(&app, "Acme", "owner@acme.test", "password-123").await;
    let owner_token = login(&app, "owner@acme.test", "password-123").await;

    let admin_id = create_user(&app, &owner_token, "admin@acme.test", "password-789", "admin").await;

    let (status, _) = request(
        &app,
        "POST",
        &format!("/organizations/{}/transfer", org_id),
        Some(&owner_token),
        Some(json!({ "new_owner_id": admin_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let new_owner = app.store.find_user(admin_id).await.unwrap().unwrap();
    assert_eq!(new_owner.role_code, "owner");
    let old_owner = app.store.find_user(owner_id).await.unwrap().unwrap();
    assert_eq!(old_owner.role_code, "admin");
}

#[tokio::test]
async fn test_transfer_requires_member_of_the_organization() {
    let app = spawn_app();
    let (org_id, _) = signup(&app, "Acme", "owner@acme.test", "password-123").await;
    let (_, beta_owner_id) = signup(&app, "Beta", "owner@beta.test", "password-456").await;
    let owner_token = login(&app, "owner@acme.test", "password-123").await;

    let (status, _) = request(
        &app,
        "POST",
        &format!("/organizations/{}/transfer", org_id),
        Some(&owner_token),
        Some(json!({ "new_owner_id": beta_owner_id })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_cannot_transfer_ownership() {
    let app = spawn_app();
    let (org_id, _) = signup(&app, "Acme", "owner@acme.test", "password-123").await;
    let owner_token = login(&app, "owner@acme.test", "password-123").await;

    let admin_id = create_user(&app, &owner_token, "admin@acme.test", "password-789", "admin").await;
    let admin_token = login(&app, "admin@acme.test", "password-789").await;

    let (status, _) = request(
        &app,
        "POST",
        &format!("/organizations/{}/transfer", org_id),
        Some(&admin_token),
        Some(json!({ "new_owner_id": admin_id })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_audit_trail_visible_to_admin_not_staff() {
    let app = spawn_app();
    let (org_id, _) = signup(&app, "Acme", "owner@acme.test", "password-123").await;
    let owner_token = login(&app, "owner@acme.test", "password-123").await;

    create_user(&app, &owner_token, "admin@acme.test", "password-789", "admin").await;
    create_user(&app, &owner_token, "staff@acme.test", "password-789", "staff").await;
    let admin_token = login(&app, "admin@acme.test", "password-789").await;
    let staff_token = login(&app, "staff@acme.test", "password-789").await;
    drain_background_tasks().await;

    let (status, body) = request(
        &app,
        "GET",
        &format!("/organizations/{}/audit", org_id),
        Some(&admin_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body["events"].as_array().unwrap().is_empty());

    let (status, _) = request(
        &app,
        "GET",
        &format!("/organizations/{}/audit", org_id),
        Some(&staff_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
