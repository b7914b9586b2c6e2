
use actix_web::{http::StatusCode, test};
use childcare_backend::{auth::jwt::JwtIdentityProvider, entities::invitation::Invitation};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use test_utils::{bearer, TestApp, TEST_SECRET};

#[actix_rt::test]
async fn root_is_public() {
    let app = TestApp::new();
    let service = app.service().await;

    let req = test::TestRequest::get().uri("/").to_request();
    let body: Value = test::call_and_read_body_json(&service, req).await;

    assert_eq!(body["status"], "Ok");
}

#[actix_rt::test]
async fn protected_routes_reject_missing_and_bad_tokens() {
    let app = TestApp::new();
    let service = app.service().await;

    let req = test::TestRequest::get().uri("/api/users").to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::get()
        .uri("/api/users")
        .insert_header(bearer("not-a-jwt"))
        .to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let expired = JwtIdentityProvider::with_secret(TEST_SECRET, Duration::minutes(-5))
        .issue_token("u1", Some("u1@example.com"), None, false)
        .unwrap();
    let req = test::TestRequest::get()
        .uri("/api/users")
        .insert_header(bearer(&expired))
        .to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_rt::test]
async fn whoami_echoes_the_verified_identity() {
    let app = TestApp::new();
    let service = app.service().await;

    let req = test::TestRequest::get()
        .uri("/api/whoami")
        .insert_header(bearer(&app.token("u1", "u1@example.com", false)))
        .to_request();
    let body: Value = test::call_and_read_body_json(&service, req).await;

    assert_eq!(body["uid"], "u1");
    assert_eq!(body["admin"], false);
}

#[actix_rt::test]
async fn admin_health_requires_admin() {
    let app = TestApp::new();
    let service = app.service().await;

    let req = test::TestRequest::get()
        .uri("/admin/health")
        .insert_header(bearer(&app.token("u1", "u1@example.com", false)))
        .to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::get()
        .uri("/admin/health")
        .insert_header(bearer(&app.admin_token()))
        .to_request();
    let body: Value = test::call_and_read_body_json(&service, req).await;
    assert_eq!(body["userStore"], "OK");
    assert_eq!(body["blobStore"], "OK");
}

#[actix_rt::test]
async fn invited_admin_signs_up_as_admin_and_gains_the_claim() {
    let app = TestApp::new();
    let service = app.service().await;

    let req = test::TestRequest::post()
        .uri("/api/send-invite")
        .insert_header(bearer(&app.admin_token()))
        .set_json(json!({"email": "Boss@Example.com", "admin": true}))
        .to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let token = app.token("boss", "boss@example.com", false);
    let req = test::TestRequest::post()
        .uri("/api/user")
        .insert_header(bearer(&token))
        .to_request();
    let created: Value = test::call_and_read_body_json(&service, req).await;
    assert_eq!(created["role"], "admin");

    let invitation: Invitation = app
        .repos
        .invitations
        .get_invitation("boss@example.com")
        .await
        .unwrap()
        .unwrap();
    assert!(invitation.signed_up);

    let req = test::TestRequest::post()
        .uri("/admin/claims/sync")
        .insert_header(bearer(&app.admin_token()))
        .to_request();
    let body: Value = test::call_and_read_body_json(&service, req).await;
    assert_eq!(body["synced"], 1);
    assert!(app.identity.is_registered_admin("boss@example.com"));
}

#[actix_rt::test]
async fn invites_are_admin_only_and_validated() {
    let app = TestApp::new();
    let service = app.service().await;

    let req = test::TestRequest::post()
        .uri("/api/send-invite")
        .insert_header(bearer(&app.token("u1", "u1@example.com", false)))
        .set_json(json!({"email": "parent@example.com"}))
        .to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::post()
        .uri("/api/send-invite")
        .insert_header(bearer(&app.admin_token()))
        .set_json(json!({"email": "not-an-email"}))
        .to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let invitation = Invitation {
        email: "late@example.com".into(),
        invited: true,
        signed_up: false,
        admin: true,
        role: "parent".into(),
        invited_at: Utc::now(),
    };
    app.repos.invitations.upsert_invitation(&invitation).await.unwrap();

    let req = test::TestRequest::post()
        .uri("/admin/claims/late@example.com")
        .insert_header(bearer(&app.admin_token()))
        .to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}
