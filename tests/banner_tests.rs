
use std::time::Duration as StdDuration;

use actix_web::{http::StatusCode, test};
use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};
use test_utils::{bearer, TestApp};

fn banner_body(kind: &str, message: &str, expires_in: Duration) -> Value {
    json!({
        "type": kind,
        "message": message,
        "expiresAt": (Utc::now() + expires_in).to_rfc3339(),
    })
}

#[actix_rt::test]
async fn banner_is_public_and_absent_by_default() {
    let app = TestApp::new();
    let service = app.service().await;

    let req = test::TestRequest::get().uri("/api/banner").to_request();
    let resp = test::call_service(&service, req).await;

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_rt::test]
async fn admin_can_set_read_and_delete_banner() {
    let app = TestApp::new();
    let service = app.service().await;
    let token = app.admin_token();

    let req = test::TestRequest::post()
        .uri("/api/banner")
        .insert_header(bearer(&token))
        .set_json(banner_body("weather", "", Duration::hours(2)))
        .to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let req = test::TestRequest::get().uri("/api/banner").to_request();
    let body: Value = test::call_and_read_body_json(&service, req).await;
    assert_eq!(body["type"], "weather");
    assert!(app.state.banner.is_timer_running());

    let req = test::TestRequest::delete()
        .uri("/api/banner")
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let req = test::TestRequest::get().uri("/api/banner").to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(!app.state.banner.is_timer_running());
}

#[actix_rt::test]
async fn replacing_a_banner_keeps_only_the_newest() {
    let app = TestApp::new();
    let service = app.service().await;
    let token = app.admin_token();

    for (kind, message) in [("closure", ""), ("custom", "Picture day on Friday")] {
        let req = test::TestRequest::post()
            .uri("/api/banner")
            .insert_header(bearer(&token))
            .set_json(banner_body(kind, message, Duration::hours(1)))
            .to_request();
        let resp = test::call_service(&service, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let req = test::TestRequest::get().uri("/api/banner").to_request();
    let body: Value = test::call_and_read_body_json(&service, req).await;
    assert_eq!(body["type"], "custom");
    assert_eq!(body["message"], "Picture day on Friday");
}

#[actix_rt::test]
async fn custom_banner_reads_back_exactly_as_sent() {
    let app = TestApp::new();
    let service = app.service().await;
    let message = "  Pickup moved: 3 < 4 & bring <b>coats</b>  ";
    let expires_at = Utc::now() + Duration::minutes(90);

    let req = test::TestRequest::post()
        .uri("/api/banner")
        .insert_header(bearer(&app.admin_token()))
        .set_json(json!({
            "type": "custom",
            "message": message,
            "expiresAt": expires_at.to_rfc3339(),
        }))
        .to_request();
    let created: Value = test::call_and_read_body_json(&service, req).await;
    assert_eq!(created["message"], message);

    let req = test::TestRequest::get().uri("/api/banner").to_request();
    let body: Value = test::call_and_read_body_json(&service, req).await;
    assert_eq!(body["type"], "custom");
    assert_eq!(body["message"], message);
    let read_back = DateTime::parse_from_rfc3339(body["expiresAt"].as_str().unwrap()).unwrap();
    assert_eq!(read_back.with_timezone(&Utc), expires_at);
}

#[actix_rt::test]
async fn non_admin_cannot_set_banner() {
    let app = TestApp::new();
    let service = app.service().await;
    let token = app.token("u1", "u1@example.com", false);

    let req = test::TestRequest::post()
        .uri("/api/banner")
        .insert_header(bearer(&token))
        .set_json(banner_body("weather", "", Duration::hours(1)))
        .to_request();
    let resp = test::call_service(&service, req).await;

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_rt::test]
async fn setting_banner_requires_a_token() {
    let app = TestApp::new();
    let service = app.service().await;

    let req = test::TestRequest::post()
        .uri("/api/banner")
        .set_json(banner_body("weather", "", Duration::hours(1)))
        .to_request();
    let resp = test::call_service(&service, req).await;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_rt::test]
async fn invalid_banner_reports_every_field() {
    let app = TestApp::new();
    let service = app.service().await;

    let req = test::TestRequest::post()
        .uri("/api/banner")
        .insert_header(bearer(&app.admin_token()))
        .set_json(banner_body("custom", "  ", Duration::hours(73)))
        .to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["kind"], "invalid_argument");
    let fields: Vec<&str> = body["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["field"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"message"));
    assert!(fields.contains(&"expiresAt"));

    let req = test::TestRequest::get().uri("/api/banner").to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_rt::test]
async fn banner_disappears_after_expiry() {
    let app = TestApp::new();
    let service = app.service().await;

    let req = test::TestRequest::post()
        .uri("/api/banner")
        .insert_header(bearer(&app.admin_token()))
        .set_json(banner_body("closure", "", Duration::milliseconds(300)))
        .to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    tokio::time::sleep(StdDuration::from_millis(600)).await;

    let req = test::TestRequest::get().uri("/api/banner").to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(!app.state.banner.is_timer_running());
}

#[actix_rt::test]
async fn banner_status_is_admin_only() {
    let app = TestApp::new();
    let service = app.service().await;

    let req = test::TestRequest::get()
        .uri("/admin/banner/status")
        .insert_header(bearer(&app.token("u1", "u1@example.com", false)))
        .to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::get()
        .uri("/admin/banner/status")
        .insert_header(bearer(&app.admin_token()))
        .to_request();
    let body: Value = test::call_and_read_body_json(&service, req).await;
    assert_eq!(body["timerRunning"], false);
}
