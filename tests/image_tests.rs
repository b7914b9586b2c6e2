
use actix_web::{http::StatusCode, test};
use serde_json::Value;
use test_utils::{bearer, multipart_image, TestApp, PNG_BYTES, TEST_MAX_UPLOAD_BYTES};

#[actix_rt::test]
async fn upload_then_download_and_delete() {
    let app = TestApp::new();
    app.seed_user("u1", &[]).await;
    let service = app.service().await;
    let token = app.token("u1", "u1@example.com", false);

    let (content_type, body) = multipart_image("photo.png", "image/png", &PNG_BYTES, None);
    let req = test::TestRequest::post()
        .uri("/api/images")
        .insert_header(bearer(&token))
        .insert_header(content_type)
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let uploaded: Value = test::read_body_json(resp).await;
    assert_eq!(uploaded["success"], true);
    assert_eq!(uploaded["image"]["name"], "photo.png");
    assert_eq!(uploaded["image"]["contentType"], "image/png");

    let user = app.repos.users.get_user("u1").await.unwrap().unwrap();
    assert_eq!(user.images, vec!["photo.png"]);

    let req = test::TestRequest::get()
        .uri("/api/images/u1/photo.png")
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = test::read_body(resp).await;
    assert_eq!(bytes.as_ref(), &PNG_BYTES[..]);

    let req = test::TestRequest::delete()
        .uri("/api/images/u1/photo.png")
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let user = app.repos.users.get_user("u1").await.unwrap().unwrap();
    assert!(user.images.is_empty());
    assert!(app.repos.blobs.list_all().await.unwrap().is_empty());
}

#[actix_rt::test]
async fn oversized_upload_gets_a_structured_rejection() {
    let app = TestApp::new();
    app.seed_user("u1", &[]).await;
    let service = app.service().await;

    let mut bytes = PNG_BYTES.to_vec();
    bytes.resize(TEST_MAX_UPLOAD_BYTES as usize * 2, 0);
    let (content_type, body) = multipart_image("big.png", "image/png", &bytes, None);

    let req = test::TestRequest::post()
        .uri("/api/images")
        .insert_header(bearer(&app.token("u1", "u1@example.com", false)))
        .insert_header(content_type)
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["violation"]["valid"], false);
    assert_eq!(body["violation"]["sizeLimit"], TEST_MAX_UPLOAD_BYTES);
    assert_eq!(body["violation"]["fileSize"], TEST_MAX_UPLOAD_BYTES * 2);
    assert!(app.repos.blobs.list_all().await.unwrap().is_empty());
}

#[actix_rt::test]
async fn fourth_upload_fails_without_touching_blobs() {
    let app = TestApp::new();
    app.seed_user("u1", &["a.png", "b.png", "c.png"]).await;
    let service = app.service().await;

    let (content_type, body) = multipart_image("d.png", "image/png", &PNG_BYTES, None);
    let req = test::TestRequest::post()
        .uri("/api/images")
        .insert_header(bearer(&app.token("u1", "u1@example.com", false)))
        .insert_header(content_type)
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let user = app.repos.users.get_user("u1").await.unwrap().unwrap();
    assert_eq!(user.images, vec!["a.png", "b.png", "c.png"]);
    assert!(app.repos.blobs.list_all().await.unwrap().is_empty());
}

#[actix_rt::test]
async fn uploading_for_another_user_needs_admin() {
    let app = TestApp::new();
    app.seed_user("u1", &[]).await;
    app.seed_user("u2", &[]).await;
    let service = app.service().await;

    let (content_type, body) = multipart_image("photo.png", "image/png", &PNG_BYTES, Some("u2"));
    let req = test::TestRequest::post()
        .uri("/api/images")
        .insert_header(bearer(&app.token("u1", "u1@example.com", false)))
        .insert_header(content_type)
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let (content_type, body) = multipart_image("photo.png", "image/png", &PNG_BYTES, Some("u2"));
    let req = test::TestRequest::post()
        .uri("/api/images")
        .insert_header(bearer(&app.admin_token()))
        .insert_header(content_type)
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let user = app.repos.users.get_user("u2").await.unwrap().unwrap();
    assert_eq!(user.images, vec!["photo.png"]);
}

#[actix_rt::test]
async fn non_image_uploads_are_rejected() {
    let app = TestApp::new();
    app.seed_user("u1", &[]).await;
    let service = app.service().await;

    let (content_type, body) = multipart_image("notes.txt", "text/plain", b"hello there", None);
    let req = test::TestRequest::post()
        .uri("/api/images")
        .insert_header(bearer(&app.token("u1", "u1@example.com", false)))
        .insert_header(content_type)
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&service, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_rt::test]
async fn statistics_track_uploads() {
    let app = TestApp::new();
    app.seed_user("u1", &[]).await;
    let service = app.service().await;
    let token = app.token("u1", "u1@example.com", false);

    let (content_type, body) = multipart_image("photo.png", "image/png", &PNG_BYTES, None);
    let req = test::TestRequest::post()
        .uri("/api/images")
        .insert_header(bearer(&token))
        .insert_header(content_type)
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let req = test::TestRequest::get()
        .uri("/api/images/statistics")
        .insert_header(bearer(&token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&service, req).await;
    assert_eq!(body["statistics"]["totalImages"], 1);
    assert_eq!(body["statistics"]["totalSize"], PNG_BYTES.len());
    assert_eq!(body["sizeLimit"], TEST_MAX_UPLOAD_BYTES);
}
