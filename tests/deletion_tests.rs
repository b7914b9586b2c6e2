
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use actix_web::{http::StatusCode, test};
use async_trait::async_trait;
use childcare_backend::{
    entities::{
        event::EventRecord,
        image::{BlobKey, ImageData, StoredBlob},
    },
    errors::AppError,
    repositories::{blob::BlobRepository, memory_repo::MemoryBlobStore},
    shared_repos::SharedRepositories,
};
use serde_json::Value;
use test_utils::{bearer, TestApp};

/// Blob store whose bulk delete fails while `failing` is set.
#[derive(Clone, Default)]
struct FlakyBlobStore {
    inner: MemoryBlobStore,
    failing: Arc<AtomicBool>,
}

#[async_trait]
impl BlobRepository for FlakyBlobStore {
    async fn upload(&self, key: &BlobKey, bytes: Vec<u8>, content_type: &str) -> Result<StoredBlob, AppError> {
        self.inner.upload(key, bytes, content_type).await
    }

    async fn download(&self, key: &BlobKey) -> Result<Option<ImageData>, AppError> {
        self.inner.download(key).await
    }

    async fn delete(&self, key: &BlobKey) -> Result<bool, AppError> {
        self.inner.delete(key).await
    }

    async fn delete_all_for_owner(&self, owner_id: &str) -> Result<u64, AppError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::dependency("blobs.delete_all_for_owner", "storage offline"));
        }
        self.inner.delete_all_for_owner(owner_id).await
    }

    async fn list_all(&self) -> Result<Vec<StoredBlob>, AppError> {
        self.inner.list_all().await
    }

    async fn check_connection(&self) -> Result<(), AppError> {
        self.inner.check_connection().await
    }
}

fn event(id: &str, creator: &str, invitees: &[&str]) -> EventRecord {
    EventRecord {
        id: id.into(),
        name: format!("Event {id}"),
        date: "2030-01-01".into(),
        start_time: "09:00".into(),
        end_time: "10:00".into(),
        location: String::new(),
        description: String::new(),
        color: String::new(),
        creator_id: creator.into(),
        invitee_ids: invitees.iter().map(|s| s.to_string()).collect(),
    }
}

async fn seed_world(app: &TestApp) {
    app.seed_user("u1", &["a.png"]).await;
    app.seed_user("u2", &[]).await;
    app.repos.events.create_event(&event("e1", "u1", &["u2"])).await.unwrap();
    app.repos.events.create_event(&event("e2", "u2", &["u1"])).await.unwrap();
    app.repos
        .blobs
        .upload(&BlobKey::new("u1", "a.png"), vec![1, 2, 3], "image/png")
        .await
        .unwrap();
}

#[actix_rt::test]
async fn deleting_a_user_cascades_across_stores() {
    let app = TestApp::new();
    seed_world(&app).await;
    let service = app.service().await;
    let token = app.token("u1", "u1@example.com", false);

    let req = test::TestRequest::delete()
        .uri("/api/user/u1")
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let report: Value = test::read_body_json(resp).await;
    assert_eq!(report["eventsDeleted"], 1);
    assert_eq!(report["eventsRewritten"], 1);
    assert_eq!(report["blobsDeleted"], 1);

    assert!(app.repos.users.get_user("u1").await.unwrap().is_none());
    assert!(app.repos.events.get_event("e1").await.unwrap().is_none());
    let kept = app.repos.events.get_event("e2").await.unwrap().unwrap();
    assert!(kept.invitee_ids.is_empty());
    assert!(app.repos.blobs.list_all().await.unwrap().is_empty());

    let req = test::TestRequest::get()
        .uri("/api/user/u1/deletion")
        .insert_header(bearer(&token))
        .to_request();
    let status: Value = test::call_and_read_body_json(&service, req).await;
    assert_eq!(status["state"], "none");
}

#[actix_rt::test]
async fn deleting_someone_else_is_forbidden() {
    let app = TestApp::new();
    seed_world(&app).await;
    let service = app.service().await;

    let req = test::TestRequest::delete()
        .uri("/api/user/u1")
        .insert_header(bearer(&app.token("u2", "u2@example.com", false)))
        .to_request();
    let resp = test::call_service(&service, req).await;

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert!(app.repos.users.get_user("u1").await.unwrap().is_some());
}

#[actix_rt::test]
async fn deleting_an_unknown_user_is_not_found() {
    let app = TestApp::new();
    let service = app.service().await;

    let req = test::TestRequest::delete()
        .uri("/api/user/ghost")
        .insert_header(bearer(&app.admin_token()))
        .to_request();
    let resp = test::call_service(&service, req).await;

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_rt::test]
async fn failed_step_leaves_a_tombstone_that_the_sweep_finishes() {
    let blobs = FlakyBlobStore::default();
    blobs.failing.store(true, Ordering::SeqCst);
    let app = TestApp::with_repos(SharedRepositories::in_memory().with_blobs(Arc::new(blobs.clone())));
    seed_world(&app).await;
    let service = app.service().await;
    let token = app.admin_token();

    let req = test::TestRequest::delete()
        .uri("/api/user/u1")
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    assert!(app.repos.users.get_user("u1").await.unwrap().is_none());
    assert!(app.repos.events.get_event("e1").await.unwrap().is_none());
    assert_eq!(app.repos.blobs.list_all().await.unwrap().len(), 1);

    let req = test::TestRequest::get()
        .uri("/api/user/u1/deletion")
        .insert_header(bearer(&token))
        .to_request();
    let status: Value = test::call_and_read_body_json(&service, req).await;
    assert_eq!(status["state"], "pending");
    assert_eq!(status["nextStep"], "delete_blobs");
    assert_eq!(status["attempts"], 1);

    blobs.failing.store(false, Ordering::SeqCst);
    let summary = app.state.deletion.resume_pending().await.unwrap();
    assert_eq!(summary.completed, 1);
    assert_eq!(summary.failed, 0);

    assert!(app.repos.blobs.list_all().await.unwrap().is_empty());
    assert!(app.repos.deletions.get("u1").await.unwrap().is_none());
}
