//! Media intake through the public uploader and router: retries, per-file isolation,
//! and HTTP status mapping.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use mime::Mime;
use tower::ServiceExt;

use listing_desk::workflows::listings::router::{USER_ID_HEADER, USER_ROLE_HEADER};
use listing_desk::workflows::listings::UserId;
use listing_desk::workflows::media::router::FILE_NAME_HEADER;
use listing_desk::workflows::media::{
    media_router, BlobStore, MediaKind, MediaLimits, MediaUpload, MediaUploader,
    MediaValidationError, MemoryBlobStore, RetryPolicy, StorageError, UploadError,
};

fn fast_retry() -> RetryPolicy {
    RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(2))
}

/// Fails transiently for the first `failures` calls, then stores normally.
struct FlakyStore {
    failures: u32,
    calls: AtomicU32,
    inner: MemoryBlobStore,
}

impl FlakyStore {
    fn new(failures: u32) -> Self {
        Self {
            failures,
            calls: AtomicU32::new(0),
            inner: MemoryBlobStore::new("https://cdn.test/media"),
        }
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlobStore for FlakyStore {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &Mime,
    ) -> Result<String, StorageError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call <= self.failures {
            return Err(StorageError::Transient(format!("503 on call {call}")));
        }
        self.inner.put(key, bytes, content_type).await
    }
}

struct RefusingStore {
    calls: AtomicU32,
}

#[async_trait]
impl BlobStore for RefusingStore {
    async fn put(
        &self,
        _key: &str,
        _bytes: Vec<u8>,
        _content_type: &Mime,
    ) -> Result<String, StorageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(StorageError::Rejected("bucket policy denies writes".to_string()))
    }
}

#[tokio::test]
async fn transient_failures_are_retried_until_the_upload_lands() {
    let store = Arc::new(FlakyStore::new(2));
    let uploader = MediaUploader::new(Arc::clone(&store), fast_retry());

    let uploaded = uploader
        .upload(&UserId::new(), MediaUpload::new("floorplan.pdf", vec![b'%'; 64]))
        .await
        .expect("third attempt succeeds");

    assert_eq!(uploaded.attempts, 3);
    assert_eq!(uploaded.kind, MediaKind::Pdf);
    assert_eq!(uploaded.content_type, "application/pdf");
    assert_eq!(store.calls(), 3);
    assert!(store.inner.object(&uploaded.key).is_some());
}

#[tokio::test]
async fn uploads_give_up_after_the_attempt_budget() {
    let store = Arc::new(FlakyStore::new(10));
    let uploader = MediaUploader::new(Arc::clone(&store), fast_retry());

    let err = uploader
        .upload(&UserId::new(), MediaUpload::new("tour.mp4", vec![0; 32]))
        .await
        .expect_err("storage never recovers");

    match err {
        UploadError::Exhausted { attempts, .. } => assert_eq!(attempts, 3),
        other => panic!("expected exhausted upload, got {other:?}"),
    }
    assert_eq!(store.calls(), 3);
    assert!(store.inner.is_empty());
}

#[tokio::test]
async fn permanent_storage_errors_are_not_retried() {
    let store = Arc::new(RefusingStore {
        calls: AtomicU32::new(0),
    });
    let uploader = MediaUploader::new(Arc::clone(&store), fast_retry());

    let err = uploader
        .upload(&UserId::new(), MediaUpload::new("front.png", vec![1, 2, 3]))
        .await
        .expect_err("storage refuses");

    assert!(matches!(err, UploadError::Rejected { .. }));
    assert_eq!(store.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn batch_failures_stay_with_their_own_file() {
    let store = Arc::new(MemoryBlobStore::new("https://cdn.test/media"));
    let limits = MediaLimits {
        image: 8,
        ..MediaLimits::default()
    };
    let uploader = MediaUploader::with_limits(Arc::clone(&store), fast_retry(), limits);
    let user = UserId::new();

    let results = uploader
        .upload_batch(
            &user,
            vec![
                MediaUpload::new("living-room.jpg", vec![1; 4]),
                MediaUpload::new("panorama.jpg", vec![1; 64]),
                MediaUpload::new("notes", vec![1; 4]),
                MediaUpload::new("brochure.pdf", vec![1; 4]),
            ],
        )
        .await;

    assert_eq!(results.len(), 4);
    assert_eq!(
        results[0].as_ref().expect("first stored").file_name,
        "living-room.jpg"
    );
    assert!(matches!(
        results[1],
        Err(UploadError::Invalid(MediaValidationError::TooLarge { .. }))
    ));
    assert!(matches!(
        results[2],
        Err(UploadError::Invalid(MediaValidationError::MissingExtension { .. }))
    ));
    assert_eq!(
        results[3].as_ref().expect("last stored").kind,
        MediaKind::Pdf
    );
    assert_eq!(store.len(), 2);
}

fn upload_request(user: Option<UserId>, file_name: Option<&str>, bytes: Vec<u8>) -> Request<Body> {
    let mut builder = Request::builder().method("POST").uri("/api/v1/media");
    if let Some(user) = user {
        builder = builder
            .header(USER_ID_HEADER, user.to_string())
            .header(USER_ROLE_HEADER, "user");
    }
    if let Some(file_name) = file_name {
        builder = builder.header(FILE_NAME_HEADER, file_name);
    }
    builder.body(Body::from(bytes)).expect("request")
}

#[tokio::test]
async fn media_route_stores_uploads_and_maps_failures() {
    let store = Arc::new(MemoryBlobStore::new("https://cdn.test/media"));
    let limits = MediaLimits {
        image: 16,
        ..MediaLimits::default()
    };
    let uploader = Arc::new(MediaUploader::with_limits(
        Arc::clone(&store),
        RetryPolicy::none(),
        limits,
    ));
    let app = media_router(uploader);
    let user = UserId::new();

    let created = app
        .clone()
        .oneshot(upload_request(Some(user), Some("Kitchen.PNG"), vec![7; 8]))
        .await
        .expect("route responds");
    assert_eq!(created.status(), StatusCode::CREATED);
    let body = axum::body::to_bytes(created.into_body(), 64 * 1024)
        .await
        .expect("read body");
    let payload: serde_json::Value = serde_json::from_slice(&body).expect("json payload");
    assert_eq!(payload["kind"], "image");
    assert_eq!(payload["attempts"], 1);
    let key = payload["key"].as_str().expect("key");
    assert!(key.starts_with(&format!("{user}/")));
    assert!(key.ends_with(".png"));
    assert_eq!(payload["uri"], format!("https://cdn.test/media/{key}"));

    let anonymous = app
        .clone()
        .oneshot(upload_request(None, Some("kitchen.png"), vec![7; 8]))
        .await
        .expect("route responds");
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let unnamed = app
        .clone()
        .oneshot(upload_request(Some(user), None, vec![7; 8]))
        .await
        .expect("route responds");
    assert_eq!(unnamed.status(), StatusCode::BAD_REQUEST);

    let oversized = app
        .clone()
        .oneshot(upload_request(Some(user), Some("kitchen.png"), vec![7; 32]))
        .await
        .expect("route responds");
    assert_eq!(oversized.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let unsupported = app
        .oneshot(upload_request(Some(user), Some("archive.zip"), vec![7; 8]))
        .await
        .expect("route responds");
    assert_eq!(unsupported.status(), StatusCode::UNPROCESSABLE_ENTITY);

    assert_eq!(store.len(), 1);
}
