//! Server test utilities.
#![allow(dead_code)]

use axum::http::StatusCode;
use reclaim_core::object_store::GroupRef;
use reclaim_core::types::{AppConfig, Bucket, ObjectPath};
use reclaim_core::{Clock, ManualClock, MemoryObjectStore, ObjectStore};
use reclaim_server::{AppState, create_router};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

pub const TOKEN: &str = "test-token";
pub const DAY: Duration = Duration::from_secs(24 * 60 * 60);

pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
    pub store: Arc<MemoryObjectStore>,
    pub clock: Arc<ManualClock>,
    _temp_dir: TempDir,
}

pub fn start() -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(1_760_000_000)
}

impl TestServer {
    pub fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");

        let mut config = AppConfig::default();
        config.storage.data_dir = temp_dir.path().join("data");
        config
            .auth
            .tokens
            .insert(TOKEN.to_string(), "alice".to_string());

        let clock = Arc::new(ManualClock::new(start()));
        let store = Arc::new(MemoryObjectStore::new(clock.clone() as Arc<dyn Clock>));
        let state = AppState::open(&config, store.clone(), clock.clone())
            .expect("Failed to open app state");
        let router = create_router(state.clone());

        Self {
            router,
            state,
            store,
            clock,
            _temp_dir: temp_dir,
        }
    }

    pub fn put(&self, bucket: &str, path: &str, name: &str) {
        self.store
            .put_object(&group(bucket, path), name, b"content")
            .unwrap();
    }

    /// Seeds a two-object book at `books/<path>` and trashes it over HTTP.
    pub async fn trash_book(&self, path: &str) -> String {
        self.put("books", path, "cover.png");
        self.put("books", path, "book.pdf");
        let (status, body) = json_request(
            &self.router,
            "POST",
            "/storage/trash",
            Some(serde_json::json!({
                "bucket": "books",
                "path": path,
                "item_type": "book",
                "metadata": { "Publisher": "Acme", "book_name": "Algebra" },
            })),
            Some(TOKEN),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["key"].as_str().unwrap().to_string()
    }
}

pub fn group(bucket: &str, path: &str) -> GroupRef {
    GroupRef::new(
        Bucket::try_new(bucket).unwrap(),
        ObjectPath::try_new(path).unwrap(),
    )
}

pub async fn json_request(
    router: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
    auth_token: Option<&str>,
) -> (StatusCode, serde_json::Value) {
    use axum::body::Body;
    use axum::http::Request;

    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(v) => {
            builder = builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&v).unwrap())
        }
        None => Body::empty(),
    };
    send(router, builder, body, auth_token).await
}

pub async fn raw_request(
    router: &axum::Router,
    method: &str,
    uri: &str,
    body: &'static [u8],
    auth_token: Option<&str>,
) -> (StatusCode, serde_json::Value) {
    use axum::body::Body;
    use axum::http::Request;

    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/octet-stream");
    send(router, builder, Body::from(body), auth_token).await
}

async fn send(
    router: &axum::Router,
    mut builder: axum::http::request::Builder,
    body: axum::body::Body,
    auth_token: Option<&str>,
) -> (StatusCode, serde_json::Value) {
    use tower::ServiceExt;

    if let Some(token) = auth_token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }

    let request = builder.body(body).unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();

    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body_json: serde_json::Value = if body_bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap_or(serde_json::Value::Null)
    };

    (status, body_json)
}
