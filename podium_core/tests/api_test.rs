use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::{Body, Bytes},
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use chrono::Duration;
use podium_core::files::FileWriter;
use podium_core::{create_app, AppConfig, AppError, AppState, JwtIdentityProvider};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "----podium-test-boundary";

struct TestApp {
    app: Router,
    identity: JwtIdentityProvider,
    temp_dir: TempDir,
}

fn setup() -> TestApp {
    setup_with(|_| {}, |state| state)
}

fn setup_with(
    configure: impl FnOnce(&mut AppConfig),
    customize: impl FnOnce(AppState) -> AppState,
) -> TestApp {
    let temp_dir = TempDir::new().unwrap();
    let mut config = AppConfig::default();
    config.storage.public_dir = temp_dir.path().to_path_buf();
    configure(&mut config);

    let identity = JwtIdentityProvider::new(&config.auth).unwrap();
    let shared = JwtIdentityProvider::new(&config.auth).unwrap().into_shared();
    let app = create_app(customize(AppState::new(config, shared)));

    TestApp { app, identity, temp_dir }
}

/// Writes half the bytes and then fails, like a disk filling up mid-write.
struct DiskFullWriter;

#[async_trait]
impl FileWriter for DiskFullWriter {
    fn name(&self) -> &'static str {
        "disk-full"
    }

    async fn write(&self, dir: &Path, target: &Path, data: Bytes) -> podium_core::Result<()> {
        std::fs::create_dir_all(dir)?;
        std::fs::write(target, &data[..data.len() / 2])?;
        Err(AppError::Storage("No space left on device".to_string()))
    }
}

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn set_cookie(response: &Response) -> String {
    response
        .headers()
        .get(header::SET_COOKIE)
        .expect("Set-Cookie header")
        .to_str()
        .unwrap()
        .to_string()
}

fn session_request(body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/api/auth/session")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Signs in as `uid` and returns the `session=...` pair to send back.
async fn login(test: &TestApp, uid: &str) -> String {
    let id_token = test.identity.sign_id_token(uid, None, Duration::hours(1)).unwrap();
    let response = send(&test.app, session_request(json!({ "idToken": id_token }))).await;
    assert_eq!(response.status(), StatusCode::OK);

    set_cookie(&response)
        .split(';')
        .next()
        .unwrap()
        .to_string()
}

enum Part<'a> {
    File { name: &'a str, content_type: Option<&'a str>, data: &'a [u8] },
    Text { field: &'a str, value: &'a str },
}

fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::File { name, content_type, data } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
                        name
                    )
                    .as_bytes(),
                );
                if let Some(content_type) = content_type {
                    body.extend_from_slice(format!("Content-Type: {}\r\n", content_type).as_bytes());
                }
                body.extend_from_slice(b"\r\n");
                body.extend_from_slice(data);
                body.extend_from_slice(b"\r\n");
            }
            Part::Text { field, value } => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n", field, value)
                        .as_bytes(),
                );
            }
        }
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn upload_request(parts: &[Part<'_>], cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/api/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        );
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(multipart_body(parts))).unwrap()
}

fn list_request(query: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(format!("/api/files{}", query));
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn audio_parts<'a>(song_id: &'a str) -> Vec<Part<'a>> {
    vec![
        Part::Text { field: "fileType", value: "audio" },
        Part::Text { field: "songId", value: song_id },
        Part::File { name: "demo.mp3", content_type: Some("audio/mpeg"), data: b"ID3-fake-audio" },
    ]
}

#[tokio::test]
async fn test_session_create_sets_cookie() {
    let test = setup();
    let id_token = test.identity.sign_id_token("alice", None, Duration::hours(1)).unwrap();

    let response = send(&test.app, session_request(json!({ "idToken": id_token }))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = set_cookie(&response);
    assert!(cookie.starts_with("session="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Strict"));
    assert!(cookie.contains("Path=/"));
    assert!(cookie.contains("Max-Age=1209600"));
    assert!(!cookie.contains("Secure"));

    assert_eq!(json_body(response).await, json!({ "success": true }));
}

#[tokio::test]
async fn test_session_cookie_is_secure_in_production() {
    let test = setup_with(|config| config.server.environment = "production".to_string(), |state| state);
    let id_token = test.identity.sign_id_token("alice", None, Duration::hours(1)).unwrap();

    let response = send(&test.app, session_request(json!({ "idToken": id_token }))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = set_cookie(&response);
    assert!(cookie.contains("Secure"));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Strict"));

    let logout = Request::builder()
        .method(Method::DELETE)
        .uri("/api/auth/session")
        .body(Body::empty())
        .unwrap();
    let response = send(&test.app, logout).await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = set_cookie(&response);
    assert!(cookie.contains("Secure"));
    assert!(cookie.contains("Max-Age=0"));
}

#[tokio::test]
async fn test_session_rejects_invalid_token() {
    let test = setup();

    let response = send(&test.app, session_request(json!({ "idToken": "forged" }))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
    assert_eq!(json_body(response).await["error"], "Unauthorized");
}

#[tokio::test]
async fn test_session_requires_id_token() {
    let test = setup();

    let response = send(&test.app, session_request(json!({}))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(
        &test.app,
        Request::builder()
            .method(Method::POST)
            .uri("/api/auth/session")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_session_delete_always_succeeds() {
    let test = setup();

    let anonymous = Request::builder()
        .method(Method::DELETE)
        .uri("/api/auth/session")
        .body(Body::empty())
        .unwrap();
    let response = send(&test.app, anonymous).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookie(&response).contains("Max-Age=0"));
    assert_eq!(json_body(response).await, json!({ "success": true }));

    let cookie = login(&test, "alice").await;
    let signed_in = Request::builder()
        .method(Method::DELETE)
        .uri("/api/auth/session")
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap();
    let response = send(&test.app, signed_in).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({ "success": true }));
}

#[tokio::test]
async fn test_authenticated_upload_lands_in_user_folder() {
    let test = setup();
    let cookie = login(&test, "alice").await;

    let response = send(&test.app, upload_request(&audio_parts("song-42"), Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let stored = json_body(response).await;
    assert_eq!(stored["userId"], "alice");
    assert_eq!(stored["songId"], "song-42");
    assert_eq!(stored["originalName"], "demo.mp3");
    assert_eq!(stored["mimeType"], "audio/mpeg");
    assert_eq!(stored["size"], 14);
    assert!(stored["path"].as_str().unwrap().contains("users/alice/audio"));
    assert!(stored["url"].as_str().unwrap().contains("users/alice/audio"));

    let on_disk = test.temp_dir.path().join(stored["path"].as_str().unwrap());
    assert_eq!(std::fs::read(on_disk).unwrap(), b"ID3-fake-audio");

    let download = Request::builder()
        .uri(stored["url"].as_str().unwrap())
        .body(Body::empty())
        .unwrap();
    let response = send(&test.app, download).await;
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"ID3-fake-audio");
}

#[tokio::test]
async fn test_anonymous_upload_is_top_level() {
    let test = setup();

    let response = send(&test.app, upload_request(&audio_parts("song-1"), None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let stored = json_body(response).await;
    assert!(stored["userId"].is_null());
    let path = stored["path"].as_str().unwrap();
    assert!(path.starts_with("uploads/audio/"));
    assert!(!path.contains("users/"));
}

#[tokio::test]
async fn test_invalid_session_degrades_to_anonymous_upload() {
    let test = setup();

    let response = send(
        &test.app,
        upload_request(&audio_parts("song-1"), Some("session=tampered.token.value")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(json_body(response).await["userId"].is_null());
}

#[tokio::test]
async fn test_upload_rejects_bad_requests() {
    let test = setup();

    let not_multipart = Request::builder()
        .method(Method::POST)
        .uri("/api/upload")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .unwrap();
    let response = send(&test.app, not_multipart).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(response).await["error"].is_string());

    let no_file = upload_request(&[Part::Text { field: "fileType", value: "audio" }], None);
    let response = send(&test.app, no_file).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "No file provided");
}

#[tokio::test]
async fn test_failed_upload_is_not_listed_or_served() {
    let test = setup_with(
        |_| {},
        |state| {
            let store = state
                .file_store
                .clone()
                .with_writers(Arc::new(DiskFullWriter), Arc::new(DiskFullWriter));
            state.with_file_store(store)
        },
    );

    let response = send(&test.app, upload_request(&audio_parts("song-1"), None)).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(response).await["error"], "Failed to upload file");

    let response = send(&test.app, list_request("", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!([]));

    let audio_dir = test.temp_dir.path().join("uploads/audio");
    let leftovers = std::fs::read_dir(&audio_dir).map(|entries| entries.count()).unwrap_or(0);
    assert_eq!(leftovers, 0);
}

#[tokio::test]
async fn test_listing_enforces_ownership() {
    let test = setup();
    let alice = login(&test, "alice").await;
    let bob = login(&test, "bob").await;

    let response = send(&test.app, upload_request(&audio_parts("song-1"), Some(&alice))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&test.app, list_request("?userId=alice", Some(&bob))).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send(&test.app, list_request("?userId=alice", None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["error"], "Unauthorized");

    let response = send(&test.app, list_request("?userId=alice", Some("session=garbage"))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(&test.app, list_request("?userId=alice&fileType=audio", Some(&alice))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let files = json_body(response).await;
    let files = files.as_array().unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0]["userId"], "alice");
    assert_eq!(files[0]["mimeType"], "audio/mpeg");
}

#[tokio::test]
async fn test_listing_missing_directory_is_empty() {
    let test = setup();
    let carol = login(&test, "carol").await;

    let response = send(&test.app, list_request("?userId=carol&fileType=image", Some(&carol))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!([]));
}

#[tokio::test]
async fn test_listing_unknown_extension_is_octet_stream() {
    let test = setup();
    let dave = login(&test, "dave").await;

    let misc = test.temp_dir.path().join("uploads/users/dave/misc/nested");
    std::fs::create_dir_all(&misc).unwrap();
    std::fs::write(misc.join("mystery.xyz"), b"???").unwrap();

    let response = send(&test.app, list_request("?userId=dave", Some(&dave))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let files = json_body(response).await;
    let files = files.as_array().unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0]["mimeType"], "application/octet-stream");
    assert_eq!(files[0]["id"], "mystery");
    assert_eq!(files[0]["fileName"], "mystery.xyz");
    assert_eq!(files[0]["url"], "/uploads/users/dave/misc/nested/mystery.xyz");
}

#[tokio::test]
async fn test_anonymous_listing_hides_user_files() {
    let test = setup();
    let alice = login(&test, "alice").await;

    send(&test.app, upload_request(&audio_parts("a"), Some(&alice))).await;
    send(&test.app, upload_request(&audio_parts("b"), None)).await;

    let response = send(&test.app, list_request("", None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let files = json_body(response).await;
    let files = files.as_array().unwrap();
    assert_eq!(files.len(), 1);
    assert!(files[0]["userId"].is_null());
    assert!(files[0]["path"].as_str().unwrap().starts_with("uploads/audio/"));
}

#[tokio::test]
async fn test_health() {
    let test = setup();

    let response = send(
        &test.app,
        Request::builder().uri("/health").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "healthy");
}
