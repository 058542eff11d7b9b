//! Gateway HTTP behavior tests.
//!
//! Tests verify:
//! - Every rejection maps to its status and fixed message
//! - Caching is disabled on every response
//! - Range, conditional and HEAD requests are relayed
//! - CORS is limited to allow-listed origins
//! - OPTIONS and health need no grant

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};

use media_gateway::error::ConfigurationError;
use media_gateway::grant::Subject;
use media_gateway::{create_router, RouterConfig};

use super::test_utils::{
    body_bytes, body_json, request_target, MemoryObjectStore, TestGateway, TEST_SECRET,
};

const SEGMENT_PATH: &str = "resources/course-x/lesson-1/seg0.ts";
const SEGMENT_BYTES: &[u8] = b"0123456789abcdef";

fn subject() -> Subject {
    Subject::new("user-42", "course-x", "lesson-1")
}

fn gateway() -> TestGateway {
    TestGateway::new(
        MemoryObjectStore::new()
            .with_object(SEGMENT_PATH, SEGMENT_BYTES)
            .with_typed_object(
                "resources/course-x/lesson-1/notes.pdf",
                &b"%PDF-1.7"[..],
                "application/pdf",
            )
            .with_object("resources/course-x/lesson-1/raw.bin", &b"raw"[..]),
    )
}

fn segment_target(gw: &TestGateway) -> String {
    let issued = gw
        .signer
        .issue(SEGMENT_PATH, &subject(), "GET", Duration::from_secs(300))
        .unwrap();
    request_target(&issued)
}

async fn assert_rejected(
    response: axum::http::Response<Body>,
    status: StatusCode,
    error: &str,
    message: &str,
) {
    assert_eq!(response.status(), status);
    assert_eq!(
        response.headers().get(header::CACHE_CONTROL).unwrap(),
        "no-store, no-cache, must-revalidate"
    );
    let body = body_json(response).await;
    assert_eq!(body["error"], error);
    assert_eq!(body["message"], message);
    assert_eq!(body["status"], status.as_u16());
}

// =============================================================================
// Successful Requests
// =============================================================================

#[tokio::test]
async fn test_valid_grant_serves_segment() {
    let gw = gateway();
    let response = gw.get(&segment_target(&gw)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), "video/mp2t");
    assert_eq!(
        headers.get(header::CACHE_CONTROL).unwrap(),
        "no-store, no-cache, must-revalidate"
    );
    assert_eq!(headers.get(header::PRAGMA).unwrap(), "no-cache");
    assert_eq!(headers.get(header::EXPIRES).unwrap(), "0");
    assert_eq!(headers.get(header::ACCEPT_RANGES).unwrap(), "bytes");

    assert_eq!(body_bytes(response).await, SEGMENT_BYTES);
}

#[tokio::test]
async fn test_content_type_falls_back_to_store() {
    let gw = gateway();

    let issued = gw
        .signer
        .issue(
            "resources/course-x/lesson-1/notes.pdf",
            &subject(),
            "GET",
            Duration::from_secs(300),
        )
        .unwrap();
    let response = gw.get(&request_target(&issued)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/pdf"
    );

    let issued = gw
        .signer
        .issue(
            "resources/course-x/lesson-1/raw.bin",
            &subject(),
            "GET",
            Duration::from_secs(300),
        )
        .unwrap();
    let response = gw.get(&request_target(&issued)).await;
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/octet-stream"
    );
}

#[tokio::test]
async fn test_grant_covers_sibling_objects() {
    let gw = TestGateway::new(
        MemoryObjectStore::new()
            .with_object(SEGMENT_PATH, SEGMENT_BYTES)
            .with_object("resources/course-x/lesson-1/seg1.ts", &b"seg1"[..]),
    );
    let issued = gw
        .signer
        .issue(SEGMENT_PATH, &subject(), "GET", Duration::from_secs(300))
        .unwrap();

    let response = gw
        .get(&format!(
            "/resources/course-x/lesson-1/seg1.ts?{}",
            issued.query
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, &b"seg1"[..]);
}

#[tokio::test]
async fn test_range_request_relayed() {
    let gw = gateway();
    let request = Request::builder()
        .uri(segment_target(&gw))
        .header(header::RANGE, "bytes=0-3")
        .body(Body::empty())
        .unwrap();

    let response = gw.send(request).await;
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(
        response.headers().get(header::CONTENT_RANGE).unwrap(),
        "bytes 0-3/16"
    );
    assert_eq!(response.headers().get(header::CONTENT_LENGTH).unwrap(), "4");
    assert_eq!(body_bytes(response).await, &b"0123"[..]);
}

#[tokio::test]
async fn test_unsatisfiable_range_relayed() {
    let gw = gateway();
    let request = Request::builder()
        .uri(segment_target(&gw))
        .header(header::RANGE, "bytes=100-")
        .body(Body::empty())
        .unwrap();

    let response = gw.send(request).await;
    assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
    assert_eq!(
        response.headers().get(header::CONTENT_RANGE).unwrap(),
        "bytes */16"
    );
}

#[tokio::test]
async fn test_if_none_match_returns_not_modified() {
    let gw = gateway();
    let first = gw.get(&segment_target(&gw)).await;
    let etag = first.headers().get(header::ETAG).unwrap().clone();

    let request = Request::builder()
        .uri(segment_target(&gw))
        .header(header::IF_NONE_MATCH, etag)
        .body(Body::empty())
        .unwrap();
    let response = gw.send(request).await;

    assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
    assert!(body_bytes(response).await.is_empty());
}

#[tokio::test]
async fn test_head_uses_get_grant() {
    let gw = gateway();
    let request = Request::builder()
        .method(Method::HEAD)
        .uri(segment_target(&gw))
        .body(Body::empty())
        .unwrap();

    let response = gw.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get(header::CONTENT_LENGTH).unwrap(), "16");
    assert!(body_bytes(response).await.is_empty());
}

#[tokio::test]
async fn test_head_does_not_read_body() {
    let gw = gateway();
    let response = gw.head(&segment_target(&gw)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get(header::CONTENT_TYPE).unwrap(), "video/mp2t");
    assert_eq!(response.headers().get(header::CONTENT_LENGTH).unwrap(), "16");
    assert!(response.headers().get(header::ETAG).is_some());
    assert!(body_bytes(response).await.is_empty());

    assert_eq!(gw.store.head_count(), 1);
    assert_eq!(gw.store.fetch_count(), 0);
}

#[tokio::test]
async fn test_head_on_missing_object() {
    let gw = gateway();
    let issued = gw
        .signer
        .issue(
            "resources/course-x/lesson-1/missing.ts",
            &subject(),
            "GET",
            Duration::from_secs(300),
        )
        .unwrap();

    let response = gw.head(&request_target(&issued)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(gw.store.fetch_count(), 0);
}

#[tokio::test]
async fn test_ranged_head_reports_range() {
    let gw = gateway();
    let request = Request::builder()
        .method(Method::HEAD)
        .uri(segment_target(&gw))
        .header(header::RANGE, "bytes=0-3")
        .body(Body::empty())
        .unwrap();

    let response = gw.send(request).await;
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(
        response.headers().get(header::CONTENT_RANGE).unwrap(),
        "bytes 0-3/16"
    );
    assert!(body_bytes(response).await.is_empty());
    assert_eq!(gw.store.head_count(), 0);
}

// =============================================================================
// Rejections
// =============================================================================

#[tokio::test]
async fn test_missing_parameters() {
    let gw = gateway();
    let response = gw.get(&format!("/{}", SEGMENT_PATH)).await;
    assert_rejected(
        response,
        StatusCode::FORBIDDEN,
        "missing_parameters",
        "Missing Security Parameters",
    )
    .await;
    assert_eq!(gw.store.fetch_count(), 0);
}

#[tokio::test]
async fn test_invalid_path_encoding() {
    let gw = gateway();
    let issued = gw
        .signer
        .issue(SEGMENT_PATH, &subject(), "GET", Duration::from_secs(300))
        .unwrap();

    let response = gw
        .get(&format!("/resources/course-x/lesson-1/%FF.ts?{}", issued.query))
        .await;
    assert_rejected(
        response,
        StatusCode::BAD_REQUEST,
        "invalid_path_encoding",
        "Invalid Path Encoding",
    )
    .await;
}

#[tokio::test]
async fn test_object_outside_prefix() {
    let gw = gateway();
    let issued = gw
        .signer
        .issue(SEGMENT_PATH, &subject(), "GET", Duration::from_secs(300))
        .unwrap();

    let response = gw
        .get(&format!("/resources/course-x/lesson-2/seg0.ts?{}", issued.query))
        .await;
    assert_rejected(
        response,
        StatusCode::FORBIDDEN,
        "path_traversal",
        "Path Traversal",
    )
    .await;
    assert_eq!(gw.store.fetch_count(), 0);
}

#[tokio::test]
async fn test_expired_link() {
    let gw = gateway();
    let target = segment_target(&gw);
    gw.clock.advance(300_000);

    let response = gw.get(&target).await;
    assert_rejected(response, StatusCode::FORBIDDEN, "link_expired", "Link Expired").await;
}

#[tokio::test]
async fn test_malformed_signature() {
    let gw = gateway();
    let issued = gw
        .signer
        .issue(SEGMENT_PATH, &subject(), "GET", Duration::from_secs(300))
        .unwrap();
    let query = issued
        .query
        .replace(&issued.signature, &issued.signature[..40]);

    let response = gw.get(&format!("/{}?{}", SEGMENT_PATH, query)).await;
    assert_rejected(
        response,
        StatusCode::FORBIDDEN,
        "invalid_signature_format",
        "Invalid Signature Format",
    )
    .await;
}

#[tokio::test]
async fn test_wrong_secret() {
    let gw = TestGateway::with_config(
        MemoryObjectStore::new().with_object(SEGMENT_PATH, SEGMENT_BYTES),
        RouterConfig::new(format!("{}-rotated", TEST_SECRET)),
    );

    let response = gw.get(&segment_target(&gw)).await;
    assert_rejected(
        response,
        StatusCode::FORBIDDEN,
        "invalid_signature",
        "Invalid Signature",
    )
    .await;
}

#[tokio::test]
async fn test_missing_object() {
    let gw = gateway();
    let issued = gw
        .signer
        .issue(
            "resources/course-x/lesson-1/missing.ts",
            &subject(),
            "GET",
            Duration::from_secs(300),
        )
        .unwrap();

    let response = gw.get(&request_target(&issued)).await;
    assert_rejected(response, StatusCode::NOT_FOUND, "not_found", "Not Found").await;
}

#[tokio::test]
async fn test_store_failure_is_masked() {
    let gw = TestGateway::new(
        MemoryObjectStore::new()
            .with_object(SEGMENT_PATH, SEGMENT_BYTES)
            .with_failure(SEGMENT_PATH),
    );

    let response = gw.get(&segment_target(&gw)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["error"], "forbidden");
    assert_eq!(body["message"], "Forbidden (Internal Error)");
    assert!(!body.to_string().contains("injected"));
}

// =============================================================================
// Unauthenticated Routes
// =============================================================================

#[tokio::test]
async fn test_health_check() {
    let gw = gateway();
    let response = gw.get("/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_options_without_grant() {
    let gw = gateway();
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri(format!("/{}", SEGMENT_PATH))
        .body(Body::empty())
        .unwrap();

    let response = gw.send(request).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        response.headers().get(header::ALLOW).unwrap(),
        "GET, HEAD, OPTIONS"
    );
    assert_eq!(gw.store.fetch_count(), 0);
}

// =============================================================================
// CORS
// =============================================================================

fn cors_gateway() -> TestGateway {
    TestGateway::with_config(
        MemoryObjectStore::new().with_object(SEGMENT_PATH, SEGMENT_BYTES),
        RouterConfig::new(TEST_SECRET)
            .with_cors_origins(vec!["https://learn.example.com".to_string()]),
    )
}

#[tokio::test]
async fn test_cors_allowed_origin() {
    let gw = cors_gateway();
    let request = Request::builder()
        .uri(segment_target(&gw))
        .header(header::ORIGIN, "https://learn.example.com")
        .body(Body::empty())
        .unwrap();

    let response = gw.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "https://learn.example.com"
    );
}

#[tokio::test]
async fn test_cors_unknown_origin() {
    let gw = cors_gateway();
    let request = Request::builder()
        .uri(segment_target(&gw))
        .header(header::ORIGIN, "https://evil.example.com")
        .body(Body::empty())
        .unwrap();

    let response = gw.send(request).await;
    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}

#[tokio::test]
async fn test_cors_preflight_without_grant() {
    let gw = cors_gateway();
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri(format!("/{}", SEGMENT_PATH))
        .header(header::ORIGIN, "https://learn.example.com")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "range")
        .body(Body::empty())
        .unwrap();

    let response = gw.send(request).await;
    assert!(response.status().is_success());
    let headers = response.headers();
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "https://learn.example.com"
    );
    assert!(headers.get(header::ACCESS_CONTROL_ALLOW_METHODS).is_some());
    assert_eq!(gw.store.fetch_count(), 0);
}

#[tokio::test]
async fn test_no_cors_headers_by_default() {
    let gw = gateway();
    let request = Request::builder()
        .uri(segment_target(&gw))
        .header(header::ORIGIN, "https://learn.example.com")
        .body(Body::empty())
        .unwrap();

    let response = gw.send(request).await;
    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}

// =============================================================================
// Configuration
// =============================================================================

#[test]
fn test_empty_secret_refuses_to_build() {
    let err = create_router(MemoryObjectStore::new(), RouterConfig::new("")).unwrap_err();
    assert_eq!(err, ConfigurationError::MissingSecret);
}
