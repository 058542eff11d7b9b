//! Grant tampering tests.
//!
//! Each signed field is altered in an otherwise valid URL; every alteration
//! must be refused before the store is consulted.

use std::time::Duration;

use axum::http::StatusCode;
use url::form_urlencoded;

use media_gateway::grant::{IssuedUrl, Subject};

use super::test_utils::{body_json, request_target, MemoryObjectStore, TestGateway, NOW};

const OBJECT_PATH: &str = "resources/course-x/module-1/lesson-1/seg0.ts";

fn gateway() -> TestGateway {
    TestGateway::new(MemoryObjectStore::new().with_object(OBJECT_PATH, &b"segment"[..]))
}

fn issue(gw: &TestGateway, subject: &Subject) -> IssuedUrl {
    gw.signer
        .issue(OBJECT_PATH, subject, "GET", Duration::from_secs(300))
        .unwrap()
}

/// Rebuild a query string with one parameter replaced (or removed).
fn with_param(query: &str, name: &str, value: Option<&str>) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, current) in form_urlencoded::parse(query.as_bytes()) {
        if key == name {
            if let Some(value) = value {
                serializer.append_pair(&key, value);
            }
        } else {
            serializer.append_pair(&key, &current);
        }
    }
    serializer.finish()
}

async fn get_error(gw: &TestGateway, query: &str) -> (StatusCode, String) {
    let response = gw.get(&format!("/{}?{}", OBJECT_PATH, query)).await;
    let status = response.status();
    let body = body_json(response).await;
    (status, body["message"].as_str().unwrap_or_default().to_string())
}

#[tokio::test]
async fn test_untampered_grant_succeeds() {
    let gw = gateway();
    let issued = issue(&gw, &Subject::new("user-42", "course-x", "lesson-1"));
    let response = gw.get(&request_target(&issued)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_each_signed_field_is_tamper_evident() {
    let gw = gateway();
    let issued = issue(&gw, &Subject::new("user-42", "course-x", "lesson-1"));
    let later_expiry = (NOW + 3_600_000).to_string();

    let tampered = [
        ("user", "user-43"),
        ("course", "course-y"),
        ("content", "lesson-2"),
        ("expires", later_expiry.as_str()),
        ("signedPrefix", "resources/course-x/"),
    ];

    for (name, value) in tampered {
        let query = with_param(&issued.query, name, Some(value));
        let (status, message) = get_error(&gw, &query).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "tampered {}", name);
        assert_eq!(message, "Invalid Signature", "tampered {}", name);
    }
    assert_eq!(gw.store.fetch_count(), 0);
}

#[tokio::test]
async fn test_flipped_signature_digit() {
    let gw = gateway();
    let issued = issue(&gw, &Subject::new("user-42", "course-x", "lesson-1"));

    let mut signature = issued.signature.clone().into_bytes();
    signature[0] = if signature[0] == b'0' { b'1' } else { b'0' };
    let signature = String::from_utf8(signature).unwrap();

    let query = with_param(&issued.query, "sig", Some(&signature));
    let (status, message) = get_error(&gw, &query).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(message, "Invalid Signature");
}

#[tokio::test]
async fn test_non_numeric_expiry_reads_as_expired() {
    let gw = gateway();
    let issued = issue(&gw, &Subject::new("user-42", "course-x", "lesson-1"));

    let query = with_param(&issued.query, "expires", Some("tomorrow"));
    let (status, message) = get_error(&gw, &query).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(message, "Link Expired");
}

#[tokio::test]
async fn test_prefix_without_trailing_slash_refused() {
    let gw = gateway();
    let issued = issue(&gw, &Subject::new("user-42", "course-x", "lesson-1"));

    let query = with_param(
        &issued.query,
        "signedPrefix",
        Some("resources/course-x/module-1/lesson-1"),
    );
    let (status, message) = get_error(&gw, &query).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(message, "Path Traversal");
}

#[tokio::test]
async fn test_duplicate_signature_refused() {
    let gw = gateway();
    let issued = issue(&gw, &Subject::new("user-42", "course-x", "lesson-1"));

    let query = format!("{}&sig={}", issued.query, issued.signature);
    let (status, message) = get_error(&gw, &query).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(message, "Invalid Signature Format");
}

#[tokio::test]
async fn test_missing_user_refused() {
    let gw = gateway();
    let issued = issue(&gw, &Subject::new("user-42", "course-x", "lesson-1"));

    let query = with_param(&issued.query, "user", None);
    let (status, message) = get_error(&gw, &query).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(message, "Missing Security Parameters");
}

#[tokio::test]
async fn test_absent_and_empty_subject_fields_are_equivalent() {
    let gw = gateway();
    let issued = issue(&gw, &Subject::new("user-42", "", ""));

    let query = with_param(&issued.query, "course", None);
    let query = with_param(&query, "content", None);

    let response = gw.get(&format!("/{}?{}", OBJECT_PATH, query)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_public_grant() {
    let gw = gateway();
    let issued = issue(&gw, &Subject::public("course-x", "lesson-1"));
    assert!(issued.query.starts_with("user=public&"));

    let response = gw.get(&request_target(&issued)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_upload_grant_does_not_authorize_reads() {
    let gw = gateway();
    let issued = gw
        .signer
        .issue(
            OBJECT_PATH,
            &Subject::new("admin-1", "course-x", "lesson-1"),
            "PUT",
            Duration::from_secs(900),
        )
        .unwrap();

    let response = gw.get(&request_target(&issued)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["message"], "Invalid Signature");
}
