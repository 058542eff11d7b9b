//! HTTP request handlers for the media gateway.
//!
//! # Endpoints
//!
//! - `GET|HEAD /{*path}` - Serve a protected object behind a signed grant
//! - `OPTIONS /{*path}` - Answer preflight/allow probes without authorization
//! - `GET /health` - Health check endpoint

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{OriginalUri, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{debug, error, warn};

use super::manifest::{rewrite_manifest_bytes, MAX_MANIFEST_BYTES};
use super::media::{MediaKind, OCTET_STREAM_MIME};
use crate::error::GatewayError;
use crate::grant::GrantVerifier;
use crate::store::{FetchConditions, FetchStatus, ObjectStore, StoredObject};

/// Methods the object route answers.
pub const ALLOWED_METHODS: &str = "GET, HEAD, OPTIONS";

// =============================================================================
// Application State
// =============================================================================

/// Shared application state: the object store and the grant verifier.
///
/// Both are read-only after construction.
pub struct AppState<S: ObjectStore> {
    /// Backing object store
    pub store: Arc<S>,

    /// Verifier holding the shared secret
    pub verifier: GrantVerifier,
}

impl<S: ObjectStore> AppState<S> {
    /// Create a new application state.
    pub fn new(store: S, verifier: GrantVerifier) -> Self {
        Self {
            store: Arc::new(store),
            verifier,
        }
    }
}

impl<S: ObjectStore> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            verifier: self.verifier.clone(),
        }
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "link_expired", "path_traversal")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    /// Create a new error response.
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: None,
        }
    }

    /// Create a new error response with status code.
    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: Some(status.as_u16()),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}

// =============================================================================
// Error Mapping
// =============================================================================

impl GatewayError {
    /// HTTP status and error type identifier for this error.
    pub fn status_and_type(&self) -> (StatusCode, &'static str) {
        match self {
            GatewayError::MissingParameters => (StatusCode::FORBIDDEN, "missing_parameters"),
            GatewayError::PathEncoding => (StatusCode::BAD_REQUEST, "invalid_path_encoding"),
            GatewayError::PathTraversal => (StatusCode::FORBIDDEN, "path_traversal"),
            GatewayError::LinkExpired => (StatusCode::FORBIDDEN, "link_expired"),
            GatewayError::SignatureFormat => (StatusCode::FORBIDDEN, "invalid_signature_format"),
            GatewayError::SignatureMismatch => (StatusCode::FORBIDDEN, "invalid_signature"),
            GatewayError::ObjectNotFound => (StatusCode::NOT_FOUND, "not_found"),
            GatewayError::Internal(_) => (StatusCode::FORBIDDEN, "forbidden"),
        }
    }
}

/// Convert GatewayError to HTTP response.
///
/// The body only ever carries the fixed message for the variant. Signature
/// and traversal failures look like probing and are logged at WARN; internal
/// failures are logged at ERROR with their detail, which is masked in the
/// response.
impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, error_type) = self.status_and_type();
        let message = self.to_string();

        match &self {
            GatewayError::Internal(detail) => {
                error!(
                    error_type = error_type,
                    status = status.as_u16(),
                    "Internal error masked as 403: {}",
                    detail
                );
            }
            GatewayError::PathTraversal
            | GatewayError::SignatureMismatch
            | GatewayError::SignatureFormat => {
                warn!(
                    error_type = error_type,
                    status = status.as_u16(),
                    "Request rejected: {}",
                    message
                );
            }
            _ => {
                debug!(
                    error_type = error_type,
                    status = status.as_u16(),
                    "Request rejected: {}",
                    message
                );
            }
        }

        let error_response = ErrorResponse::with_status(error_type, message, status);
        let mut response = (status, Json(error_response)).into_response();
        apply_no_store(response.headers_mut());
        response
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle object requests.
///
/// # Endpoint
///
/// `GET|HEAD /{*path}`
///
/// # Query Parameters
///
/// - `user`, `course`, `content`: Grant subject
/// - `expires`: Expiry in milliseconds since epoch
/// - `signedPrefix`: Directory prefix covered by the signature
/// - `sig`: Hex HMAC-SHA256 signature
///
/// # Response
///
/// - `200 OK` / `206 Partial Content` / `304 Not Modified`: Relayed from the store
/// - `400 Bad Request`: Undecodable path
/// - `403 Forbidden`: Any authorization failure, or a masked internal error
/// - `404 Not Found`: No such object
///
/// # Headers
///
/// - `Content-Type` by extension (`.m3u8`, `.ts`, `.mp4`), otherwise the store's
/// - `Cache-Control: no-store, no-cache, must-revalidate`, `Pragma`, `Expires`
/// - Store metadata (`Content-Length`, `Content-Range`, `ETag`, ...)
pub async fn object_handler<S: ObjectStore>(
    State(state): State<AppState<S>>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> Result<Response, GatewayError> {
    let raw_query = uri.query().unwrap_or("");
    let grant = state.verifier.verify(method.as_str(), uri.path(), raw_query)?;

    let kind = MediaKind::from_path(&grant.object_path);
    let conditions = FetchConditions::from_headers(&headers);

    // A manifest's length depends on the rewrite and a ranged HEAD reports
    // the range, so both go through get_object. The unread body is dropped.
    let head_only = method == Method::HEAD && !kind.is_manifest() && conditions.range.is_none();
    let fetched = if head_only {
        state.store.head_object(&grant.object_path, &conditions).await
    } else {
        state.store.get_object(&grant.object_path, &conditions).await
    };

    let object = fetched.map_err(|e| {
        debug!(
            object = %state.store.describe(&grant.object_path),
            "Store fetch failed: {}",
            e
        );
        GatewayError::from(e)
    })?;

    debug!(
        object = %grant.object_path,
        user = %grant.subject.user_id,
        status = ?object.status,
        "Serving object"
    );

    build_object_response(object, kind, raw_query).await
}

/// Assemble the response for a fetched object.
///
/// Only a full manifest is read into memory, so it can be rewritten; every
/// other body is streamed through as the store produces it.
async fn build_object_response(
    object: StoredObject,
    kind: MediaKind,
    raw_query: &str,
) -> Result<Response, GatewayError> {
    let StoredObject {
        status,
        metadata,
        body,
    } = object;

    let mut headers = HeaderMap::new();
    metadata.apply_to(&mut headers);

    let content_type = kind
        .content_type()
        .map(HeaderValue::from_static)
        .or_else(|| metadata.content_type_header())
        .unwrap_or_else(|| HeaderValue::from_static(OCTET_STREAM_MIME));
    headers.insert(header::CONTENT_TYPE, content_type);

    let body = if kind.is_manifest() && status == FetchStatus::Full {
        let stored = axum::body::to_bytes(body, MAX_MANIFEST_BYTES)
            .await
            .map_err(|e| GatewayError::Internal(format!("manifest read failed: {}", e)))?;
        let rewritten = rewrite_manifest_bytes(&stored, raw_query);
        // Validators describe the stored bytes, not the rewritten playlist.
        headers.remove(header::ETAG);
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(rewritten.len()));
        Body::from(rewritten)
    } else {
        body
    };

    apply_no_store(&mut headers);
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );

    let mut response = Response::new(body);
    *response.status_mut() = status.status_code();
    *response.headers_mut() = headers;
    Ok(response)
}

/// Force protected responses out of every cache.
fn apply_no_store(headers: &mut HeaderMap) {
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-store, no-cache, must-revalidate"),
    );
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(header::EXPIRES, HeaderValue::from_static("0"));
}

/// Handle `OPTIONS` requests that are not CORS preflights.
///
/// Preflights from allow-listed origins are answered by the CORS layer before
/// reaching this handler. No authorization is performed either way.
pub async fn options_handler() -> Response {
    let mut response = StatusCode::NO_CONTENT.into_response();
    response
        .headers_mut()
        .insert(header::ALLOW, HeaderValue::from_static(ALLOWED_METHODS));
    response
}

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0"
/// }
/// ```
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// =============================================================================
// Tests
// =============================================================================
