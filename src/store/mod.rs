//! Object store abstraction.
//!
//! The gateway is the only component that reads from storage, and it does so
//! through [`ObjectStore`]. The store is treated as an opaque byte-addressable
//! backend: it receives a key plus the client's `Range` and conditional
//! headers verbatim, and reports which of full, partial or not-modified
//! content it produced.

mod s3;

use async_trait::async_trait;
use axum::body::Body;
use http::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT_RANGES, CONTENT_ENCODING, CONTENT_LENGTH,
    CONTENT_RANGE, ETAG, IF_MATCH, IF_MODIFIED_SINCE, IF_NONE_MATCH,
    IF_UNMODIFIED_SINCE, LAST_MODIFIED, RANGE,
};
use http::StatusCode;

use crate::error::IoError;

pub use s3::{create_s3_client, S3ObjectStore};

/// Client headers forwarded verbatim to the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchConditions {
    pub range: Option<String>,
    pub if_none_match: Option<String>,
    pub if_modified_since: Option<String>,
    pub if_match: Option<String>,
    pub if_unmodified_since: Option<String>,
}

impl FetchConditions {
    /// Extract forwarded headers from a request. Non-UTF-8 values are dropped.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let get = |name: HeaderName| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.to_string())
        };
        Self {
            range: get(RANGE),
            if_none_match: get(IF_NONE_MATCH),
            if_modified_since: get(IF_MODIFIED_SINCE),
            if_match: get(IF_MATCH),
            if_unmodified_since: get(IF_UNMODIFIED_SINCE),
        }
    }

    /// Conditions with only a byte range.
    pub fn with_range(range: impl Into<String>) -> Self {
        Self {
            range: Some(range.into()),
            ..Self::default()
        }
    }
}

/// What the store produced for a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    /// Whole object
    Full,
    /// Byte range of the object
    Partial,
    /// Conditional request matched; no body
    NotModified,
    /// `If-Match`/`If-Unmodified-Since` failed; no body
    PreconditionFailed,
    /// Requested range lies outside the object; no body
    RangeNotSatisfiable,
}

impl FetchStatus {
    /// HTTP status to relay to the client.
    pub const fn status_code(&self) -> StatusCode {
        match self {
            FetchStatus::Full => StatusCode::OK,
            FetchStatus::Partial => StatusCode::PARTIAL_CONTENT,
            FetchStatus::NotModified => StatusCode::NOT_MODIFIED,
            FetchStatus::PreconditionFailed => StatusCode::PRECONDITION_FAILED,
            FetchStatus::RangeNotSatisfiable => StatusCode::RANGE_NOT_SATISFIABLE,
        }
    }
}

/// Metadata headers reported by the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectMetadata {
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub content_range: Option<String>,
    pub content_encoding: Option<String>,
    pub accept_ranges: Option<String>,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
}

impl ObjectMetadata {
    /// Copy the metadata onto a response header map.
    ///
    /// `Content-Type` is left to the caller, which decides it from the path.
    /// Values that are not valid header values are skipped.
    pub fn apply_to(&self, headers: &mut HeaderMap) {
        let mut set = |name: HeaderName, value: Option<String>| {
            if let Some(value) = value.and_then(|v| HeaderValue::from_str(&v).ok()) {
                headers.insert(name, value);
            }
        };
        set(CONTENT_LENGTH, self.content_length.map(|len| len.to_string()));
        set(CONTENT_RANGE, self.content_range.clone());
        set(CONTENT_ENCODING, self.content_encoding.clone());
        set(ACCEPT_RANGES, self.accept_ranges.clone());
        set(ETAG, self.etag.clone());
        set(LAST_MODIFIED, self.last_modified.clone());
    }

    /// The store's content type, if any.
    pub fn content_type_header(&self) -> Option<HeaderValue> {
        self.content_type
            .as_deref()
            .and_then(|v| HeaderValue::from_str(v).ok())
    }
}

/// An object (or part of one) returned by the store.
///
/// The body is a stream straight from the backend; it is only read when the
/// response is sent.
pub struct StoredObject {
    pub status: FetchStatus,
    pub metadata: ObjectMetadata,
    pub body: Body,
}

impl StoredObject {
    /// An outcome that carries headers only (HEAD, 304, 412, 416).
    pub fn without_body(status: FetchStatus, metadata: ObjectMetadata) -> Self {
        Self {
            status,
            metadata,
            body: Body::empty(),
        }
    }
}

impl std::fmt::Debug for StoredObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredObject")
            .field("status", &self.status)
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

/// Read access to the backing object store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch `key`, forwarding range and conditional headers.
    ///
    /// Returns `IoError::NotFound` when the object does not exist.
    async fn get_object(
        &self,
        key: &str,
        conditions: &FetchConditions,
    ) -> Result<StoredObject, IoError>;

    /// Report what [`get_object`](Self::get_object) would return, without
    /// reading the object.
    ///
    /// Conditional headers are honored; the range is not, so the answer
    /// always describes the whole object. The returned body is empty.
    async fn head_object(
        &self,
        key: &str,
        conditions: &FetchConditions,
    ) -> Result<StoredObject, IoError>;

    /// Human-readable location of `key`, for logging.
    fn describe(&self, key: &str) -> String;
}
